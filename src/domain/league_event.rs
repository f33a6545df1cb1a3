//! Domain events reflecting league state mutations.
//!
//! Every state change emits a [`LeagueEvent`] through the
//! [`super::EventBus`]. The announcer subscribes to relay prediction
//! activity to the other participants; the audit trail records every
//! variant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventId, ParticipantId, Podium};

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LeagueEvent {
    /// Emitted when an event is scheduled.
    EventCreated {
        /// Event identifier.
        event_id: EventId,
        /// Event name.
        name: String,
        /// Scheduled start.
        starts_at: DateTime<Utc>,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an event's name or start time changes.
    EventUpdated {
        /// Event identifier.
        event_id: EventId,
        /// Name after the change.
        name: String,
        /// Start after the change.
        starts_at: DateTime<Utc>,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an event is soft-deleted.
    EventDeleted {
        /// Event identifier.
        event_id: EventId,
        /// Admin who deleted it.
        actor: ParticipantId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when betting closes, either by the scheduler or an admin.
    BettingClosed {
        /// Event identifier.
        event_id: EventId,
        /// Admin who closed betting; `None` for the automatic close.
        actor: Option<ParticipantId>,
        /// Close timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an admin reopens betting.
    BettingReopened {
        /// Event identifier.
        event_id: EventId,
        /// Admin who reopened betting.
        actor: ParticipantId,
        /// Reason given by the admin.
        reason: String,
        /// Reopen timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a prediction is placed or changed.
    PredictionPlaced {
        /// Event identifier.
        event_id: EventId,
        /// Event name, for announcements.
        event_name: String,
        /// Event start, for announcements.
        starts_at: DateTime<Utc>,
        /// Predicted podium.
        podium: Podium,
        /// Predicting participant.
        participant_id: ParticipantId,
        /// Participant display name, for announcements.
        display_name: String,
        /// `true` when an existing prediction was replaced.
        is_update: bool,
        /// Placement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a prediction is withdrawn.
    PredictionDeleted {
        /// Event identifier.
        event_id: EventId,
        /// Participant who withdrew.
        participant_id: ParticipantId,
        /// Withdrawal timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a result is entered and the event settled.
    ResultSettled {
        /// Event identifier.
        event_id: EventId,
        /// `true` when a previous result was overwritten.
        overwrite: bool,
        /// Number of predictions scored.
        scored: usize,
        /// Settlement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted once the pre-event reminder for an event is recorded as sent.
    ReminderSent {
        /// Event identifier.
        event_id: EventId,
        /// Recipients that received the reminder.
        delivered: usize,
        /// Recipients whose delivery failed.
        failed: usize,
        /// Timestamp of the flag write.
        timestamp: DateTime<Utc>,
    },
}

impl LeagueEvent {
    /// Returns the event ID associated with this domain event.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::EventUpdated { event_id, .. }
            | Self::EventDeleted { event_id, .. }
            | Self::BettingClosed { event_id, .. }
            | Self::BettingReopened { event_id, .. }
            | Self::PredictionPlaced { event_id, .. }
            | Self::PredictionDeleted { event_id, .. }
            | Self::ResultSettled { event_id, .. }
            | Self::ReminderSent { event_id, .. } => *event_id,
        }
    }
}
