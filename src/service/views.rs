//! Read models returned by [`super::LeagueService`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    Event, EventId, EventStatus, ParticipantId, Podium, Prediction, TotalMismatch,
};

/// An event as callers see it: stored fields plus the derived status.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    /// Stored event.
    pub event: Event,
    /// Status derived from the stored status and the clock.
    pub status: EventStatus,
    /// Instant at which betting closes.
    pub closes_at: DateTime<Utc>,
    /// Whether predictions may currently be written.
    pub betting_open: bool,
    /// Whether a result has been entered.
    pub has_result: bool,
    /// Number of predictions placed.
    pub predictions_count: usize,
}

/// Outcome of [`super::LeagueService::place_prediction`].
#[derive(Debug, Clone, Serialize)]
pub struct PlacedPrediction {
    /// Stored prediction.
    pub prediction: Prediction,
    /// `true` when a previous prediction existed.
    pub is_update: bool,
    /// `false` when the submitted picks equal the stored ones.
    pub changed: bool,
}

/// A participant's own prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    /// Stored prediction.
    pub prediction: Prediction,
    /// Event name.
    pub event_name: String,
    /// Whether it may still be changed.
    pub editable: bool,
}

/// Points one participant earned in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantScore {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// Points earned.
    pub points: u8,
}

/// Result of entering (or overwriting) a result.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    /// Settled event.
    pub event_id: EventId,
    /// Event name.
    pub event_name: String,
    /// Official podium.
    pub podium: Podium,
    /// `true` when a previous result was replaced.
    pub overwrite: bool,
    /// Per-participant points, highest first.
    pub scores: Vec<ParticipantScore>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position; ties get consecutive ranks.
    pub rank: usize,
    /// Participant.
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// Total points.
    pub total_points: u32,
}

/// One event in a participant's history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Event.
    pub event_id: EventId,
    /// Event name.
    pub event_name: String,
    /// Event start.
    pub starts_at: DateTime<Utc>,
    /// Derived event status.
    pub status: EventStatus,
    /// Predicted podium.
    pub podium: Podium,
    /// Points earned; `None` until the event is scored.
    pub points: Option<u8>,
    /// Whether the prediction may still be changed.
    pub editable: bool,
}

/// A participant's statistics and predictions.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantHistory {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// Total points.
    pub total_points: u32,
    /// Number of predictions placed.
    pub predictions_count: usize,
    /// Predictions, newest event first.
    pub entries: Vec<HistoryEntry>,
}

/// Outcome of recomputing totals from score records.
#[derive(Debug, Clone, Serialize)]
pub struct TotalsReport {
    /// `true` when no mismatch was found.
    pub consistent: bool,
    /// Number of participants with a non-zero total.
    pub participants_checked: usize,
    /// Number of score records summed.
    pub records_checked: usize,
    /// Participants whose totals disagree.
    pub mismatches: Vec<TotalMismatch>,
}

/// One row of a bulk event upload, as split by the admin tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEventRow {
    /// Event name.
    pub name: String,
    /// Local date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time, `HH:MM`.
    pub time: String,
}

/// A bulk row that was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkRejection {
    /// Original input.
    pub input: String,
    /// Why the row was rejected.
    pub reason: String,
}

/// Outcome of a bulk upload.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadReport {
    /// Events created.
    pub accepted: Vec<Event>,
    /// Rows and lines that were rejected.
    pub rejections: Vec<BulkRejection>,
}

/// An event due for its pre-event reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCandidate {
    /// Event.
    pub event_id: EventId,
    /// Event name.
    pub name: String,
    /// Event start.
    pub starts_at: DateTime<Utc>,
    /// Instant betting closes.
    pub closes_at: DateTime<Utc>,
}
