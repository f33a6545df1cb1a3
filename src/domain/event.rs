//! Scheduled events (races) and their lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EventId;

/// Stored lifecycle status of an event.
///
/// The status the rest of the system acts on is derived lazily by
/// [`super::BettingWindow::effective_status`], which also accounts for the
/// wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Predictions may be placed while the betting window is open.
    Scheduled,
    /// Predictions are frozen; waiting for the official result.
    BettingClosed,
    /// Result entered and predictions scored. Terminal.
    Resulted,
}

impl EventStatus {
    /// Stable string form used in storage and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::BettingClosed => "betting_closed",
            Self::Resulted => "resulted",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn from_str_opt(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "betting_closed" => Some(Self::BettingClosed),
            "resulted" => Some(Self::Resulted),
            _ => None,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Unique identifier (immutable after creation).
    pub id: EventId,
    /// Display name, e.g. `"Bahrain GP"`.
    pub name: String,
    /// Scheduled start instant.
    pub starts_at: DateTime<Utc>,
    /// Stored lifecycle status.
    pub status: EventStatus,
    /// Whether the pre-event reminder went out. Monotonic false → true.
    pub reminder_sent: bool,
    /// Soft-delete marker; deleted events keep their history.
    pub deleted: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new scheduled event.
    #[must_use]
    pub fn new(name: String, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            name,
            starts_at,
            status: EventStatus::Scheduled,
            reminder_sent: false,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
