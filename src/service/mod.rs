//! Service layer: business logic orchestration.
//!
//! [`LeagueService`] coordinates every league operation, guards writes with
//! the betting window and emits events through the
//! [`super::domain::EventBus`]. [`ReminderScheduler`] and
//! [`PredictionAnnouncer`] run in the background and talk to chat through a
//! [`Notifier`]; [`AuditTrail`] logs every change from the bus.

pub mod announcer;
pub mod audit;
pub mod league_service;
pub mod notifier;
pub mod reminder;
pub mod views;

pub use announcer::PredictionAnnouncer;
pub use audit::AuditTrail;
pub use league_service::{
    DEFAULT_LEADERBOARD_LIMIT, EARLIEST_EVENT_YEAR, LATEST_EVENT_YEAR, LeagueService,
    MAX_LEADERBOARD_LIMIT,
};
pub use notifier::{Button, Notifier, NotifyError, Recipient, RecordingNotifier, TracingNotifier};
pub use reminder::{ReminderScheduler, ScanReport};
pub use views::{
    BulkEventRow, BulkRejection, BulkUploadReport, EventView, HistoryEntry, LeaderboardEntry,
    ParticipantHistory, ParticipantScore, PlacedPrediction, PredictionView, ReminderCandidate,
    SettlementSummary, TotalsReport,
};
