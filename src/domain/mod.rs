//! Domain layer: league model, betting window, scoring and state storage.
//!
//! This module contains the server-side domain model: identifiers,
//! competitors, events and predictions, the betting-window state machine,
//! the scoring and aggregation engines, the event bus for broadcasting state
//! changes, and the league store for concurrent state access.

pub mod aggregation;
pub mod betting_window;
pub mod clock;
pub mod competitor;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod league_event;
pub mod league_store;
pub mod participant;
pub mod prediction;
pub mod scoring;

pub use aggregation::{Ledger, ScoreRecord, TotalMismatch, settle_event};
pub use betting_window::{BettingWindow, Transition};
pub use clock::{Clock, ManualClock, SystemClock};
pub use competitor::{Competitor, CompetitorCode, seed_roster};
pub use event::{Event, EventStatus};
pub use event_bus::EventBus;
pub use ids::{EventId, ParticipantId};
pub use league_event::LeagueEvent;
pub use league_store::{EventEntry, LeagueStore, StoreSnapshot};
pub use participant::{Identity, Participant};
pub use prediction::{EventResult, PODIUM_SIZE, Podium, Prediction};
