//! # podium-gateway
//!
//! REST service for a private race podium prediction league.
//!
//! Participants predict the top three finishers of each event while its
//! betting window is open. Admins schedule events, enter official results
//! and settle them; every prediction is scored (3 points per exact
//! position, 1 per podium competitor in the wrong position) and totals are
//! kept consistent with the per-event score records. A background
//! scheduler sends each event exactly one reminder before betting closes.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                  Chat transport
//!     │                                 ▲
//!     ├── REST Handlers (api/)          │
//!     │                                 │
//!     ├── LeagueService (service/) ─────┤ Notifier
//!     ├── ReminderScheduler (service/) ─┤
//!     ├── PredictionAnnouncer ◄── EventBus (domain/) ──► AuditTrail
//!     │
//!     ├── LeagueStore + Ledger (domain/)
//!     ├── BettingWindow + scoring (domain/)
//!     │
//!     └── PostgreSQL Persistence
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
