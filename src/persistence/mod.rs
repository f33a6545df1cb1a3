//! Persistence layer: PostgreSQL storage of league state.
//!
//! [`postgres::PostgresPersistence`] writes every mutation before the
//! in-memory store is changed and loads the full state at startup. Schema
//! lives in `migrations/` and is applied with `sqlx::migrate!`. Totals are
//! never stored; they are derived from `score_records` on load.

pub mod models;
pub mod postgres;
pub mod retry;

pub use postgres::PostgresPersistence;
pub use retry::read_with_retry;
