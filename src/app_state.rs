//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::service::LeagueService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// League service for all business logic.
    pub league_service: Arc<LeagueService>,
    /// Flips to `true` once shutdown starts; new requests are refused.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Creates the state shared by every handler.
    #[must_use]
    pub const fn new(league_service: Arc<LeagueService>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            league_service,
            shutdown,
        }
    }

    /// Returns `true` once shutdown has started.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
