//! REST endpoint handlers organized by resource.

pub mod competitors;
pub mod events;
pub mod participants;
pub mod predictions;
pub mod standings;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(participants::routes())
        .merge(competitors::routes())
        .merge(events::routes())
        .merge(predictions::routes())
        .merge(standings::routes())
}
