//! Competitor roster handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{CompetitorDto, RosterParams, ToggleRequest};
use crate::api::identity::Caller;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LeagueError};

/// `GET /competitors` — The roster ordered by code.
#[utoipa::path(
    get,
    path = "/api/v1/competitors",
    tag = "Competitors",
    summary = "List competitors",
    params(RosterParams),
    responses(
        (status = 200, description = "Competitors", body = Vec<CompetitorDto>),
    )
)]
pub async fn list_competitors(
    State(state): State<AppState>,
    Query(params): Query<RosterParams>,
) -> impl IntoResponse {
    let competitors = state
        .league_service
        .list_competitors(params.include_inactive)
        .await;
    Json(
        competitors
            .into_iter()
            .map(CompetitorDto::from)
            .collect::<Vec<_>>(),
    )
}

/// `PUT /competitors/{code}/active` — Show or hide a competitor (admin).
///
/// Hidden competitors stay valid in stored predictions and results.
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] or [`LeagueError::CompetitorNotFound`].
#[utoipa::path(
    put,
    path = "/api/v1/competitors/{code}/active",
    tag = "Competitors",
    summary = "Activate or deactivate a competitor",
    security(("participant_id" = [])),
    params(("code" = String, Path, description = "Competitor code")),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated competitor", body = CompetitorDto),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
        (status = 404, description = "Unknown competitor", body = ErrorResponse),
    )
)]
pub async fn set_active(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(code): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let competitor = state
        .league_service
        .set_competitor_active(&identity, &code, req.enabled)
        .await?;
    Ok(Json(CompetitorDto::from(competitor)))
}

/// Competitor routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/competitors", get(list_competitors))
        .route("/competitors/{code}/active", put(set_active))
}
