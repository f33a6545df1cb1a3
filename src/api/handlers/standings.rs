//! Standings handlers: leaderboard and totals verification.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{LeaderboardEntryDto, LimitParams, TotalsReportDto};
use crate::api::identity::Caller;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LeagueError};

/// `GET /leaderboard` — Standings by total points.
///
/// # Errors
///
/// Returns [`LeagueError::Validation`] for a limit outside 1 to 100.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    tag = "Standings",
    summary = "Leaderboard",
    description = "Allowed participants ordered by total points, ties broken by participant id.",
    params(LimitParams),
    responses(
        (status = 200, description = "Standings", body = Vec<LeaderboardEntryDto>),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
    )
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, LeagueError> {
    let rows = state.league_service.leaderboard(params.limit).await?;
    Ok(Json(
        rows.into_iter()
            .map(LeaderboardEntryDto::from)
            .collect::<Vec<_>>(),
    ))
}

/// `GET /admin/totals` — Recompute totals from score records (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] for non-admins.
#[utoipa::path(
    get,
    path = "/api/v1/admin/totals",
    tag = "Standings",
    summary = "Verify totals",
    security(("participant_id" = [])),
    responses(
        (status = 200, description = "Verification report", body = TotalsReportDto),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
    )
)]
pub async fn verify_totals(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<impl IntoResponse, LeagueError> {
    let report = state.league_service.verify_totals(&identity).await?;
    Ok(Json(TotalsReportDto::from(report)))
}

/// Standings routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/admin/totals", get(verify_totals))
}
