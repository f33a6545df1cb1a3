//! Participant handlers: profile, reminder preference, history and admin
//! access control.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{HistoryResponse, ParticipantDto, ToggleRequest};
use crate::api::identity::Caller;
use crate::app_state::AppState;
use crate::domain::ParticipantId;
use crate::error::{ErrorResponse, LeagueError};

/// `GET /me` — The caller's profile; registers first-time callers.
///
/// # Errors
///
/// Returns [`LeagueError::MissingIdentity`] without identity headers.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Participants",
    summary = "Current participant",
    security(("participant_id" = [])),
    responses(
        (status = 200, description = "Caller profile", body = ParticipantDto),
        (status = 401, description = "Missing identity", body = ErrorResponse),
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<impl IntoResponse, LeagueError> {
    let participant = state.league_service.touch_participant(&identity).await?;
    Ok(Json(ParticipantDto::from(participant)))
}

/// `PUT /me/reminders` — Turn pre-event reminders on or off.
///
/// # Errors
///
/// Returns [`LeagueError::MissingIdentity`] without identity headers.
#[utoipa::path(
    put,
    path = "/api/v1/me/reminders",
    tag = "Participants",
    summary = "Set reminder preference",
    security(("participant_id" = [])),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated profile", body = ParticipantDto),
        (status = 401, description = "Missing identity", body = ErrorResponse),
    )
)]
pub async fn set_reminders(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<ToggleRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let participant = state
        .league_service
        .set_reminder_preference(&identity, req.enabled)
        .await?;
    Ok(Json(ParticipantDto::from(participant)))
}

/// `GET /me/history` — The caller's points and predictions.
///
/// # Errors
///
/// Returns [`LeagueError::MissingIdentity`] without identity headers.
#[utoipa::path(
    get,
    path = "/api/v1/me/history",
    tag = "Participants",
    summary = "Prediction history",
    description = "Total points and every prediction, newest event first. Unscored entries have no points.",
    security(("participant_id" = [])),
    responses(
        (status = 200, description = "History", body = HistoryResponse),
        (status = 401, description = "Missing identity", body = ErrorResponse),
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<impl IntoResponse, LeagueError> {
    let history = state.league_service.history(&identity).await?;
    Ok(Json(HistoryResponse::from(history)))
}

/// `GET /participants` — All participants (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] for non-admins.
#[utoipa::path(
    get,
    path = "/api/v1/participants",
    tag = "Participants",
    summary = "List participants",
    security(("participant_id" = [])),
    responses(
        (status = 200, description = "Participants ordered by id", body = Vec<ParticipantDto>),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<impl IntoResponse, LeagueError> {
    let participants = state.league_service.list_participants(&identity).await?;
    Ok(Json(
        participants
            .into_iter()
            .map(ParticipantDto::from)
            .collect::<Vec<_>>(),
    ))
}

/// `PUT /participants/{id}/access` — Allow or deny predictions (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`], [`LeagueError::ParticipantNotFound`]
/// or [`LeagueError::Validation`] when denying an admin.
#[utoipa::path(
    put,
    path = "/api/v1/participants/{id}/access",
    tag = "Participants",
    summary = "Set participant access",
    security(("participant_id" = [])),
    params(("id" = i64, Path, description = "Participant id")),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated participant", body = ParticipantDto),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
        (status = 404, description = "Unknown participant", body = ErrorResponse),
    )
)]
pub async fn set_access(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<ToggleRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let participant = state
        .league_service
        .set_participant_allowed(&identity, ParticipantId::new(id), req.enabled)
        .await?;
    Ok(Json(ParticipantDto::from(participant)))
}

/// Participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/reminders", put(set_reminders))
        .route("/me/history", get(get_history))
        .route("/participants", get(list_participants))
        .route("/participants/{id}/access", put(set_access))
}
