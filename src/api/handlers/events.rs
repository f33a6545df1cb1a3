//! Event handlers: scheduling, bulk upload, betting overrides.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BulkUploadRequest, BulkUploadResponse, CreateEventRequest, EventDto, ReopenRequest,
    UpdateEventRequest,
};
use crate::api::identity::Caller;
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ErrorResponse, LeagueError};

/// `POST /events` — Schedule an event (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] or [`LeagueError::Validation`].
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Date and time are interpreted in the league timezone.",
    security(("participant_id" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid name, date or time", body = ErrorResponse),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state
        .league_service
        .schedule_event(&identity, &req.name, &req.date, &req.time)
        .await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(view))))
}

/// `POST /events/bulk` — Schedule many events at once (admin).
///
/// Well-formed rows are stored in one transaction; the rest are reported.
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] or [`LeagueError::Persistence`].
#[utoipa::path(
    post,
    path = "/api/v1/events/bulk",
    tag = "Events",
    summary = "Bulk create events",
    security(("participant_id" = [])),
    request_body = BulkUploadRequest,
    responses(
        (status = 200, description = "Upload report", body = BulkUploadResponse),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
    )
)]
pub async fn bulk_create_events(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<BulkUploadRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let (rows, unparsed) = req.into_parts();
    let report = state
        .league_service
        .bulk_create_events(&identity, rows, unparsed)
        .await?;
    Ok(Json(BulkUploadResponse::from(report)))
}

/// `GET /events` — Non-deleted events ordered by start.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    responses(
        (status = 200, description = "Events", body = Vec<EventDto>),
    )
)]
pub async fn list_events(State(state): State<AppState>) -> impl IntoResponse {
    let events = state.league_service.list_events().await;
    Json(events.into_iter().map(EventDto::from).collect::<Vec<_>>())
}

/// `GET /events/pending-results` — Closed events without a result (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] for non-admins.
#[utoipa::path(
    get,
    path = "/api/v1/events/pending-results",
    tag = "Events",
    summary = "Events awaiting a result",
    security(("participant_id" = [])),
    responses(
        (status = 200, description = "Events", body = Vec<EventDto>),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
    )
)]
pub async fn pending_results(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<impl IntoResponse, LeagueError> {
    let events = state.league_service.events_awaiting_result(&identity).await?;
    Ok(Json(events.into_iter().map(EventDto::from).collect::<Vec<_>>()))
}

/// `GET /events/{id}` — One event.
///
/// # Errors
///
/// Returns [`LeagueError::EventNotFound`].
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get an event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state.league_service.get_event(EventId::from_uuid(id)).await?;
    Ok(Json(EventDto::from(view)))
}

/// `PATCH /events/{id}` — Rename or reschedule (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Forbidden`] for non-admins, then
/// [`LeagueError::Validation`] when only one of `date` and `time` is given.
/// See [`crate::service::LeagueService::reschedule_event`].
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update an event",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event already resulted", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state
        .league_service
        .reschedule_event(
            &identity,
            EventId::from_uuid(id),
            req.name.as_deref(),
            req.date.as_deref(),
            req.time.as_deref(),
        )
        .await?;
    Ok(Json(EventDto::from(view)))
}

/// `DELETE /events/{id}` — Soft-delete (admin).
///
/// # Errors
///
/// Returns [`LeagueError::EventNotFound`] or [`LeagueError::StateConflict`]
/// for resulted events.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Delete an event",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event already resulted", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    state
        .league_service
        .delete_event(&identity, EventId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /events/{id}/close` — Close betting early (admin).
///
/// # Errors
///
/// Returns [`LeagueError::StateConflict`] when betting is not open.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/close",
    tag = "Events",
    summary = "Close betting",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 409, description = "Betting not open", body = ErrorResponse),
    )
)]
pub async fn close_betting(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state
        .league_service
        .close_betting(&identity, EventId::from_uuid(id))
        .await?;
    Ok(Json(EventDto::from(view)))
}

/// `POST /events/{id}/reopen` — Reopen betting with a reason (admin).
///
/// # Errors
///
/// Returns [`LeagueError::Validation`] for a blank reason or
/// [`LeagueError::StateConflict`] when reopening is not possible.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/reopen",
    tag = "Events",
    summary = "Reopen betting",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = ReopenRequest,
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 409, description = "Event cannot be reopened", body = ErrorResponse),
    )
)]
pub async fn reopen_betting(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReopenRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state
        .league_service
        .reopen_betting(&identity, EventId::from_uuid(id), &req.reason)
        .await?;
    Ok(Json(EventDto::from(view)))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/bulk", post(bulk_create_events))
        .route("/events/pending-results", get(pending_results))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/{id}/close", post(close_betting))
        .route("/events/{id}/reopen", post(reopen_betting))
}
