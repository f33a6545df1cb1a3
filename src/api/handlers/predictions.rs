//! Prediction and result handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};

use crate::api::dto::{
    PlacedPredictionResponse, PodiumRequest, PredictionDetailResponse, ResultDto,
    SettlementResponse,
};
use crate::api::identity::Caller;
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ErrorResponse, LeagueError};

/// `PUT /events/{id}/prediction` — Place or change the caller's podium.
///
/// # Errors
///
/// Returns [`LeagueError::BettingClosed`] outside the betting window and
/// validation errors for malformed picks.
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}/prediction",
    tag = "Predictions",
    summary = "Place a prediction",
    description = "Creates or replaces the caller's podium. Resubmitting the stored picks changes nothing.",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = PodiumRequest,
    responses(
        (status = 200, description = "Stored prediction", body = PlacedPredictionResponse),
        (status = 400, description = "Invalid picks", body = ErrorResponse),
        (status = 403, description = "Not approved for predictions", body = ErrorResponse),
        (status = 409, description = "Betting closed", body = ErrorResponse),
    )
)]
pub async fn place_prediction(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<PodiumRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let placed = state
        .league_service
        .place_prediction(&identity, EventId::from_uuid(id), &req.picks)
        .await?;
    Ok(Json(PlacedPredictionResponse::from(placed)))
}

/// `GET /events/{id}/prediction` — The caller's prediction.
///
/// # Errors
///
/// Returns [`LeagueError::NoPrediction`] when none exists.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/prediction",
    tag = "Predictions",
    summary = "Get own prediction",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Prediction", body = PredictionDetailResponse),
        (status = 404, description = "No prediction", body = ErrorResponse),
    )
)]
pub async fn get_prediction(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    let view = state
        .league_service
        .get_prediction(&identity, EventId::from_uuid(id))
        .await?;
    Ok(Json(PredictionDetailResponse::from(view)))
}

/// `DELETE /events/{id}/prediction` — Withdraw the caller's prediction.
///
/// # Errors
///
/// Returns [`LeagueError::BettingClosed`] or [`LeagueError::NoPrediction`].
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/prediction",
    tag = "Predictions",
    summary = "Withdraw own prediction",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 204, description = "Prediction withdrawn"),
        (status = 404, description = "No prediction", body = ErrorResponse),
        (status = 409, description = "Betting closed", body = ErrorResponse),
    )
)]
pub async fn delete_prediction(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    state
        .league_service
        .delete_prediction(&identity, EventId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /events/{id}/result` — Enter the official podium and settle (admin).
///
/// # Errors
///
/// Returns [`LeagueError::StateConflict`] while betting is open or when an
/// existing result is replaced without `confirm_overwrite`.
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}/result",
    tag = "Results",
    summary = "Enter a result",
    description = "Scores every prediction: 3 points per exact position, 1 per podium driver in the wrong position. Replacing a result needs confirm_overwrite.",
    security(("participant_id" = [])),
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = PodiumRequest,
    responses(
        (status = 200, description = "Settlement", body = SettlementResponse),
        (status = 403, description = "Admin rights required", body = ErrorResponse),
        (status = 409, description = "Betting open or overwrite not confirmed", body = ErrorResponse),
    )
)]
pub async fn enter_result(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<PodiumRequest>,
) -> Result<impl IntoResponse, LeagueError> {
    let summary = state
        .league_service
        .enter_result(
            &identity,
            EventId::from_uuid(id),
            &req.picks,
            req.confirm_overwrite,
        )
        .await?;
    Ok(Json(SettlementResponse::from(summary)))
}

/// `GET /events/{id}/result` — The official podium.
///
/// # Errors
///
/// Returns [`LeagueError::ResultNotFound`] before a result is entered.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/result",
    tag = "Results",
    summary = "Get a result",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Result", body = ResultDto),
        (status = 404, description = "No result yet", body = ErrorResponse),
    )
)]
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LeagueError> {
    let result = state
        .league_service
        .get_result(EventId::from_uuid(id))
        .await?;
    Ok(Json(ResultDto::from(result)))
}

/// Prediction and result routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{id}/prediction",
            put(place_prediction)
                .get(get_prediction)
                .delete(delete_prediction),
        )
        .route("/events/{id}/result", put(enter_result).get(get_result))
}
