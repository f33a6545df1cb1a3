//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root. Callers identify themselves with the `x-participant-id` header.

pub mod dto;
pub mod handlers;
pub mod identity;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::app_state::AppState;
use crate::error::LeagueError;

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::participants::get_me,
        handlers::participants::set_reminders,
        handlers::participants::get_history,
        handlers::participants::list_participants,
        handlers::participants::set_access,
        handlers::competitors::list_competitors,
        handlers::competitors::set_active,
        handlers::events::create_event,
        handlers::events::bulk_create_events,
        handlers::events::list_events,
        handlers::events::pending_results,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::events::close_betting,
        handlers::events::reopen_betting,
        handlers::predictions::place_prediction,
        handlers::predictions::get_prediction,
        handlers::predictions::delete_prediction,
        handlers::predictions::enter_result,
        handlers::predictions::get_result,
        handlers::standings::leaderboard,
        handlers::standings::verify_totals,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    tags(
        (name = "System", description = "Health"),
        (name = "Participants", description = "Profiles, reminders and access control"),
        (name = "Competitors", description = "Roster"),
        (name = "Events", description = "Scheduling and betting window overrides"),
        (name = "Predictions", description = "Podium predictions"),
        (name = "Results", description = "Official results and settlement"),
        (name = "Standings", description = "Leaderboard and totals verification"),
    ),
    modifiers(&ParticipantHeader)
)]
pub struct ApiDoc;

/// Registers the identity header as a security scheme.
#[derive(Debug)]
struct ParticipantHeader;

impl utoipa::Modify for ParticipantHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "participant_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    identity::PARTICIPANT_ID_HEADER,
                ))),
            );
        }
    }
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the router with state attached and new requests refused once
/// shutdown starts.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            reject_when_shutting_down,
        ))
        .with_state(state)
}

async fn reject_when_shutting_down(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_shutting_down() {
        return LeagueError::ShuttingDown.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, StatusCode};
    use chrono::{DateTime, Duration, Utc};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;
    use crate::config::LeagueConfig;
    use crate::domain::{Clock, EventBus, LeagueStore, ManualClock, ParticipantId};
    use crate::service::LeagueService;

    const ADMIN: &str = "1";

    fn start() -> DateTime<Utc> {
        let Some(start) = DateTime::from_timestamp(1_740_931_200, 0) else {
            panic!("valid timestamp");
        };
        start
    }

    async fn app() -> (Router, watch::Sender<bool>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start() - Duration::days(1)));
        let config = LeagueConfig {
            persistence_enabled: false,
            bet_closing_offset_minutes: 10,
            admin_ids: [ParticipantId::new(1)].into_iter().collect(),
            auto_approve_participants: true,
            ..LeagueConfig::default()
        };
        let service = Arc::new(LeagueService::new(
            Arc::new(LeagueStore::new()),
            EventBus::new(64),
            None,
            Arc::clone(&clock) as Arc<dyn Clock>,
            config,
        ));
        let Ok(_) = service.seed_roster_if_empty().await else {
            panic!("seeding failed");
        };
        let (tx, rx) = watch::channel(false);
        (build_app(AppState::new(service, rx)), tx, clock)
    }

    fn request(method: Method, uri: &str, caller: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(id) = caller {
            builder = builder.header(identity::PARTICIPANT_ID_HEADER, id);
        }
        let Ok(request) = builder.body(Body::from(body.to_string())) else {
            panic!("valid request");
        };
        request
    }

    async fn send(app: &Router, req: Request) -> (StatusCode, serde_json::Value) {
        let Ok(response) = app.clone().oneshot(req).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _tx, _clock) = app().await;
        let (status, body) = send(&app, request(Method::GET, "/health", None, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn identity_header_is_required() {
        let (app, _tx, _clock) = app().await;
        let (status, body) = send(&app, request(Method::GET, "/api/v1/me", None, "")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 1101);
    }

    #[tokio::test]
    async fn prediction_flow_over_http() {
        let (app, _tx, clock) = app().await;
        let (status, event) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/events",
                Some(ADMIN),
                r#"{"name":"Bahrain GP","date":"2025-03-02","time":"16:00"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(id) = event["event_id"].as_str() else {
            panic!("event id missing");
        };
        assert_eq!(event["status"], "scheduled");

        let uri = format!("/api/v1/events/{id}/prediction");
        let (status, placed) = send(
            &app,
            request(Method::PUT, &uri, Some("10"), r#"{"picks":["VER","NOR","PIA"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(placed["is_update"], false);

        clock.set(start() - Duration::minutes(5));
        let (status, body) = send(
            &app,
            request(Method::PUT, &uri, Some("10"), r#"{"picks":["LEC","HAM","RUS"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["details"], "betting_closed");

        clock.set(start() + Duration::hours(2));
        let (status, settled) = send(
            &app,
            request(
                Method::PUT,
                &format!("/api/v1/events/{id}/result"),
                Some(ADMIN),
                r#"{"picks":["VER","PIA","NOR"]}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settled["scores"][0]["points"], 5);

        let (status, board) =
            send(&app, request(Method::GET, "/api/v1/leaderboard?limit=5", None, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board[0]["participant_id"], 10);
        assert_eq!(board[0]["total_points"], 5);
    }

    #[tokio::test]
    async fn non_admin_cannot_enter_results() {
        let (app, _tx, _clock) = app().await;
        let uri = format!("/api/v1/events/{}/result", uuid::Uuid::new_v4());
        let (status, _) = send(
            &app,
            request(Method::PUT, &uri, Some("10"), r#"{"picks":["VER","PIA","NOR"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn non_admin_with_bad_date_is_still_forbidden() {
        let (app, _tx, _clock) = app().await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/events",
                Some("10"),
                r#"{"name":"Bahrain GP","date":"02/03/2025","time":"16:00"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], 1102);

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/events",
                Some(ADMIN),
                r#"{"name":"Bahrain GP","date":"02/03/2025","time":"16:00"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn requests_are_refused_during_shutdown() {
        let (app, tx, _clock) = app().await;
        let _ = tx.send(true);
        let (status, body) = send(&app, request(Method::GET, "/api/v1/events", None, "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"]["code"].is_number());
    }

    #[test]
    fn openapi_lists_league_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/events/{id}/prediction"));
        assert!(doc.paths.paths.contains_key("/api/v1/leaderboard"));
    }
}
