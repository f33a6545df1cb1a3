//! League error types with HTTP status code mapping.
//!
//! [`LeagueError`] is the central error type for the service. Each variant
//! maps to a numeric code, an HTTP status code and a short user-facing message
//! that names the problem and the next action. Internal failures collapse to a
//! generic message so storage details never leak to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CompetitorCode, EventId, EventStatus, ParticipantId};

/// Message returned for every internal failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong on our side. Please try again later.";

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "Betting closed at 2025-03-02 15:50 (UTC+00:00); predictions can no longer change.",
///     "details": "betting_closed"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`LeagueError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Current event status for state conflicts, so the caller can decide
    /// (e.g. offer an overwrite confirmation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Service error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1099 | Validation      | 400 Bad Request              |
/// | 1100–1199 | Authorization   | 401 / 403                    |
/// | 2000–2099 | Not Found       | 404 Not Found                |
/// | 2100–2199 | State Conflict  | 409 Conflict                 |
/// | 3000–3999 | Server          | 500 / 503                    |
/// | 4000–4999 | Scoring         | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    /// Request validation failed (bad date, time, name, limit...).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The same competitor appears in more than one podium position.
    #[error("duplicate pick: {0} appears more than once")]
    DuplicatePick(CompetitorCode),

    /// A pick does not reference a known competitor.
    #[error("invalid competitor: {0}")]
    InvalidCompetitor(String),

    /// The request carried no participant identity.
    #[error("missing participant identity")]
    MissingIdentity,

    /// The caller is not permitted to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Event with the given ID does not exist (or was deleted).
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The caller has no prediction for the event.
    #[error("no prediction for event {0}")]
    NoPrediction(EventId),

    /// Participant with the given ID does not exist.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Competitor code is unknown.
    #[error("competitor not found: {0}")]
    CompetitorNotFound(String),

    /// The event has no result yet.
    #[error("no result for event {0}")]
    ResultNotFound(EventId),

    /// A prediction mutation was attempted outside the betting window.
    #[error("betting closed for event {event_id} at {closes_at}")]
    BettingClosed {
        /// Event the mutation targeted.
        event_id: EventId,
        /// Effective status at the time of the attempt.
        status: EventStatus,
        /// Instant the betting window closed, in the league timezone.
        closes_at: DateTime<FixedOffset>,
    },

    /// The requested transition is not legal from the current state.
    #[error("state conflict ({status}): {message}")]
    StateConflict {
        /// What went wrong and what the caller may do next.
        message: String,
        /// Effective status at the time of the attempt.
        status: EventStatus,
    },

    /// Settlement refused to score a malformed result.
    #[error("scoring failure: {0}")]
    ScoringFailure(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The service is shutting down and no longer accepts requests.
    #[error("service is shutting down")]
    ShuttingDown,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeagueError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::DuplicatePick(_) => 1002,
            Self::InvalidCompetitor(_) => 1003,
            Self::MissingIdentity => 1101,
            Self::Forbidden(_) => 1102,
            Self::EventNotFound(_) => 2001,
            Self::NoPrediction(_) => 2002,
            Self::ParticipantNotFound(_) => 2003,
            Self::CompetitorNotFound(_) => 2004,
            Self::ResultNotFound(_) => 2005,
            Self::BettingClosed { .. } => 2101,
            Self::StateConflict { .. } => 2102,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::ShuttingDown => 3002,
            Self::ScoringFailure(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicatePick(_) | Self::InvalidCompetitor(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::EventNotFound(_)
            | Self::NoPrediction(_)
            | Self::ParticipantNotFound(_)
            | Self::CompetitorNotFound(_)
            | Self::ResultNotFound(_) => StatusCode::NOT_FOUND,
            Self::BettingClosed { .. } | Self::StateConflict { .. } => StatusCode::CONFLICT,
            Self::ScoringFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures whose detail must not reach the caller.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Internal(_))
    }

    /// Short message naming the problem and the next action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Invalid input: {msg}. Fix it and try again."),
            Self::DuplicatePick(code) => {
                format!("{code} is picked more than once. Choose three different competitors.")
            }
            Self::InvalidCompetitor(code) => {
                format!("Unknown competitor '{code}'. Pick from the competitor list.")
            }
            Self::MissingIdentity => {
                "We could not tell who you are. Send your participant id.".to_string()
            }
            Self::Forbidden(msg) => format!("Not allowed: {msg}."),
            Self::EventNotFound(_) => {
                "That event does not exist. Check the event list.".to_string()
            }
            Self::NoPrediction(_) => {
                "You have no prediction for this event. Place one first.".to_string()
            }
            Self::ParticipantNotFound(_) => {
                "That participant is unknown. They must interact with the league first."
                    .to_string()
            }
            Self::CompetitorNotFound(code) => {
                format!("Unknown competitor '{code}'. Check the competitor list.")
            }
            Self::ResultNotFound(_) => {
                "No result has been entered for this event yet.".to_string()
            }
            Self::BettingClosed { closes_at, .. } => format!(
                "Betting closed at {}; predictions can no longer change.",
                closes_at.format("%Y-%m-%d %H:%M (UTC%:z)")
            ),
            Self::StateConflict { message, .. } => message.clone(),
            Self::ScoringFailure(_) => {
                "The result could not be scored. Re-enter it with three different competitors."
                    .to_string()
            }
            Self::ShuttingDown => {
                "The service is restarting. Please try again in a moment.".to_string()
            }
            Self::Persistence(_) | Self::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Current event status for state conflicts.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            Self::BettingClosed { status, .. } | Self::StateConflict { status, .. } => {
                Some(status.as_str().to_string())
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for LeagueError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for LeagueError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for LeagueError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "request rejected");
        }
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.user_message(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_detail() {
        let err = LeagueError::Persistence("connection refused at 10.0.0.3".to_string());
        assert!(err.is_internal());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflicts_carry_current_status() {
        let err = LeagueError::StateConflict {
            message: "result already entered".to_string(),
            status: EventStatus::Resulted,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.details().as_deref(), Some("resulted"));
    }

    #[test]
    fn betting_closed_message_names_close_instant() {
        let (Some(instant), Some(tz)) = (
            DateTime::from_timestamp(1_740_930_600, 0),
            FixedOffset::east_opt(3 * 3600),
        ) else {
            panic!("valid instant and offset");
        };
        let closes_at = instant.with_timezone(&tz);
        let err = LeagueError::BettingClosed {
            event_id: EventId::new(),
            status: EventStatus::BettingClosed,
            closes_at,
        };
        assert_eq!(err.error_code(), 2101);
        assert!(err.user_message().contains("2025-03-02 18:50 (UTC+03:00)"));
    }

    #[test]
    fn authorization_errors_map_to_auth_statuses() {
        assert_eq!(
            LeagueError::MissingIdentity.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LeagueError::Forbidden("admins only".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
