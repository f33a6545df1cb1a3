//! Caller identity extracted from request headers.
//!
//! The chat front end authenticates users and forwards their id in
//! `x-participant-id`, with an optional display name in
//! `x-participant-name`. Admin rights are never taken from the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::{Identity, ParticipantId};
use crate::error::LeagueError;

/// Header carrying the caller's participant id.
pub const PARTICIPANT_ID_HEADER: &str = "x-participant-id";
/// Header carrying the caller's display name.
pub const PARTICIPANT_NAME_HEADER: &str = "x-participant-name";

/// Extractor for the calling participant.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = LeagueError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(PARTICIPANT_ID_HEADER)
            .ok_or(LeagueError::MissingIdentity)?
            .to_str()
            .map_err(|_| LeagueError::MissingIdentity)?;
        let participant_id: ParticipantId = raw_id.trim().parse().map_err(|_| {
            LeagueError::Validation(format!("{PARTICIPANT_ID_HEADER} must be an integer"))
        })?;
        let display_name = parts
            .headers
            .get(PARTICIPANT_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Ok(Self(Identity::new(participant_id, display_name)))
    }
}
