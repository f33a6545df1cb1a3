//! Prediction and result DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventResult, Prediction};
use crate::service::{ParticipantScore, PlacedPrediction, PredictionView, SettlementSummary};

/// Request body carrying a podium: first, second and third place codes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PodiumRequest {
    /// Exactly three distinct competitor codes, winner first.
    pub picks: Vec<String>,
    /// Required to replace an existing result.
    #[serde(default)]
    pub confirm_overwrite: bool,
}

/// A stored prediction.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionDto {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Predicting participant.
    pub participant_id: i64,
    /// Podium codes, winner first.
    pub picks: Vec<String>,
    /// First placement.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Prediction> for PredictionDto {
    fn from(p: Prediction) -> Self {
        Self {
            event_id: *p.event_id.as_uuid(),
            participant_id: p.participant_id.get(),
            picks: p.podium.to_codes(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Response body for `PUT /events/{id}/prediction`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlacedPredictionResponse {
    /// Stored prediction.
    pub prediction: PredictionDto,
    /// `true` when a previous prediction was replaced.
    pub is_update: bool,
    /// `false` when the picks were already stored.
    pub changed: bool,
}

impl From<PlacedPrediction> for PlacedPredictionResponse {
    fn from(placed: PlacedPrediction) -> Self {
        Self {
            prediction: placed.prediction.into(),
            is_update: placed.is_update,
            changed: placed.changed,
        }
    }
}

/// Response body for `GET /events/{id}/prediction`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictionDetailResponse {
    /// Stored prediction.
    pub prediction: PredictionDto,
    /// Event name.
    pub event_name: String,
    /// Whether the prediction may still change.
    pub editable: bool,
}

impl From<PredictionView> for PredictionDetailResponse {
    fn from(view: PredictionView) -> Self {
        Self {
            prediction: view.prediction.into(),
            event_name: view.event_name,
            editable: view.editable,
        }
    }
}

/// Official result of an event.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultDto {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Official podium, winner first.
    pub picks: Vec<String>,
    /// Entry time.
    pub saved_at: DateTime<Utc>,
}

impl From<EventResult> for ResultDto {
    fn from(r: EventResult) -> Self {
        Self {
            event_id: *r.event_id.as_uuid(),
            picks: r.podium.to_codes(),
            saved_at: r.saved_at,
        }
    }
}

/// Points one participant earned.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreDto {
    /// Participant.
    pub participant_id: i64,
    /// Display name.
    pub display_name: String,
    /// Points, 0 to 9.
    pub points: u8,
}

impl From<ParticipantScore> for ScoreDto {
    fn from(s: ParticipantScore) -> Self {
        Self {
            participant_id: s.participant_id.get(),
            display_name: s.display_name,
            points: s.points,
        }
    }
}

/// Response body for `PUT /events/{id}/result`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementResponse {
    /// Settled event.
    pub event_id: uuid::Uuid,
    /// Event name.
    pub event_name: String,
    /// Official podium.
    pub picks: Vec<String>,
    /// `true` when a previous result was replaced.
    pub overwrite: bool,
    /// Points per participant, highest first.
    pub scores: Vec<ScoreDto>,
}

impl From<SettlementSummary> for SettlementResponse {
    fn from(s: SettlementSummary) -> Self {
        Self {
            event_id: *s.event_id.as_uuid(),
            event_name: s.event_name,
            picks: s.podium.to_codes(),
            overwrite: s.overwrite,
            scores: s.scores.into_iter().map(Into::into).collect(),
        }
    }
}
