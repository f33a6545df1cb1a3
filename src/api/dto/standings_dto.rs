//! Leaderboard, history and verification DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::service::{HistoryEntry, LeaderboardEntry, ParticipantHistory, TotalsReport};

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// 1-based position.
    pub rank: usize,
    /// Participant.
    pub participant_id: i64,
    /// Display name.
    pub display_name: String,
    /// Total points.
    pub total_points: u32,
}

impl From<LeaderboardEntry> for LeaderboardEntryDto {
    fn from(e: LeaderboardEntry) -> Self {
        Self {
            rank: e.rank,
            participant_id: e.participant_id.get(),
            display_name: e.display_name,
            total_points: e.total_points,
        }
    }
}

/// One event in the caller's history.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryDto {
    /// Event identifier.
    pub event_id: uuid::Uuid,
    /// Event name.
    pub event_name: String,
    /// Event start.
    pub starts_at: DateTime<Utc>,
    /// Event status.
    pub status: String,
    /// Predicted podium.
    pub picks: Vec<String>,
    /// Points earned; absent until scored.
    pub points: Option<u8>,
    /// Whether the prediction may still change.
    pub editable: bool,
}

impl From<HistoryEntry> for HistoryEntryDto {
    fn from(e: HistoryEntry) -> Self {
        Self {
            event_id: *e.event_id.as_uuid(),
            event_name: e.event_name,
            starts_at: e.starts_at,
            status: e.status.as_str().to_string(),
            picks: e.podium.to_codes(),
            points: e.points,
            editable: e.editable,
        }
    }
}

/// Response body for `GET /me/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Participant.
    pub participant_id: i64,
    /// Display name.
    pub display_name: String,
    /// Total points.
    pub total_points: u32,
    /// Predictions placed.
    pub predictions_count: usize,
    /// Newest event first.
    pub entries: Vec<HistoryEntryDto>,
}

impl From<ParticipantHistory> for HistoryResponse {
    fn from(h: ParticipantHistory) -> Self {
        Self {
            participant_id: h.participant_id.get(),
            display_name: h.display_name,
            total_points: h.total_points,
            predictions_count: h.predictions_count,
            entries: h.entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// A participant whose stored total disagrees with its score records.
#[derive(Debug, Serialize, ToSchema)]
pub struct MismatchDto {
    /// Participant.
    pub participant_id: i64,
    /// Stored total.
    pub stored: u32,
    /// Sum of score records.
    pub recomputed: u32,
}

/// Response body for `GET /admin/totals`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TotalsReportDto {
    /// `true` when every total matches.
    pub consistent: bool,
    /// Participants with a non-zero total.
    pub participants_checked: usize,
    /// Score records summed.
    pub records_checked: usize,
    /// Disagreements.
    pub mismatches: Vec<MismatchDto>,
}

impl From<TotalsReport> for TotalsReportDto {
    fn from(r: TotalsReport) -> Self {
        Self {
            consistent: r.consistent,
            participants_checked: r.participants_checked,
            records_checked: r.records_checked,
            mismatches: r
                .mismatches
                .into_iter()
                .map(|m| MismatchDto {
                    participant_id: m.participant_id.get(),
                    stored: m.stored,
                    recomputed: m.recomputed,
                })
                .collect(),
        }
    }
}
