//! Participant and competitor DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Competitor, Participant};

/// A league participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantDto {
    /// Chat-platform user id.
    pub participant_id: i64,
    /// Display name.
    pub display_name: String,
    /// Admin rights, from configuration.
    pub is_admin: bool,
    /// Whether the participant may predict.
    pub is_allowed: bool,
    /// Whether pre-event reminders are wanted.
    pub wants_reminders: bool,
    /// First interaction.
    pub created_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantDto {
    fn from(p: Participant) -> Self {
        Self {
            participant_id: p.id.get(),
            display_name: p.display_name,
            is_admin: p.is_admin,
            is_allowed: p.is_allowed,
            wants_reminders: p.wants_reminders,
            created_at: p.created_at,
        }
    }
}

/// A competitor on the roster.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompetitorDto {
    /// Short code, e.g. `VER`.
    pub code: String,
    /// Full name.
    pub full_name: String,
    /// Whether the competitor is shown in pick lists.
    pub is_active: bool,
}

impl From<Competitor> for CompetitorDto {
    fn from(c: Competitor) -> Self {
        Self {
            code: c.code.to_string(),
            full_name: c.full_name,
            is_active: c.is_active,
        }
    }
}
