//! League participants and caller identity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ParticipantId;

/// Longest display name kept; longer names are truncated.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Identity supplied by the caller on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable participant identifier issued by the chat platform.
    pub participant_id: ParticipantId,
    /// Current display name, when the platform provides one.
    pub display_name: Option<String>,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub fn new(participant_id: ParticipantId, display_name: Option<String>) -> Self {
        Self {
            participant_id,
            display_name: display_name.and_then(|name| normalize_display_name(&name)),
        }
    }

    /// Display name, falling back to a name derived from the id.
    #[must_use]
    pub fn name_or_default(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("Participant {}", self.participant_id))
    }
}

/// Trims a display name and caps its length; blank names become `None`.
#[must_use]
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}

/// A league participant. Created on first interaction, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Stable identifier.
    pub id: ParticipantId,
    /// Display name, refreshed on every interaction.
    pub display_name: String,
    /// Whether the participant is a league admin (from configuration).
    pub is_admin: bool,
    /// Whether the participant may place predictions.
    pub is_allowed: bool,
    /// Whether the participant receives pre-event reminders.
    pub wants_reminders: bool,
    /// First interaction.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    /// Creates a participant from a first interaction.
    #[must_use]
    pub fn from_identity(
        identity: &Identity,
        is_admin: bool,
        is_allowed: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: identity.participant_id,
            display_name: identity.name_or_default(),
            is_admin,
            is_allowed: is_admin || is_allowed,
            wants_reminders: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the participant should get reminders.
    #[must_use]
    pub const fn is_reminder_recipient(&self) -> bool {
        self.is_allowed && self.wants_reminders
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_fall_back_to_id() {
        let identity = Identity::new(ParticipantId::new(42), Some("   ".to_string()));
        assert_eq!(identity.display_name, None);
        assert_eq!(identity.name_or_default(), "Participant 42");
    }

    #[test]
    fn long_names_are_truncated() {
        let long = "x".repeat(200);
        let Some(name) = normalize_display_name(&long) else {
            panic!("non-blank name");
        };
        assert_eq!(name.chars().count(), MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn admins_are_always_allowed() {
        let identity = Identity::new(ParticipantId::new(1), Some("Ana".to_string()));
        let admin = Participant::from_identity(&identity, true, false, Utc::now());
        assert!(admin.is_allowed);
        let member = Participant::from_identity(&identity, false, false, Utc::now());
        assert!(!member.is_allowed);
        assert!(!member.is_reminder_recipient());
    }
}
