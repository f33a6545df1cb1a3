//! Database row models and their conversion into domain values.
//!
//! Rows are fetched as plain tuples and converted here. Conversion fails
//! with [`LeagueError::Persistence`] when a stored value no longer parses
//! (unknown status string, malformed competitor code, out-of-range points).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Competitor, CompetitorCode, Event, EventId, EventResult, EventStatus, Participant,
    ParticipantId, Podium, Prediction, ScoreRecord,
};
use crate::error::LeagueError;

/// A row from the `participants` table.
pub type ParticipantRow = (i64, String, bool, bool, DateTime<Utc>, DateTime<Utc>);

/// A row from the `competitors` table.
pub type CompetitorRow = (String, String, bool, DateTime<Utc>);

/// A row from the `events` table.
pub type EventRow = (
    Uuid,
    String,
    DateTime<Utc>,
    String,
    bool,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// A row from the `predictions` table.
pub type PredictionRow = (
    i64,
    Uuid,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// A row from the `results` table.
pub type ResultRow = (Uuid, String, String, String, DateTime<Utc>);

/// A row from the `score_records` table.
pub type ScoreRow = (i64, Uuid, i16);

fn corrupt(table: &str, detail: impl std::fmt::Display) -> LeagueError {
    LeagueError::Persistence(format!("corrupt {table} row: {detail}"))
}

fn stored_code(table: &str, raw: &str) -> Result<CompetitorCode, LeagueError> {
    CompetitorCode::parse(raw).map_err(|_| corrupt(table, format!("competitor code {raw:?}")))
}

fn stored_podium(table: &str, first: &str, second: &str, third: &str) -> Result<Podium, LeagueError> {
    Ok(Podium::from_stored([
        stored_code(table, first)?,
        stored_code(table, second)?,
        stored_code(table, third)?,
    ]))
}

/// Converts a participant row; admin status comes from configuration.
#[must_use]
pub fn participant_from_row(row: ParticipantRow, is_admin: bool) -> Participant {
    let (id, display_name, is_allowed, wants_reminders, created_at, updated_at) = row;
    Participant {
        id: ParticipantId::new(id),
        display_name,
        is_admin,
        is_allowed: is_admin || is_allowed,
        wants_reminders,
        created_at,
        updated_at,
    }
}

/// Converts a competitor row.
///
/// # Errors
///
/// Returns [`LeagueError::Persistence`] for a malformed code.
pub fn competitor_from_row(row: CompetitorRow) -> Result<Competitor, LeagueError> {
    let (code, full_name, is_active, created_at) = row;
    Ok(Competitor {
        code: stored_code("competitors", &code)?,
        full_name,
        is_active,
        created_at,
    })
}

/// Converts an event row.
///
/// # Errors
///
/// Returns [`LeagueError::Persistence`] for an unknown status.
pub fn event_from_row(row: EventRow) -> Result<Event, LeagueError> {
    let (id, name, starts_at, status, reminder_sent, deleted, created_at, updated_at) = row;
    let status = EventStatus::from_str_opt(&status)
        .ok_or_else(|| corrupt("events", format!("status {status:?}")))?;
    Ok(Event {
        id: EventId::from_uuid(id),
        name,
        starts_at,
        status,
        reminder_sent,
        deleted,
        created_at,
        updated_at,
    })
}

/// Converts a prediction row.
///
/// # Errors
///
/// Returns [`LeagueError::Persistence`] for malformed codes.
pub fn prediction_from_row(row: PredictionRow) -> Result<Prediction, LeagueError> {
    let (participant_id, event_id, first, second, third, created_at, updated_at) = row;
    Ok(Prediction {
        participant_id: ParticipantId::new(participant_id),
        event_id: EventId::from_uuid(event_id),
        podium: stored_podium("predictions", &first, &second, &third)?,
        created_at,
        updated_at,
    })
}

/// Converts a result row. Distinctness is re-checked at settlement.
///
/// # Errors
///
/// Returns [`LeagueError::Persistence`] for malformed codes.
pub fn result_from_row(row: ResultRow) -> Result<EventResult, LeagueError> {
    let (event_id, first, second, third, saved_at) = row;
    Ok(EventResult {
        event_id: EventId::from_uuid(event_id),
        podium: stored_podium("results", &first, &second, &third)?,
        saved_at,
    })
}

/// Converts a score row.
///
/// # Errors
///
/// Returns [`LeagueError::Persistence`] for points outside `0..=9`.
pub fn score_from_row(row: ScoreRow) -> Result<ScoreRecord, LeagueError> {
    let (participant_id, event_id, points) = row;
    let points = u8::try_from(points)
        .ok()
        .filter(|p| *p <= crate::domain::scoring::MAX_POINTS)
        .ok_or_else(|| corrupt("score_records", format!("points {points}")))?;
    Ok(ScoreRecord {
        participant_id: ParticipantId::new(participant_id),
        event_id: EventId::from_uuid(event_id),
        points,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_reported() {
        let now = Utc::now();
        let row: EventRow = (
            Uuid::new_v4(),
            "Bahrain GP".to_string(),
            now,
            "finished".to_string(),
            false,
            false,
            now,
            now,
        );
        assert!(matches!(event_from_row(row), Err(LeagueError::Persistence(_))));
    }

    #[test]
    fn stored_duplicate_result_loads_but_is_not_well_formed() {
        let row: ResultRow = (
            Uuid::new_v4(),
            "VER".to_string(),
            "VER".to_string(),
            "NOR".to_string(),
            Utc::now(),
        );
        let Ok(result) = result_from_row(row) else {
            panic!("row must load");
        };
        assert!(!result.podium.is_well_formed());
    }

    #[test]
    fn out_of_range_points_are_rejected() {
        assert!(score_from_row((1, Uuid::new_v4(), 12)).is_err());
        assert!(score_from_row((1, Uuid::new_v4(), -1)).is_err());
        let Ok(record) = score_from_row((1, Uuid::new_v4(), 5)) else {
            panic!("valid row");
        };
        assert_eq!(record.points, 5);
    }

    #[test]
    fn configured_admins_are_allowed_on_load() {
        let now = Utc::now();
        let participant = participant_from_row((7, "Ana".to_string(), false, true, now, now), true);
        assert!(participant.is_admin);
        assert!(participant.is_allowed);
    }
}
