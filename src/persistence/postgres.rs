//! PostgreSQL implementation of the persistence layer.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{
    self, CompetitorRow, EventRow, ParticipantRow, PredictionRow, ResultRow, ScoreRow,
};
use crate::config::LeagueConfig;
use crate::domain::{
    Competitor, Event, EventEntry, EventId, EventResult, Participant, ParticipantId, Prediction,
    ScoreRecord, StoreSnapshot,
};
use crate::error::LeagueError;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] when the database is
    /// unreachable.
    pub async fn connect(config: &LeagueConfig) -> Result<Self, LeagueError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] when a migration fails.
    pub async fn run_migrations(&self) -> Result<(), LeagueError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the full league state.
    ///
    /// `is_admin` decides admin status, which is configuration and never
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure or when a
    /// stored row no longer parses.
    pub async fn load_snapshot(
        &self,
        is_admin: impl Fn(ParticipantId) -> bool,
    ) -> Result<StoreSnapshot, LeagueError> {
        let participants = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, display_name, is_allowed, wants_reminders, created_at, updated_at \
             FROM participants ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            let admin = is_admin(ParticipantId::new(row.0));
            models::participant_from_row(row, admin)
        })
        .collect();

        let competitors = sqlx::query_as::<_, CompetitorRow>(
            "SELECT code, full_name, is_active, created_at FROM competitors ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(models::competitor_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let mut entries: HashMap<EventId, EventEntry> = sqlx::query_as::<_, EventRow>(
            "SELECT id, name, starts_at, status, reminder_sent, deleted, created_at, updated_at \
             FROM events",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| models::event_from_row(row).map(|event| (event.id, EventEntry::new(event))))
        .collect::<Result<_, _>>()?;

        let predictions = sqlx::query_as::<_, PredictionRow>(
            "SELECT participant_id, event_id, first_pick, second_pick, third_pick, created_at, updated_at \
             FROM predictions",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in predictions {
            let prediction = models::prediction_from_row(row)?;
            if let Some(entry) = entries.get_mut(&prediction.event_id) {
                entry
                    .predictions
                    .insert(prediction.participant_id, prediction);
            }
        }

        let results = sqlx::query_as::<_, ResultRow>(
            "SELECT event_id, first_pick, second_pick, third_pick, saved_at FROM results",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in results {
            let result = models::result_from_row(row)?;
            if let Some(entry) = entries.get_mut(&result.event_id) {
                entry.result = Some(result);
            }
        }

        let score_records = sqlx::query_as::<_, ScoreRow>(
            "SELECT participant_id, event_id, points FROM score_records",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(models::score_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreSnapshot {
            participants,
            competitors,
            events: entries.into_values().collect(),
            score_records,
        })
    }

    /// Inserts or refreshes a participant.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn upsert_participant(&self, participant: &Participant) -> Result<(), LeagueError> {
        sqlx::query(
            "INSERT INTO participants (id, display_name, is_allowed, wants_reminders, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name, \
             is_allowed = EXCLUDED.is_allowed, wants_reminders = EXCLUDED.wants_reminders, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(participant.id.get())
        .bind(&participant.display_name)
        .bind(participant.is_allowed)
        .bind(participant.wants_reminders)
        .bind(participant.created_at)
        .bind(participant.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts roster entries that are not stored yet, leaving existing
    /// rows untouched. Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn seed_competitors(&self, roster: &[Competitor]) -> Result<u64, LeagueError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for competitor in roster {
            let result = sqlx::query(
                "INSERT INTO competitors (code, full_name, is_active, created_at) \
                 VALUES ($1, $2, $3, $4) ON CONFLICT (code) DO NOTHING",
            )
            .bind(competitor.code.as_str())
            .bind(&competitor.full_name)
            .bind(competitor.is_active)
            .bind(competitor.created_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Updates a competitor's active flag.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn set_competitor_active(
        &self,
        competitor: &Competitor,
    ) -> Result<(), LeagueError> {
        sqlx::query("UPDATE competitors SET is_active = $2 WHERE code = $1")
            .bind(competitor.code.as_str())
            .bind(competitor.is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts new events in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure; no event
    /// is stored in that case.
    pub async fn insert_events(&self, events: &[Event]) -> Result<(), LeagueError> {
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                "INSERT INTO events (id, name, starts_at, status, reminder_sent, deleted, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(*event.id.as_uuid())
            .bind(&event.name)
            .bind(event.starts_at)
            .bind(event.status.as_str())
            .bind(event.reminder_sent)
            .bind(event.deleted)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Writes an event's mutable columns.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn update_event(&self, event: &Event) -> Result<(), LeagueError> {
        sqlx::query(
            "UPDATE events SET name = $2, starts_at = $3, status = $4, reminder_sent = $5, \
             deleted = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(*event.id.as_uuid())
        .bind(&event.name)
        .bind(event.starts_at)
        .bind(event.status.as_str())
        .bind(event.reminder_sent)
        .bind(event.deleted)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sets `reminder_sent`. Never clears it.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn mark_reminder_sent(
        &self,
        event_id: EventId,
        at: DateTime<Utc>,
    ) -> Result<(), LeagueError> {
        sqlx::query("UPDATE events SET reminder_sent = TRUE, updated_at = $2 WHERE id = $1")
            .bind(*event_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts or overwrites a prediction.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), LeagueError> {
        let [first, second, third] = prediction.podium.picks();
        sqlx::query(
            "INSERT INTO predictions (participant_id, event_id, first_pick, second_pick, third_pick, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (participant_id, event_id) DO UPDATE SET first_pick = EXCLUDED.first_pick, \
             second_pick = EXCLUDED.second_pick, third_pick = EXCLUDED.third_pick, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(prediction.participant_id.get())
        .bind(*prediction.event_id.as_uuid())
        .bind(first.as_str())
        .bind(second.as_str())
        .bind(third.as_str())
        .bind(prediction.created_at)
        .bind(prediction.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes a prediction.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure.
    pub async fn delete_prediction(
        &self,
        participant_id: ParticipantId,
        event_id: EventId,
    ) -> Result<(), LeagueError> {
        sqlx::query("DELETE FROM predictions WHERE participant_id = $1 AND event_id = $2")
            .bind(participant_id.get())
            .bind(*event_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stores a result and its score records atomically: the event row,
    /// the result row and the event's full set of score records are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError::Persistence`] on database failure; nothing
    /// is written in that case.
    pub async fn save_settlement(
        &self,
        event: &Event,
        result: &EventResult,
        records: &[ScoreRecord],
    ) -> Result<(), LeagueError> {
        let [first, second, third] = result.podium.picks();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE events SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(*event.id.as_uuid())
            .bind(event.status.as_str())
            .bind(event.updated_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO results (event_id, first_pick, second_pick, third_pick, saved_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (event_id) DO UPDATE SET first_pick = EXCLUDED.first_pick, \
             second_pick = EXCLUDED.second_pick, third_pick = EXCLUDED.third_pick, \
             saved_at = EXCLUDED.saved_at",
        )
        .bind(*result.event_id.as_uuid())
        .bind(first.as_str())
        .bind(second.as_str())
        .bind(third.as_str())
        .bind(result.saved_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM score_records WHERE event_id = $1")
            .bind(*event.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for record in records {
            sqlx::query(
                "INSERT INTO score_records (participant_id, event_id, points, computed_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(record.participant_id.get())
            .bind(*record.event_id.as_uuid())
            .bind(i16::from(record.points))
            .bind(result.saved_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
