//! League service: orchestrates league operations and emits events.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc};

use super::views::{
    BulkEventRow, BulkRejection, BulkUploadReport, EventView, HistoryEntry, LeaderboardEntry,
    ParticipantHistory, ParticipantScore, PlacedPrediction, PredictionView, ReminderCandidate,
    SettlementSummary, TotalsReport,
};
use crate::config::LeagueConfig;
use crate::domain::{
    BettingWindow, Clock, Competitor, CompetitorCode, Event, EventBus, EventEntry, EventId,
    EventResult, EventStatus, Identity, LeagueEvent, LeagueStore, Participant, ParticipantId,
    Podium, Prediction, Transition, seed_roster, settle_event,
};
use crate::error::LeagueError;
use crate::persistence::PostgresPersistence;
use crate::service::notifier::Recipient;

/// Leaderboard rows returned when the caller gives no limit.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 20;
/// Largest accepted leaderboard limit.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
/// Longest accepted event name.
pub const MAX_EVENT_NAME_CHARS: usize = 100;
/// Earliest year an event may start in.
pub const EARLIEST_EVENT_YEAR: i32 = 1900;
/// Latest year an event may start in.
pub const LATEST_EVENT_YEAR: i32 = 2200;

/// Orchestration layer for all league operations.
///
/// Owns references to [`LeagueStore`] for state, [`EventBus`] for event
/// emission and, when enabled, [`PostgresPersistence`] for durability.
/// Every mutation follows the pattern: acquire lock → validate against the
/// betting window → write storage → update memory → release lock → emit
/// event.
#[derive(Debug, Clone)]
pub struct LeagueService {
    store: Arc<LeagueStore>,
    event_bus: EventBus,
    persistence: Option<PostgresPersistence>,
    clock: Arc<dyn Clock>,
    config: Arc<LeagueConfig>,
    window: BettingWindow,
}

impl LeagueService {
    /// Creates a new `LeagueService`.
    #[must_use]
    pub fn new(
        store: Arc<LeagueStore>,
        event_bus: EventBus,
        persistence: Option<PostgresPersistence>,
        clock: Arc<dyn Clock>,
        config: LeagueConfig,
    ) -> Self {
        let window = BettingWindow::new(config.closing_offset(), config.timezone);
        Self {
            store,
            event_bus,
            persistence,
            clock,
            config: Arc::new(config),
            window,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`LeagueStore`].
    #[must_use]
    pub const fn store(&self) -> &Arc<LeagueStore> {
        &self.store
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub fn config(&self) -> &LeagueConfig {
        &self.config
    }

    /// Returns the betting window rules.
    #[must_use]
    pub const fn window(&self) -> &BettingWindow {
        &self.window
    }

    /// Current instant according to the service clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Participants ───────────────────────────────────────────────────

    /// Registers the caller on first interaction and refreshes their
    /// display name afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Persistence`] when the write fails.
    pub async fn touch_participant(&self, identity: &Identity) -> Result<Participant, LeagueError> {
        let now = self.clock.now();
        let is_admin = self.config.is_admin(identity.participant_id);
        let mut participants = self.store.participants_mut().await;

        let participant = match participants.get(&identity.participant_id) {
            Some(existing) => {
                let renamed = identity
                    .display_name
                    .as_ref()
                    .is_some_and(|name| *name != existing.display_name);
                if !renamed && existing.is_admin == is_admin {
                    return Ok(existing.clone());
                }
                let mut participant = existing.clone();
                if let Some(name) = &identity.display_name {
                    participant.display_name.clone_from(name);
                }
                participant.is_admin = is_admin;
                participant.is_allowed |= is_admin;
                participant.updated_at = now;
                participant
            }
            None => {
                let participant = Participant::from_identity(
                    identity,
                    is_admin,
                    self.config.auto_approve_participants,
                    now,
                );
                tracing::info!(
                    participant_id = %participant.id,
                    allowed = participant.is_allowed,
                    "participant registered"
                );
                participant
            }
        };

        if let Some(db) = &self.persistence {
            db.upsert_participant(&participant).await?;
        }
        participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn require_admin(&self, identity: &Identity) -> Result<Participant, LeagueError> {
        let participant = self.touch_participant(identity).await?;
        if participant.is_admin {
            Ok(participant)
        } else {
            Err(LeagueError::Forbidden(
                "this action needs league admin rights".to_string(),
            ))
        }
    }

    /// Turns the caller's pre-event reminders on or off.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Persistence`] when the write fails.
    pub async fn set_reminder_preference(
        &self,
        identity: &Identity,
        enabled: bool,
    ) -> Result<Participant, LeagueError> {
        self.touch_participant(identity).await?;
        self.update_participant(identity.participant_id, |p| p.wants_reminders = enabled)
            .await
    }

    /// Lists all participants (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins.
    pub async fn list_participants(
        &self,
        identity: &Identity,
    ) -> Result<Vec<Participant>, LeagueError> {
        self.require_admin(identity).await?;
        Ok(self.store.list_participants().await)
    }

    /// Grants or revokes a participant's right to predict (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins,
    /// [`LeagueError::ParticipantNotFound`] for unknown targets and
    /// [`LeagueError::Validation`] when revoking an admin.
    pub async fn set_participant_allowed(
        &self,
        identity: &Identity,
        target: ParticipantId,
        allowed: bool,
    ) -> Result<Participant, LeagueError> {
        let admin = self.require_admin(identity).await?;
        if !allowed && self.config.is_admin(target) {
            return Err(LeagueError::Validation(
                "admins are always allowed to predict".to_string(),
            ));
        }
        let participant = self
            .update_participant(target, |p| p.is_allowed = allowed)
            .await?;
        tracing::info!(
            actor = %admin.id,
            participant_id = %target,
            allowed,
            "participant access changed"
        );
        Ok(participant)
    }

    async fn update_participant(
        &self,
        participant_id: ParticipantId,
        change: impl FnOnce(&mut Participant),
    ) -> Result<Participant, LeagueError> {
        let mut participants = self.store.participants_mut().await;
        let mut participant = participants
            .get(&participant_id)
            .cloned()
            .ok_or(LeagueError::ParticipantNotFound(participant_id))?;
        change(&mut participant);
        participant.updated_at = self.clock.now();
        if let Some(db) = &self.persistence {
            db.upsert_participant(&participant).await?;
        }
        participants.insert(participant_id, participant.clone());
        Ok(participant)
    }

    // ── Competitors ────────────────────────────────────────────────────

    /// Seeds the season roster when no competitor is known yet. Returns
    /// the number of competitors added.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Persistence`] when the write fails.
    pub async fn seed_roster_if_empty(&self) -> Result<usize, LeagueError> {
        let mut competitors = self.store.competitors_mut().await;
        if !competitors.is_empty() {
            return Ok(0);
        }
        let roster = seed_roster(self.clock.now());
        if let Some(db) = &self.persistence {
            db.seed_competitors(&roster).await?;
        }
        let added = roster.len();
        competitors.extend(roster.into_iter().map(|c| (c.code.clone(), c)));
        tracing::info!(competitors = added, "competitor roster seeded");
        Ok(added)
    }

    /// Lists competitors ordered by code.
    pub async fn list_competitors(&self, include_inactive: bool) -> Vec<Competitor> {
        self.store.list_competitors(include_inactive).await
    }

    /// Activates or deactivates a competitor (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins and
    /// [`LeagueError::CompetitorNotFound`] for unknown codes.
    pub async fn set_competitor_active(
        &self,
        identity: &Identity,
        code: &str,
        active: bool,
    ) -> Result<Competitor, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let code = CompetitorCode::parse(code)
            .map_err(|_| LeagueError::CompetitorNotFound(code.to_string()))?;
        let mut competitors = self.store.competitors_mut().await;
        let mut competitor = competitors
            .get(&code)
            .cloned()
            .ok_or_else(|| LeagueError::CompetitorNotFound(code.to_string()))?;
        competitor.is_active = active;
        if let Some(db) = &self.persistence {
            db.set_competitor_active(&competitor).await?;
        }
        competitors.insert(code, competitor.clone());
        tracing::info!(actor = %admin.id, code = %competitor.code, active, "competitor updated");
        Ok(competitor)
    }

    // ── Events ─────────────────────────────────────────────────────────

    fn view(&self, entry: &EventEntry, now: DateTime<Utc>) -> EventView {
        EventView {
            event: entry.event.clone(),
            status: self.window.effective_status(&entry.event, now),
            closes_at: self.window.closes_at(&entry.event),
            betting_open: self.window.can_mutate_prediction(&entry.event, now),
            has_result: entry.result.is_some(),
            predictions_count: entry.predictions.len(),
        }
    }

    /// Schedules a new event (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins and
    /// [`LeagueError::Validation`] for a blank or overlong name or a start
    /// outside the supported years.
    pub async fn create_event(
        &self,
        identity: &Identity,
        name: &str,
        starts_at: DateTime<Utc>,
    ) -> Result<EventView, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let name = validate_event_name(name)?;
        validate_start(starts_at)?;
        let now = self.clock.now();
        let entry = EventEntry::new(Event::new(name, starts_at, now));

        if let Some(db) = &self.persistence {
            db.insert_events(std::slice::from_ref(&entry.event)).await?;
        }
        let view = self.view(&entry, now);
        self.store.insert_event(entry).await?;

        let _ = self.event_bus.publish(LeagueEvent::EventCreated {
            event_id: view.event.id,
            name: view.event.name.clone(),
            starts_at,
            timestamp: now,
        });
        tracing::info!(
            actor = %admin.id,
            event_id = %view.event.id,
            name = %view.event.name,
            %starts_at,
            "event created"
        );
        Ok(view)
    }

    /// Schedules a new event from a league-local date (`YYYY-MM-DD`) and
    /// time (`HH:MM`) (admin only). Admin rights are checked before the
    /// input is parsed.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins and
    /// [`LeagueError::Validation`] for a bad name, date or time.
    pub async fn schedule_event(
        &self,
        identity: &Identity,
        name: &str,
        date: &str,
        time: &str,
    ) -> Result<EventView, LeagueError> {
        self.require_admin(identity).await?;
        let starts_at = local_start(self.config.timezone, date, time)?;
        self.create_event(identity, name, starts_at).await
    }

    /// Creates every well-formed row in one transaction and reports the
    /// rest (admin only).
    ///
    /// `unparsed_lines` are lines the upload tooling could not split; they
    /// count as rejections.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins and
    /// [`LeagueError::Persistence`] when the transaction fails, in which
    /// case nothing is stored.
    pub async fn bulk_create_events(
        &self,
        identity: &Identity,
        rows: Vec<BulkEventRow>,
        unparsed_lines: Vec<String>,
    ) -> Result<BulkUploadReport, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let now = self.clock.now();

        let mut accepted = Vec::new();
        let mut rejections: Vec<BulkRejection> = unparsed_lines
            .into_iter()
            .map(|line| BulkRejection {
                input: line,
                reason: "expected: name, YYYY-MM-DD, HH:MM".to_string(),
            })
            .collect();

        for row in rows {
            let parsed = validate_event_name(&row.name).and_then(|name| {
                local_start(self.config.timezone, &row.date, &row.time)
                    .map(|starts_at| Event::new(name, starts_at, now))
            });
            match parsed {
                Ok(event) => accepted.push(event),
                Err(e) => rejections.push(BulkRejection {
                    input: format!("{}, {}, {}", row.name, row.date, row.time),
                    reason: e.user_message(),
                }),
            }
        }

        if !accepted.is_empty() {
            if let Some(db) = &self.persistence {
                db.insert_events(&accepted).await?;
            }
            for event in &accepted {
                self.store.insert_event(EventEntry::new(event.clone())).await?;
                let _ = self.event_bus.publish(LeagueEvent::EventCreated {
                    event_id: event.id,
                    name: event.name.clone(),
                    starts_at: event.starts_at,
                    timestamp: now,
                });
            }
        }

        tracing::info!(
            actor = %admin.id,
            accepted = accepted.len(),
            rejected = rejections.len(),
            "bulk event upload processed"
        );
        Ok(BulkUploadReport {
            accepted,
            rejections,
        })
    }

    /// Renames and/or reschedules an event (admin only).
    ///
    /// A due automatic close is recorded before the start moves, so moving
    /// an event later never silently reopens betting.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`], [`LeagueError::Validation`]
    /// and [`LeagueError::StateConflict`] when rescheduling a resulted
    /// event.
    pub async fn update_event(
        &self,
        identity: &Identity,
        event_id: EventId,
        name: Option<&str>,
        starts_at: Option<DateTime<Utc>>,
    ) -> Result<EventView, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let name = name.map(validate_event_name).transpose()?;
        if let Some(starts_at) = starts_at {
            validate_start(starts_at)?;
        }
        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let now = self.clock.now();
        let status = self.window.effective_status(&entry.event, now);
        if status == EventStatus::Resulted
            && starts_at.is_some_and(|start| start != entry.event.starts_at)
        {
            return Err(LeagueError::StateConflict {
                message: "The event already has a result; its start time can no longer change."
                    .to_string(),
                status,
            });
        }

        let mut updated = entry.event.clone();
        updated.status = status;
        if let Some(name) = name {
            updated.name = name;
        }
        if let Some(starts_at) = starts_at {
            updated.starts_at = starts_at;
        }
        updated.updated_at = now;

        if let Some(db) = &self.persistence {
            db.update_event(&updated).await?;
        }
        entry.event = updated;
        let view = self.view(&entry, now);
        drop(entry);

        let _ = self.event_bus.publish(LeagueEvent::EventUpdated {
            event_id,
            name: view.event.name.clone(),
            starts_at: view.event.starts_at,
            timestamp: now,
        });
        tracing::info!(actor = %admin.id, %event_id, "event updated");
        Ok(view)
    }

    /// Renames and/or reschedules an event using a league-local date and
    /// time, which must be given together (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins, then the errors
    /// of [`Self::update_event`].
    pub async fn reschedule_event(
        &self,
        identity: &Identity,
        event_id: EventId,
        name: Option<&str>,
        date: Option<&str>,
        time: Option<&str>,
    ) -> Result<EventView, LeagueError> {
        self.require_admin(identity).await?;
        let starts_at = local_reschedule(self.config.timezone, date, time)?;
        self.update_event(identity, event_id, name, starts_at).await
    }

    /// Soft-deletes an event (admin only). Resulted events are kept.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] and
    /// [`LeagueError::StateConflict`] for resulted events.
    pub async fn delete_event(&self, identity: &Identity, event_id: EventId) -> Result<(), LeagueError> {
        let admin = self.require_admin(identity).await?;
        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let now = self.clock.now();
        if entry.event.status == EventStatus::Resulted {
            return Err(LeagueError::StateConflict {
                message: "Events with a result count towards the standings and cannot be deleted."
                    .to_string(),
                status: EventStatus::Resulted,
            });
        }

        let mut updated = entry.event.clone();
        updated.deleted = true;
        updated.updated_at = now;
        if let Some(db) = &self.persistence {
            db.update_event(&updated).await?;
        }
        entry.event = updated;
        drop(entry);

        let _ = self.event_bus.publish(LeagueEvent::EventDeleted {
            event_id,
            actor: admin.id,
            timestamp: now,
        });
        tracing::info!(actor = %admin.id, %event_id, "event deleted");
        Ok(())
    }

    /// Closes betting ahead of the automatic close (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] and
    /// [`LeagueError::StateConflict`] when betting is not open.
    pub async fn close_betting(&self, identity: &Identity, event_id: EventId) -> Result<EventView, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let view = self
            .apply_transition(event_id, Transition::Close)
            .await?;
        let _ = self.event_bus.publish(LeagueEvent::BettingClosed {
            event_id,
            actor: Some(admin.id),
            timestamp: view.event.updated_at,
        });
        tracing::info!(actor = %admin.id, %event_id, "betting closed by admin");
        Ok(view)
    }

    /// Reopens betting after a close (admin only). The override is logged
    /// with actor and reason.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Validation`] for a blank reason,
    /// [`LeagueError::EventNotFound`] and [`LeagueError::StateConflict`]
    /// when the event is not closed or its window has already passed.
    pub async fn reopen_betting(
        &self,
        identity: &Identity,
        event_id: EventId,
        reason: &str,
    ) -> Result<EventView, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LeagueError::Validation(
                "a reason is required to reopen betting".to_string(),
            ));
        }
        let view = self
            .apply_transition(event_id, Transition::Reopen)
            .await?;
        let _ = self.event_bus.publish(LeagueEvent::BettingReopened {
            event_id,
            actor: admin.id,
            reason: reason.to_string(),
            timestamp: view.event.updated_at,
        });
        tracing::warn!(actor = %admin.id, %event_id, reason, "betting reopened by admin");
        Ok(view)
    }

    async fn apply_transition(
        &self,
        event_id: EventId,
        transition: Transition,
    ) -> Result<EventView, LeagueError> {
        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let now = self.clock.now();
        let next = self.window.transition(&entry.event, now, transition)?;
        let mut updated = entry.event.clone();
        updated.status = next;
        updated.updated_at = now;
        if let Some(db) = &self.persistence {
            db.update_event(&updated).await?;
        }
        entry.event = updated;
        Ok(self.view(&entry, now))
    }

    /// Lists non-deleted events ordered by start.
    pub async fn list_events(&self) -> Vec<EventView> {
        let now = self.clock.now();
        let mut views = Vec::new();
        for handle in self.store.event_handles().await {
            let entry = handle.read().await;
            if !entry.event.deleted {
                views.push(self.view(&entry, now));
            }
        }
        views.sort_by(|a, b| {
            a.event
                .starts_at
                .cmp(&b.event.starts_at)
                .then(a.event.id.cmp(&b.event.id))
        });
        views
    }

    /// Returns one non-deleted event.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`].
    pub async fn get_event(&self, event_id: EventId) -> Result<EventView, LeagueError> {
        let handle = self.store.event(event_id).await?;
        let entry = handle.read().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        Ok(self.view(&entry, self.clock.now()))
    }

    /// Events whose betting is closed and that still wait for a result
    /// (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins.
    pub async fn events_awaiting_result(
        &self,
        identity: &Identity,
    ) -> Result<Vec<EventView>, LeagueError> {
        self.require_admin(identity).await?;
        Ok(self
            .list_events()
            .await
            .into_iter()
            .filter(|view| view.status == EventStatus::BettingClosed)
            .collect())
    }

    // ── Predictions ────────────────────────────────────────────────────

    /// Places or replaces the caller's prediction.
    ///
    /// Submitting the stored picks again succeeds without a write.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] until an admin allows the caller,
    /// [`LeagueError::EventNotFound`], [`LeagueError::BettingClosed`],
    /// [`LeagueError::DuplicatePick`], [`LeagueError::Validation`] and
    /// [`LeagueError::InvalidCompetitor`].
    pub async fn place_prediction(
        &self,
        identity: &Identity,
        event_id: EventId,
        picks: &[String],
    ) -> Result<PlacedPrediction, LeagueError> {
        let participant = self.touch_participant(identity).await?;
        if !participant.is_allowed {
            return Err(LeagueError::Forbidden(
                "an admin has not approved you for predictions yet".to_string(),
            ));
        }

        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let now = self.clock.now();
        self.window.ensure_open(&entry.event, now)?;

        let podium = Podium::parse(picks)?;
        if let Some(unknown) = self.store.first_unknown_competitor(podium.picks()).await {
            return Err(LeagueError::InvalidCompetitor(unknown.to_string()));
        }

        let existing = entry.predictions.get(&participant.id);
        if let Some(existing) = existing
            && existing.podium == podium
        {
            return Ok(PlacedPrediction {
                prediction: existing.clone(),
                is_update: true,
                changed: false,
            });
        }
        let is_update = existing.is_some();
        let prediction = Prediction {
            participant_id: participant.id,
            event_id,
            podium,
            created_at: existing.map_or(now, |p| p.created_at),
            updated_at: now,
        };

        if let Some(db) = &self.persistence {
            db.upsert_prediction(&prediction).await?;
        }
        entry.predictions.insert(participant.id, prediction.clone());
        let event_name = entry.event.name.clone();
        let starts_at = entry.event.starts_at;
        drop(entry);

        let _ = self.event_bus.publish(LeagueEvent::PredictionPlaced {
            event_id,
            event_name,
            starts_at,
            podium: prediction.podium.clone(),
            participant_id: participant.id,
            display_name: participant.display_name.clone(),
            is_update,
            timestamp: now,
        });
        tracing::info!(
            participant_id = %participant.id,
            %event_id,
            is_update,
            "prediction placed"
        );
        Ok(PlacedPrediction {
            prediction,
            is_update,
            changed: true,
        })
    }

    /// Withdraws the caller's prediction while betting is open.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`],
    /// [`LeagueError::BettingClosed`] and [`LeagueError::NoPrediction`].
    pub async fn delete_prediction(
        &self,
        identity: &Identity,
        event_id: EventId,
    ) -> Result<(), LeagueError> {
        let participant = self.touch_participant(identity).await?;
        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let now = self.clock.now();
        self.window.ensure_open(&entry.event, now)?;
        if !entry.predictions.contains_key(&participant.id) {
            return Err(LeagueError::NoPrediction(event_id));
        }

        if let Some(db) = &self.persistence {
            db.delete_prediction(participant.id, event_id).await?;
        }
        entry.predictions.remove(&participant.id);
        drop(entry);

        let _ = self.event_bus.publish(LeagueEvent::PredictionDeleted {
            event_id,
            participant_id: participant.id,
            timestamp: now,
        });
        tracing::info!(participant_id = %participant.id, %event_id, "prediction deleted");
        Ok(())
    }

    /// Returns the caller's prediction for an event.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] and
    /// [`LeagueError::NoPrediction`].
    pub async fn get_prediction(
        &self,
        identity: &Identity,
        event_id: EventId,
    ) -> Result<PredictionView, LeagueError> {
        let participant = self.touch_participant(identity).await?;
        let handle = self.store.event(event_id).await?;
        let entry = handle.read().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        let prediction = entry
            .predictions
            .get(&participant.id)
            .cloned()
            .ok_or(LeagueError::NoPrediction(event_id))?;
        Ok(PredictionView {
            prediction,
            event_name: entry.event.name.clone(),
            editable: self
                .window
                .can_mutate_prediction(&entry.event, self.clock.now()),
        })
    }

    // ── Results ────────────────────────────────────────────────────────

    /// Enters the official result and settles the event (admin only).
    ///
    /// Replacing an existing result requires `confirm_overwrite`; the
    /// event is then re-settled and totals move by the difference.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`], [`LeagueError::EventNotFound`],
    /// [`LeagueError::DuplicatePick`], [`LeagueError::InvalidCompetitor`],
    /// [`LeagueError::StateConflict`] while betting is open or when an
    /// overwrite is not confirmed, and [`LeagueError::ScoringFailure`].
    pub async fn enter_result(
        &self,
        identity: &Identity,
        event_id: EventId,
        picks: &[String],
        confirm_overwrite: bool,
    ) -> Result<SettlementSummary, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let podium = Podium::parse(picks)?;

        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        if let Some(unknown) = self.store.first_unknown_competitor(podium.picks()).await {
            return Err(LeagueError::InvalidCompetitor(unknown.to_string()));
        }

        let now = self.clock.now();
        let overwrite = entry.event.status == EventStatus::Resulted;
        if overwrite && !confirm_overwrite {
            return Err(LeagueError::StateConflict {
                message: "A result is already entered. Confirm the overwrite to replace it."
                    .to_string(),
                status: EventStatus::Resulted,
            });
        }
        let transition = if overwrite {
            Transition::Amend
        } else {
            Transition::Resolve
        };
        let next = self.window.transition(&entry.event, now, transition)?;

        let result = EventResult {
            event_id,
            podium: podium.clone(),
            saved_at: now,
        };
        let mut settled = entry.clone();
        settled.event.status = next;
        settled.event.updated_at = now;
        settled.result = Some(result.clone());
        let records = settle_event(&settled)?;

        if let Some(db) = &self.persistence {
            db.save_settlement(&settled.event, &result, &records).await?;
        }
        *entry = settled;
        self.store
            .ledger()
            .write()
            .await
            .replace_event_scores(event_id, &records);
        let event_name = entry.event.name.clone();
        drop(entry);

        let names: HashMap<ParticipantId, String> = self
            .store
            .list_participants()
            .await
            .into_iter()
            .map(|p| (p.id, p.display_name))
            .collect();
        let mut scores: Vec<ParticipantScore> = records
            .iter()
            .map(|record| ParticipantScore {
                participant_id: record.participant_id,
                display_name: names
                    .get(&record.participant_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Participant {}", record.participant_id)),
                points: record.points,
            })
            .collect();
        scores.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.participant_id.cmp(&b.participant_id))
        });

        let _ = self.event_bus.publish(LeagueEvent::ResultSettled {
            event_id,
            overwrite,
            scored: records.len(),
            timestamp: now,
        });
        if overwrite {
            tracing::warn!(actor = %admin.id, %event_id, scored = records.len(), "result overwritten and event re-settled");
        } else {
            tracing::info!(actor = %admin.id, %event_id, scored = records.len(), "result entered and event settled");
        }
        Ok(SettlementSummary {
            event_id,
            event_name,
            podium,
            overwrite,
            scores,
        })
    }

    /// Returns the official result of an event.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] and
    /// [`LeagueError::ResultNotFound`].
    pub async fn get_result(&self, event_id: EventId) -> Result<EventResult, LeagueError> {
        let handle = self.store.event(event_id).await?;
        let entry = handle.read().await;
        if entry.event.deleted {
            return Err(LeagueError::EventNotFound(event_id));
        }
        entry
            .result
            .clone()
            .ok_or(LeagueError::ResultNotFound(event_id))
    }

    // ── Standings ──────────────────────────────────────────────────────

    /// Standings ordered by total points, then participant id.
    ///
    /// Every allowed participant is listed, including those with zero
    /// points.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Validation`] for a limit outside
    /// `1..=MAX_LEADERBOARD_LIMIT`.
    pub async fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>, LeagueError> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
            return Err(LeagueError::Validation(format!(
                "limit must be between 1 and {MAX_LEADERBOARD_LIMIT}"
            )));
        }

        let totals = self.store.ledger().read().await.totals().clone();
        let participants = self.store.list_participants().await;

        let mut rows: Vec<(ParticipantId, String, u32)> = participants
            .iter()
            .filter(|p| p.is_allowed || totals.contains_key(&p.id))
            .map(|p| (p.id, p.display_name.clone(), totals.get(&p.id).copied().unwrap_or(0)))
            .collect();
        for (participant_id, total) in &totals {
            if !participants.iter().any(|p| p.id == *participant_id) {
                rows.push((*participant_id, format!("Participant {participant_id}"), *total));
            }
        }
        rows.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        Ok(rows
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (participant_id, display_name, total_points))| LeaderboardEntry {
                rank: index + 1,
                participant_id,
                display_name,
                total_points,
            })
            .collect())
    }

    /// The caller's totals and predictions, newest event first.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Persistence`] when registering the caller
    /// fails.
    pub async fn history(&self, identity: &Identity) -> Result<ParticipantHistory, LeagueError> {
        let participant = self.touch_participant(identity).await?;
        let now = self.clock.now();

        let mut entries = Vec::new();
        for handle in self.store.event_handles().await {
            let entry = handle.read().await;
            if entry.event.deleted {
                continue;
            }
            if let Some(prediction) = entry.predictions.get(&participant.id) {
                entries.push(HistoryEntry {
                    event_id: entry.event.id,
                    event_name: entry.event.name.clone(),
                    starts_at: entry.event.starts_at,
                    status: self.window.effective_status(&entry.event, now),
                    podium: prediction.podium.clone(),
                    points: None,
                    editable: self.window.can_mutate_prediction(&entry.event, now),
                });
            }
        }

        let ledger = self.store.ledger().read().await;
        for entry in &mut entries {
            entry.points = ledger.points_for(participant.id, entry.event_id);
        }
        let total_points = ledger.total(participant.id);
        drop(ledger);

        entries.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        Ok(ParticipantHistory {
            participant_id: participant.id,
            display_name: participant.display_name,
            total_points,
            predictions_count: entries.len(),
            entries,
        })
    }

    /// Recomputes every total from score records and reports drift
    /// (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Forbidden`] for non-admins.
    pub async fn verify_totals(&self, identity: &Identity) -> Result<TotalsReport, LeagueError> {
        let admin = self.require_admin(identity).await?;
        let ledger = self.store.ledger().read().await;
        let mismatches = ledger.mismatches();
        let report = TotalsReport {
            consistent: mismatches.is_empty(),
            participants_checked: ledger.totals().len(),
            records_checked: ledger.record_count(),
            mismatches,
        };
        drop(ledger);
        if report.consistent {
            tracing::info!(actor = %admin.id, records = report.records_checked, "totals verified");
        } else {
            tracing::error!(
                actor = %admin.id,
                mismatches = report.mismatches.len(),
                "totals disagree with score records"
            );
        }
        Ok(report)
    }

    // ── Scheduler support ──────────────────────────────────────────────

    /// Events whose reminder is due at the current instant: not deleted,
    /// betting still open, reminder not yet sent and start within
    /// `lead`.
    pub async fn reminder_candidates(&self, lead: chrono::Duration) -> Vec<ReminderCandidate> {
        let now = self.clock.now();
        let mut due = Vec::new();
        for handle in self.store.event_handles().await {
            let entry = handle.read().await;
            let event = &entry.event;
            if event.deleted
                || event.reminder_sent
                || !self.window.can_mutate_prediction(event, now)
                || event
                    .starts_at
                    .checked_sub_signed(lead)
                    .is_some_and(|remind_from| now < remind_from)
            {
                continue;
            }
            due.push(ReminderCandidate {
                event_id: event.id,
                name: event.name.clone(),
                starts_at: event.starts_at,
                closes_at: self.window.closes_at(event),
            });
        }
        due.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        due
    }

    /// Everyone who should receive reminders: allowed participants who
    /// want them, plus the configured group chat.
    pub async fn reminder_recipients(&self) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> = self
            .store
            .list_participants()
            .await
            .into_iter()
            .filter(Participant::is_reminder_recipient)
            .map(|p| Recipient::Participant(p.id))
            .collect();
        if let Some(chat) = &self.config.reminder_group_chat {
            recipients.push(Recipient::Group(chat.clone()));
        }
        recipients
    }

    /// Allowed participants other than `except`, for announcements.
    pub async fn announcement_recipients(&self, except: ParticipantId) -> Vec<Recipient> {
        self.store
            .list_participants()
            .await
            .into_iter()
            .filter(|p| p.is_allowed && p.id != except)
            .map(|p| Recipient::Participant(p.id))
            .collect()
    }

    /// Records that the reminder for `event_id` went out, durably first.
    /// Returns `false` when the flag was already set.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] and
    /// [`LeagueError::Persistence`]; the in-memory flag is left unset when
    /// the durable write fails.
    pub async fn mark_reminder_sent(&self, event_id: EventId) -> Result<bool, LeagueError> {
        let handle = self.store.event(event_id).await?;
        let mut entry = handle.write().await;
        if entry.event.reminder_sent {
            return Ok(false);
        }
        let now = self.clock.now();
        if let Some(db) = &self.persistence {
            db.mark_reminder_sent(event_id, now).await?;
        }
        entry.event.reminder_sent = true;
        entry.event.updated_at = now;
        Ok(true)
    }

    /// Records every automatic close that is due. Failures are logged and
    /// the event is retried on the next sweep.
    pub async fn close_due_events(&self) -> Vec<EventId> {
        let now = self.clock.now();
        let mut closed = Vec::new();
        for handle in self.store.event_handles().await {
            {
                let entry = handle.read().await;
                if entry.event.deleted || !self.window.close_is_due(&entry.event, now) {
                    continue;
                }
            }
            let mut entry = handle.write().await;
            if entry.event.deleted || !self.window.close_is_due(&entry.event, now) {
                continue;
            }
            let mut updated = entry.event.clone();
            updated.status = EventStatus::BettingClosed;
            updated.updated_at = now;
            if let Some(db) = &self.persistence
                && let Err(e) = db.update_event(&updated).await
            {
                tracing::error!(event_id = %updated.id, error = %e, "failed to record automatic close");
                continue;
            }
            let event_id = updated.id;
            entry.event = updated;
            drop(entry);

            let _ = self.event_bus.publish(LeagueEvent::BettingClosed {
                event_id,
                actor: None,
                timestamp: now,
            });
            tracing::info!(%event_id, "betting closed automatically");
            closed.push(event_id);
        }
        closed
    }

    /// Formats an instant in the league timezone.
    #[must_use]
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.config.timezone)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

fn validate_event_name(raw: &str) -> Result<String, LeagueError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LeagueError::Validation("event name is empty".to_string()));
    }
    if name.chars().count() > MAX_EVENT_NAME_CHARS {
        return Err(LeagueError::Validation(format!(
            "event name is longer than {MAX_EVENT_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_start(starts_at: DateTime<Utc>) -> Result<(), LeagueError> {
    if (EARLIEST_EVENT_YEAR..=LATEST_EVENT_YEAR).contains(&starts_at.year()) {
        Ok(())
    } else {
        Err(LeagueError::Validation(format!(
            "events must start between {EARLIEST_EVENT_YEAR} and {LATEST_EVENT_YEAR}"
        )))
    }
}

fn local_start(timezone: FixedOffset, date: &str, time: &str) -> Result<DateTime<Utc>, LeagueError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        LeagueError::Validation(format!("date '{}' is not YYYY-MM-DD", date.trim()))
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| LeagueError::Validation(format!("time '{}' is not HH:MM", time.trim())))?;
    let starts_at = date
        .and_time(time)
        .and_local_timezone(timezone)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| LeagueError::Validation("start time does not exist".to_string()))?;
    validate_start(starts_at)?;
    Ok(starts_at)
}

fn local_reschedule(
    timezone: FixedOffset,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<Option<DateTime<Utc>>, LeagueError> {
    match (date, time) {
        (None, None) => Ok(None),
        (Some(date), Some(time)) => local_start(timezone, date, time).map(Some),
        _ => Err(LeagueError::Validation(
            "date and time must be changed together".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::ManualClock;

    const ADMIN: i64 = 1;
    const ANA: i64 = 10;
    const BEN: i64 = 11;

    struct Harness {
        service: LeagueService,
        clock: Arc<ManualClock>,
    }

    fn start() -> DateTime<Utc> {
        let Some(start) = DateTime::from_timestamp(1_740_931_200, 0) else {
            panic!("valid timestamp");
        };
        start
    }

    async fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(start() - Duration::days(2)));
        let config = LeagueConfig {
            persistence_enabled: false,
            bet_closing_offset_minutes: 10,
            admin_ids: [ParticipantId::new(ADMIN)].into_iter().collect(),
            auto_approve_participants: true,
            ..LeagueConfig::default()
        };
        let service = LeagueService::new(
            Arc::new(LeagueStore::new()),
            EventBus::new(64),
            None,
            Arc::clone(&clock) as Arc<dyn Clock>,
            config,
        );
        let Ok(_) = service.seed_roster_if_empty().await else {
            panic!("seeding failed");
        };
        Harness { service, clock }
    }

    fn who(id: i64) -> Identity {
        Identity::new(ParticipantId::new(id), Some(format!("Player {id}")))
    }

    fn picks(codes: [&str; 3]) -> Vec<String> {
        codes.iter().map(|c| (*c).to_string()).collect()
    }

    async fn bahrain(h: &Harness) -> EventId {
        let Ok(view) = h.service.create_event(&who(ADMIN), "Bahrain GP", start()).await else {
            panic!("event creation failed");
        };
        view.event.id
    }

    #[tokio::test]
    async fn non_admin_cannot_create_events() {
        let h = harness().await;
        let result = h.service.create_event(&who(ANA), "Bahrain GP", start()).await;
        assert!(matches!(result, Err(LeagueError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unapproved_participant_is_forbidden() {
        let h = harness().await;
        let clock = Arc::clone(&h.clock);
        let strict = LeagueService::new(
            Arc::clone(h.service.store()),
            EventBus::new(8),
            None,
            clock as Arc<dyn Clock>,
            LeagueConfig {
                auto_approve_participants: false,
                ..h.service.config().clone()
            },
        );
        let event_id = bahrain(&h).await;
        let result = strict
            .place_prediction(&who(99), event_id, &picks(["VER", "NOR", "PIA"]))
            .await;
        assert!(matches!(result, Err(LeagueError::Forbidden(_))));

        let Ok(_) = strict
            .set_participant_allowed(&who(ADMIN), ParticipantId::new(99), true)
            .await
        else {
            panic!("approval failed");
        };
        assert!(
            strict
                .place_prediction(&who(99), event_id, &picks(["VER", "NOR", "PIA"]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn prediction_window_is_enforced() {
        let h = harness().await;
        let event_id = bahrain(&h).await;

        h.clock.set(start() - Duration::minutes(20));
        let Ok(first) = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "NOR", "PIA"]))
            .await
        else {
            panic!("placement inside the window failed");
        };
        assert!(!first.is_update);

        h.clock.set(start() - Duration::minutes(5));
        let late = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["LEC", "HAM", "RUS"]))
            .await;
        assert!(matches!(late, Err(LeagueError::BettingClosed { .. })));

        let Ok(view) = h.service.get_prediction(&who(ANA), event_id).await else {
            panic!("prediction missing");
        };
        assert_eq!(view.prediction.podium.to_codes(), vec!["VER", "NOR", "PIA"]);
        assert!(!view.editable);
    }

    #[tokio::test]
    async fn identical_resubmission_is_a_no_op() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        let mut rx = h.service.event_bus().subscribe();

        let Ok(_) = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "NOR", "PIA"]))
            .await
        else {
            panic!("placement failed");
        };
        h.clock.advance(Duration::minutes(1));
        let Ok(again) = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["ver", "nor", "pia"]))
            .await
        else {
            panic!("identical resubmission failed");
        };
        assert!(!again.changed);
        assert_eq!(again.prediction.created_at, again.prediction.updated_at);

        let Ok(LeagueEvent::PredictionPlaced { .. }) = rx.recv().await else {
            panic!("expected one placement event");
        };
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn picks_are_validated() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        let dup = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "VER", "PIA"]))
            .await;
        assert!(matches!(dup, Err(LeagueError::DuplicatePick(_))));
        let unknown = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "XYZ", "PIA"]))
            .await;
        assert!(matches!(unknown, Err(LeagueError::InvalidCompetitor(_))));
        let missing = h
            .service
            .place_prediction(&who(ANA), EventId::new(), &picks(["VER", "NOR", "PIA"]))
            .await;
        assert!(matches!(missing, Err(LeagueError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn inactive_competitors_remain_pickable() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        let Ok(_) = h.service.set_competitor_active(&who(ADMIN), "doo", false).await else {
            panic!("deactivation failed");
        };
        assert_eq!(h.service.list_competitors(false).await.len(), 19);
        assert!(
            h.service
                .place_prediction(&who(ANA), event_id, &picks(["DOO", "NOR", "PIA"]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn delete_prediction_requires_existing_row() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        assert!(matches!(
            h.service.delete_prediction(&who(ANA), event_id).await,
            Err(LeagueError::NoPrediction(_))
        ));
        let _ = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "NOR", "PIA"]))
            .await;
        assert!(h.service.delete_prediction(&who(ANA), event_id).await.is_ok());
        assert!(matches!(
            h.service.get_prediction(&who(ANA), event_id).await,
            Err(LeagueError::NoPrediction(_))
        ));
    }

    #[tokio::test]
    async fn result_requires_closed_betting_and_confirmed_overwrite() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        let _ = h
            .service
            .place_prediction(&who(ANA), event_id, &picks(["VER", "NOR", "PIA"]))
            .await;
        let _ = h
            .service
            .place_prediction(&who(BEN), event_id, &picks(["LEC", "HAM", "RUS"]))
            .await;

        let early = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["VER", "PIA", "NOR"]), false)
            .await;
        assert!(matches!(
            early,
            Err(LeagueError::StateConflict { status: EventStatus::Scheduled, .. })
        ));

        h.clock.set(start() + Duration::hours(2));
        let Ok(summary) = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["VER", "PIA", "NOR"]), false)
            .await
        else {
            panic!("result entry failed");
        };
        assert!(!summary.overwrite);
        let points: Vec<(i64, u8)> = summary
            .scores
            .iter()
            .map(|s| (s.participant_id.get(), s.points))
            .collect();
        assert_eq!(points, vec![(ANA, 5), (BEN, 0)]);

        let unconfirmed = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["LEC", "HAM", "RUS"]), false)
            .await;
        assert!(matches!(
            unconfirmed,
            Err(LeagueError::StateConflict { status: EventStatus::Resulted, .. })
        ));

        let Ok(resettled) = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["LEC", "HAM", "RUS"]), true)
            .await
        else {
            panic!("overwrite failed");
        };
        assert!(resettled.overwrite);
        let Ok(board) = h.service.leaderboard(None).await else {
            panic!("leaderboard failed");
        };
        let totals: Vec<(i64, u32)> = board
            .iter()
            .map(|e| (e.participant_id.get(), e.total_points))
            .collect();
        assert_eq!(totals.first(), Some(&(BEN, 9)));
        assert!(totals.contains(&(ANA, 0)));
    }

    #[tokio::test]
    async fn reopen_needs_reason_and_a_future_window() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        h.clock.set(start() - Duration::hours(5));
        let Ok(_) = h.service.close_betting(&who(ADMIN), event_id).await else {
            panic!("close failed");
        };
        assert!(matches!(
            h.service.reopen_betting(&who(ADMIN), event_id, "  ").await,
            Err(LeagueError::Validation(_))
        ));
        let Ok(view) = h
            .service
            .reopen_betting(&who(ADMIN), event_id, "closed by mistake")
            .await
        else {
            panic!("reopen failed");
        };
        assert!(view.betting_open);

        h.clock.set(start() - Duration::minutes(1));
        assert!(matches!(
            h.service.reopen_betting(&who(ADMIN), event_id, "late").await,
            Err(LeagueError::StateConflict { .. })
        ));
    }

    #[tokio::test]
    async fn moving_a_closed_event_later_keeps_it_closed() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        h.clock.set(start() - Duration::minutes(5));
        let Ok(view) = h
            .service
            .update_event(&who(ADMIN), event_id, None, Some(start() + Duration::days(1)))
            .await
        else {
            panic!("update failed");
        };
        assert_eq!(view.event.status, EventStatus::BettingClosed);
        assert!(!view.betting_open);
    }

    #[tokio::test]
    async fn resulted_events_cannot_be_deleted() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        h.clock.set(start() + Duration::hours(2));
        let _ = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["VER", "PIA", "NOR"]), false)
            .await;
        assert!(matches!(
            h.service.delete_event(&who(ADMIN), event_id).await,
            Err(LeagueError::StateConflict { .. })
        ));
    }

    #[tokio::test]
    async fn deleted_events_disappear() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        let Ok(()) = h.service.delete_event(&who(ADMIN), event_id).await else {
            panic!("delete failed");
        };
        assert!(h.service.list_events().await.is_empty());
        assert!(matches!(
            h.service.get_event(event_id).await,
            Err(LeagueError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn leaderboard_limits_are_validated() {
        let h = harness().await;
        assert!(h.service.leaderboard(Some(0)).await.is_err());
        assert!(h.service.leaderboard(Some(101)).await.is_err());
        assert!(h.service.leaderboard(Some(100)).await.is_ok());
    }

    #[tokio::test]
    async fn history_lists_points_and_pending_entries() {
        let h = harness().await;
        let scored = bahrain(&h).await;
        let Ok(later) = h
            .service
            .create_event(&who(ADMIN), "Saudi Arabian GP", start() + Duration::days(7))
            .await
        else {
            panic!("event creation failed");
        };
        let _ = h
            .service
            .place_prediction(&who(ANA), scored, &picks(["VER", "NOR", "PIA"]))
            .await;
        let _ = h
            .service
            .place_prediction(&who(ANA), later.event.id, &picks(["NOR", "PIA", "VER"]))
            .await;
        h.clock.set(start() + Duration::hours(2));
        let _ = h
            .service
            .enter_result(&who(ADMIN), scored, &picks(["VER", "PIA", "NOR"]), false)
            .await;

        let Ok(history) = h.service.history(&who(ANA)).await else {
            panic!("history failed");
        };
        assert_eq!(history.total_points, 5);
        assert_eq!(history.predictions_count, 2);
        let points: Vec<Option<u8>> = history.entries.iter().map(|e| e.points).collect();
        assert_eq!(points, vec![None, Some(5)]);
        assert!(history.entries.first().is_some_and(|e| e.editable));
    }

    #[tokio::test]
    async fn verify_totals_reports_consistency() {
        let h = harness().await;
        let Ok(report) = h.service.verify_totals(&who(ADMIN)).await else {
            panic!("verification failed");
        };
        assert!(report.consistent);
        assert!(matches!(
            h.service.verify_totals(&who(ANA)).await,
            Err(LeagueError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn close_due_events_records_lazy_closures_once() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        assert!(h.service.close_due_events().await.is_empty());
        h.clock.set(start() - Duration::minutes(5));
        assert_eq!(h.service.close_due_events().await, vec![event_id]);
        assert!(h.service.close_due_events().await.is_empty());
        let Ok(view) = h.service.get_event(event_id).await else {
            panic!("event missing");
        };
        assert_eq!(view.event.status, EventStatus::BettingClosed);
    }

    #[test]
    fn local_start_applies_timezone() {
        let Some(tz) = FixedOffset::east_opt(3 * 3600) else {
            panic!("valid offset");
        };
        let Ok(instant) = local_start(tz, "2025-03-02", "19:00") else {
            panic!("valid input");
        };
        assert_eq!(instant, start());
        assert!(local_start(tz, "2025-02-30", "19:00").is_err());
        assert!(local_start(tz, "2025-03-02", "7pm").is_err());
    }
    #[tokio::test]
    async fn start_years_outside_league_range_are_rejected() {
        let h = harness().await;
        let admin = who(ADMIN);
        let rows = vec![
            BulkEventRow {
                name: "Bahrain GP".to_string(),
                date: "2025-03-02".to_string(),
                time: "18:00".to_string(),
            },
            BulkEventRow {
                name: "Ancient GP".to_string(),
                date: "-262143-01-01".to_string(),
                time: "00:00".to_string(),
            },
            BulkEventRow {
                name: "Future GP".to_string(),
                date: "2301-06-01".to_string(),
                time: "12:00".to_string(),
            },
        ];
        let Ok(report) = h.service.bulk_create_events(&admin, rows, Vec::new()).await else {
            panic!("bulk upload failed");
        };
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.rejections.len(), 2);

        let direct = h
            .service
            .create_event(&admin, "Ancient GP", DateTime::<Utc>::MIN_UTC)
            .await;
        assert!(matches!(direct, Err(LeagueError::Validation(_))));
        let scheduled = h
            .service
            .schedule_event(&admin, "Future GP", "2301-06-01", "12:00")
            .await;
        assert!(matches!(scheduled, Err(LeagueError::Validation(_))));

        assert_eq!(h.service.reminder_candidates(Duration::hours(2)).await.len(), 0);
        assert_eq!(h.service.list_events().await.len(), 1);
    }

    #[tokio::test]
    async fn stored_event_at_earliest_instant_does_not_break_sweeps() {
        let h = harness().await;
        let event = Event::new("Ancient GP".to_string(), DateTime::<Utc>::MIN_UTC, start());
        let event_id = event.id;
        let Ok(_) = h.service.store().insert_event(EventEntry::new(event)).await else {
            panic!("insert failed");
        };

        assert!(h.service.reminder_candidates(Duration::hours(2)).await.is_empty());
        assert_eq!(h.service.close_due_events().await, vec![event_id]);
        let Ok(view) = h.service.get_event(event_id).await else {
            panic!("event missing");
        };
        assert_eq!(view.status, EventStatus::BettingClosed);
    }

    #[tokio::test]
    async fn admin_rights_are_checked_before_dates() {
        let h = harness().await;
        let event_id = bahrain(&h).await;

        let created = h
            .service
            .schedule_event(&who(ANA), "Bahrain GP", "not-a-date", "19:00")
            .await;
        assert!(matches!(created, Err(LeagueError::Forbidden(_))));
        let moved = h
            .service
            .reschedule_event(&who(ANA), event_id, None, Some("2025-13-01"), None)
            .await;
        assert!(matches!(moved, Err(LeagueError::Forbidden(_))));

        let half = h
            .service
            .reschedule_event(&who(ADMIN), event_id, None, Some("2025-03-09"), None)
            .await;
        assert!(matches!(half, Err(LeagueError::Validation(_))));
        let Ok(view) = h
            .service
            .reschedule_event(&who(ADMIN), event_id, None, Some("2025-03-09"), Some("15:00"))
            .await
        else {
            panic!("reschedule failed");
        };
        assert_eq!(view.event.starts_at, start() + Duration::days(7) - Duration::hours(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_overwrites_never_expose_partial_settlements() {
        let h = harness().await;
        let event_id = bahrain(&h).await;
        for (id, podium) in [(ANA, ["VER", "NOR", "PIA"]), (BEN, ["LEC", "HAM", "RUS"])] {
            let Ok(_) = h.service.place_prediction(&who(id), event_id, &picks(podium)).await else {
                panic!("placement failed");
            };
        }
        h.clock.set(start() + Duration::hours(2));
        let Ok(_) = h
            .service
            .enter_result(&who(ADMIN), event_id, &picks(["VER", "NOR", "PIA"]), false)
            .await
        else {
            panic!("first settlement failed");
        };

        let mut tasks = tokio::task::JoinSet::new();
        for round in 0..16 {
            let service = h.service.clone();
            let podium = if round % 2 == 0 {
                ["LEC", "HAM", "RUS"]
            } else {
                ["VER", "NOR", "PIA"]
            };
            tasks.spawn(async move {
                service
                    .enter_result(&who(ADMIN), event_id, &picks(podium), true)
                    .await
                    .map(|_| Vec::new())
            });
        }
        for _ in 0..4 {
            let service = h.service.clone();
            tasks.spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    let board = service.leaderboard(None).await?;
                    let total = |id: i64| {
                        board
                            .iter()
                            .find(|row| row.participant_id == ParticipantId::new(id))
                            .map_or(0, |row| row.total_points)
                    };
                    seen.push((total(ANA), total(BEN)));
                    tokio::task::yield_now().await;
                }
                Ok::<_, LeagueError>(seen)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok(Ok(seen)) = joined else {
                panic!("concurrent task failed");
            };
            for (ana, ben) in seen {
                assert!(
                    (ana, ben) == (9, 0) || (ana, ben) == (0, 9),
                    "partial settlement observed: ana={ana} ben={ben}"
                );
            }
        }

        let Ok(report) = h.service.verify_totals(&who(ADMIN)).await else {
            panic!("verification failed");
        };
        assert!(report.consistent);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn different_events_settle_in_parallel() {
        let h = harness().await;
        let bahrain_id = bahrain(&h).await;
        let Ok(saudi) = h
            .service
            .create_event(&who(ADMIN), "Saudi GP", start() + Duration::hours(1))
            .await
        else {
            panic!("event creation failed");
        };
        let saudi_id = saudi.event.id;
        for event_id in [bahrain_id, saudi_id] {
            for (id, podium) in [(ANA, ["VER", "NOR", "PIA"]), (BEN, ["VER", "PIA", "NOR"])] {
                let Ok(_) = h.service.place_prediction(&who(id), event_id, &picks(podium)).await
                else {
                    panic!("placement failed");
                };
            }
        }
        h.clock.set(start() + Duration::hours(4));

        let first = h.service.clone();
        let second = h.service.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                first
                    .enter_result(&who(ADMIN), bahrain_id, &picks(["VER", "NOR", "PIA"]), false)
                    .await
            }),
            tokio::spawn(async move {
                second
                    .enter_result(&who(ADMIN), saudi_id, &picks(["VER", "NOR", "PIA"]), false)
                    .await
            }),
        );
        assert!(matches!(a, Ok(Ok(_))));
        assert!(matches!(b, Ok(Ok(_))));

        let Ok(board) = h.service.leaderboard(None).await else {
            panic!("leaderboard failed");
        };
        let totals: Vec<(i64, u32)> = board
            .iter()
            .filter(|row| row.total_points > 0)
            .map(|row| (row.participant_id.get(), row.total_points))
            .collect();
        assert_eq!(totals, vec![(ANA, 18), (BEN, 10)]);
        let Ok(report) = h.service.verify_totals(&who(ADMIN)).await else {
            panic!("verification failed");
        };
        assert!(report.consistent);
    }
}
