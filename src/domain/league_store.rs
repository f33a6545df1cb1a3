//! In-memory league state with per-event fine-grained locking.
//!
//! [`LeagueStore`] keeps every event in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::RwLock`]. Status reads,
//! prediction writes and result settlement for one event are serialized on
//! that lock while different events proceed concurrently.
//!
//! # Lock order
//!
//! Event entry first, then the ledger. Participant and competitor maps are
//! never held while an event entry lock is being acquired.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard};

use super::aggregation::{Ledger, ScoreRecord};
use super::{
    Competitor, CompetitorCode, Event, EventId, EventResult, Participant, ParticipantId,
    Prediction,
};
use crate::error::LeagueError;

/// One event together with everything bound to it.
#[derive(Debug, Clone)]
pub struct EventEntry {
    /// The event itself.
    pub event: Event,
    /// Predictions keyed by participant; at most one each.
    pub predictions: BTreeMap<ParticipantId, Prediction>,
    /// Official result, once entered.
    pub result: Option<EventResult>,
}

impl EventEntry {
    /// Wraps a freshly created event.
    #[must_use]
    pub const fn new(event: Event) -> Self {
        Self {
            event,
            predictions: BTreeMap::new(),
            result: None,
        }
    }
}

/// Everything loaded from durable storage at startup.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    /// Known participants.
    pub participants: Vec<Participant>,
    /// Competitor roster.
    pub competitors: Vec<Competitor>,
    /// Events with their predictions and results.
    pub events: Vec<EventEntry>,
    /// Persisted score records.
    pub score_records: Vec<ScoreRecord>,
}

/// Central store for league state.
///
/// # Concurrency
///
/// - Multiple tasks may read the same event concurrently.
/// - Writes to different events are concurrent.
/// - Writes to the same event are serialized.
/// - The [`Ledger`] sits behind a single lock so readers never observe a
///   partially applied settlement.
#[derive(Debug, Default)]
pub struct LeagueStore {
    events: RwLock<HashMap<EventId, Arc<RwLock<EventEntry>>>>,
    participants: RwLock<BTreeMap<ParticipantId, Participant>>,
    competitors: RwLock<BTreeMap<CompetitorCode, Competitor>>,
    ledger: RwLock<Ledger>,
}

impl LeagueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a storage snapshot. Totals are derived from the
    /// loaded score records.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let events = snapshot
            .events
            .into_iter()
            .map(|entry| (entry.event.id, Arc::new(RwLock::new(entry))))
            .collect();
        let participants = snapshot
            .participants
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let competitors = snapshot
            .competitors
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect();
        Self {
            events: RwLock::new(events),
            participants: RwLock::new(participants),
            competitors: RwLock::new(competitors),
            ledger: RwLock::new(Ledger::from_records(snapshot.score_records)),
        }
    }

    /// Inserts a new event entry.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Internal`] if an event with the same ID
    /// already exists (should never happen with UUID v4).
    pub async fn insert_event(&self, entry: EventEntry) -> Result<EventId, LeagueError> {
        let event_id = entry.event.id;
        let mut map = self.events.write().await;
        if map.contains_key(&event_id) {
            return Err(LeagueError::Internal(format!(
                "event {event_id} already exists"
            )));
        }
        map.insert(event_id, Arc::new(RwLock::new(entry)));
        Ok(event_id)
    }

    /// Returns the event entry behind its per-event lock. Soft-deleted
    /// events are returned too; callers decide how to treat them.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::EventNotFound`] if no event with the given ID
    /// exists.
    pub async fn event(&self, event_id: EventId) -> Result<Arc<RwLock<EventEntry>>, LeagueError> {
        let map = self.events.read().await;
        map.get(&event_id)
            .cloned()
            .ok_or(LeagueError::EventNotFound(event_id))
    }

    /// Handles to every event. The outer map lock is released before
    /// returning, so callers may lock entries one at a time.
    pub async fn event_handles(&self) -> Vec<Arc<RwLock<EventEntry>>> {
        self.events.read().await.values().cloned().collect()
    }

    /// Number of events, including soft-deleted ones.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Looks up a participant.
    pub async fn participant(&self, participant_id: ParticipantId) -> Option<Participant> {
        self.participants.read().await.get(&participant_id).cloned()
    }

    /// All participants ordered by id.
    pub async fn list_participants(&self) -> Vec<Participant> {
        self.participants.read().await.values().cloned().collect()
    }

    /// Write access to the participant map for read-modify-write updates.
    pub async fn participants_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<ParticipantId, Participant>> {
        self.participants.write().await
    }

    /// Looks up a competitor.
    pub async fn competitor(&self, code: &CompetitorCode) -> Option<Competitor> {
        self.competitors.read().await.get(code).cloned()
    }

    /// Competitors ordered by code, optionally including inactive ones.
    pub async fn list_competitors(&self, include_inactive: bool) -> Vec<Competitor> {
        self.competitors
            .read()
            .await
            .values()
            .filter(|c| include_inactive || c.is_active)
            .cloned()
            .collect()
    }

    /// Returns the first code in `codes` that is not in the roster.
    pub async fn first_unknown_competitor<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a CompetitorCode>,
    ) -> Option<CompetitorCode> {
        let roster = self.competitors.read().await;
        codes
            .into_iter()
            .find(|code| !roster.contains_key(*code))
            .cloned()
    }

    /// Write access to the roster for read-modify-write updates.
    pub async fn competitors_mut(
        &self,
    ) -> RwLockWriteGuard<'_, BTreeMap<CompetitorCode, Competitor>> {
        self.competitors.write().await
    }

    /// The score ledger. Acquire it only after any event entry lock.
    #[must_use]
    pub const fn ledger(&self) -> &RwLock<Ledger> {
        &self.ledger
    }
}
