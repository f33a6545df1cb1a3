//! Settlement and the score ledger.
//!
//! [`settle_event`] turns a resulted event into per-participant
//! [`ScoreRecord`]s. [`Ledger`] holds every record together with the running
//! totals derived from them. Totals are maintained incrementally by
//! [`Ledger::replace_event_scores`] and can always be rebuilt from scratch
//! with [`Ledger::recompute_totals`]; the two paths must agree.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::league_store::EventEntry;
use super::{EventId, EventStatus, ParticipantId, scoring};
use crate::error::LeagueError;

/// Points a participant earned for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    /// Scored participant.
    pub participant_id: ParticipantId,
    /// Scored event.
    pub event_id: EventId,
    /// Points in `0..=9`.
    pub points: u8,
}

/// A participant whose stored total disagrees with the sum of their records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalMismatch {
    /// Affected participant.
    pub participant_id: ParticipantId,
    /// Total currently held by the ledger.
    pub stored: u32,
    /// Total obtained by summing score records.
    pub recomputed: u32,
}

/// Scores every prediction of a resulted event.
///
/// # Errors
///
/// Returns [`LeagueError::ScoringFailure`] when the event is not resulted,
/// has no result, or its result podium is malformed.
pub fn settle_event(entry: &EventEntry) -> Result<Vec<ScoreRecord>, LeagueError> {
    let event_id = entry.event.id;
    if entry.event.status != EventStatus::Resulted {
        return Err(LeagueError::ScoringFailure(format!(
            "event {event_id} is {}, not resulted",
            entry.event.status
        )));
    }
    let Some(result) = entry.result.as_ref() else {
        return Err(LeagueError::ScoringFailure(format!(
            "event {event_id} has no result"
        )));
    };
    if !result.podium.is_well_formed() {
        return Err(LeagueError::ScoringFailure(format!(
            "result for event {event_id} repeats a competitor"
        )));
    }

    Ok(entry
        .predictions
        .values()
        .map(|prediction| ScoreRecord {
            participant_id: prediction.participant_id,
            event_id,
            points: scoring::score(&prediction.podium, &result.podium),
        })
        .collect())
}

/// Score records and the totals derived from them.
///
/// Totals only hold participants with a non-zero sum; [`Ledger::total`]
/// reports zero for everyone else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: HashMap<EventId, BTreeMap<ParticipantId, u8>>,
    totals: BTreeMap<ParticipantId, u32>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from stored records, deriving totals by summation.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = ScoreRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger
                .records
                .entry(record.event_id)
                .or_default()
                .insert(record.participant_id, record.points);
        }
        ledger.totals = ledger.recompute_totals();
        ledger
    }

    /// Replaces every record of `event_id` with `records` and adjusts
    /// totals by the difference.
    ///
    /// Records for other events are ignored.
    pub fn replace_event_scores(&mut self, event_id: EventId, records: &[ScoreRecord]) {
        if let Some(previous) = self.records.remove(&event_id) {
            for (participant_id, points) in previous {
                self.sub_total(participant_id, u32::from(points));
            }
        }

        let mut current = BTreeMap::new();
        for record in records.iter().filter(|r| r.event_id == event_id) {
            if let Some(replaced) = current.insert(record.participant_id, record.points) {
                self.sub_total(record.participant_id, u32::from(replaced));
            }
            self.add_total(record.participant_id, u32::from(record.points));
        }
        if !current.is_empty() {
            self.records.insert(event_id, current);
        }
    }

    fn add_total(&mut self, participant_id: ParticipantId, points: u32) {
        if points > 0 {
            *self.totals.entry(participant_id).or_insert(0) += points;
        }
    }

    fn sub_total(&mut self, participant_id: ParticipantId, points: u32) {
        if let Some(total) = self.totals.get_mut(&participant_id) {
            *total = total.saturating_sub(points);
            if *total == 0 {
                self.totals.remove(&participant_id);
            }
        }
    }

    /// Rebuilds totals from the records alone.
    #[must_use]
    pub fn recompute_totals(&self) -> BTreeMap<ParticipantId, u32> {
        let mut totals = BTreeMap::new();
        for scores in self.records.values() {
            for (participant_id, points) in scores {
                *totals.entry(*participant_id).or_insert(0u32) += u32::from(*points);
            }
        }
        totals.retain(|_, total| *total > 0);
        totals
    }

    /// Running total for a participant.
    #[must_use]
    pub fn total(&self, participant_id: ParticipantId) -> u32 {
        self.totals.get(&participant_id).copied().unwrap_or(0)
    }

    /// All non-zero running totals.
    #[must_use]
    pub const fn totals(&self) -> &BTreeMap<ParticipantId, u32> {
        &self.totals
    }

    /// Points a participant earned for an event, if the event was scored.
    #[must_use]
    pub fn points_for(&self, participant_id: ParticipantId, event_id: EventId) -> Option<u8> {
        self.records
            .get(&event_id)
            .and_then(|scores| scores.get(&participant_id))
            .copied()
    }

    /// Records of one event, highest points first.
    #[must_use]
    pub fn event_scores(&self, event_id: EventId) -> Vec<ScoreRecord> {
        let mut scores: Vec<ScoreRecord> = self
            .records
            .get(&event_id)
            .map(|scores| {
                scores
                    .iter()
                    .map(|(participant_id, points)| ScoreRecord {
                        participant_id: *participant_id,
                        event_id,
                        points: *points,
                    })
                    .collect()
            })
            .unwrap_or_default();
        scores.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.participant_id.cmp(&b.participant_id))
        });
        scores
    }

    /// Number of score records across all events.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Participants whose running total differs from the recomputed one.
    #[must_use]
    pub fn mismatches(&self) -> Vec<TotalMismatch> {
        let recomputed = self.recompute_totals();
        let mut ids: Vec<ParticipantId> =
            self.totals.keys().chain(recomputed.keys()).copied().collect();
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .filter_map(|participant_id| {
                let stored = self.total(participant_id);
                let expected = recomputed.get(&participant_id).copied().unwrap_or(0);
                (stored != expected).then_some(TotalMismatch {
                    participant_id,
                    stored,
                    recomputed: expected,
                })
            })
            .collect()
    }
}
