//! Podiums, predictions and official results.
//!
//! A [`Podium`] is the shared shape of a prediction and a result: three
//! pairwise distinct competitor codes for positions 1, 2 and 3. The
//! distinctness invariant is enforced at construction, so every `Podium` in
//! the system is well formed unless it was built from untrusted storage rows
//! (see [`Podium::is_well_formed`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CompetitorCode, EventId, ParticipantId};
use crate::error::LeagueError;

/// Number of podium positions.
pub const PODIUM_SIZE: usize = 3;

/// Three distinct competitors in finishing order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Podium([CompetitorCode; PODIUM_SIZE]);

impl Podium {
    /// Builds a podium from three codes.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::DuplicatePick`] when a competitor appears in
    /// more than one position.
    pub fn new(
        first: CompetitorCode,
        second: CompetitorCode,
        third: CompetitorCode,
    ) -> Result<Self, LeagueError> {
        if first == second || first == third {
            return Err(LeagueError::DuplicatePick(first));
        }
        if second == third {
            return Err(LeagueError::DuplicatePick(second));
        }
        Ok(Self([first, second, third]))
    }

    /// Parses a podium from raw codes as received from callers.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::Validation`] unless exactly three codes are
    /// given, [`LeagueError::InvalidCompetitor`] for malformed codes and
    /// [`LeagueError::DuplicatePick`] for repeated competitors.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, LeagueError> {
        let [first, second, third] = raw else {
            return Err(LeagueError::Validation(format!(
                "exactly {PODIUM_SIZE} picks are required, got {}",
                raw.len()
            )));
        };
        Self::new(
            CompetitorCode::parse(first.as_ref())?,
            CompetitorCode::parse(second.as_ref())?,
            CompetitorCode::parse(third.as_ref())?,
        )
    }

    /// Rebuilds a podium from storage without re-validating distinctness.
    ///
    /// Used only when loading persisted rows; settlement re-checks
    /// [`Podium::is_well_formed`] before scoring.
    #[must_use]
    pub const fn from_stored(picks: [CompetitorCode; PODIUM_SIZE]) -> Self {
        Self(picks)
    }

    /// Picks in finishing order.
    #[must_use]
    pub const fn picks(&self) -> &[CompetitorCode; PODIUM_SIZE] {
        &self.0
    }

    /// Returns `true` if the competitor is anywhere on the podium.
    #[must_use]
    pub fn contains(&self, code: &CompetitorCode) -> bool {
        self.0.contains(code)
    }

    /// Returns `true` if all three picks are pairwise distinct.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let [a, b, c] = &self.0;
        a != b && a != c && b != c
    }

    /// Picks as owned strings in finishing order.
    #[must_use]
    pub fn to_codes(&self) -> Vec<String> {
        self.0.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl TryFrom<Vec<String>> for Podium {
    type Error = LeagueError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Podium> for Vec<String> {
    fn from(podium: Podium) -> Self {
        podium.to_codes()
    }
}

/// One participant's prediction for one event. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    /// Owner of the prediction.
    pub participant_id: ParticipantId,
    /// Event the prediction is for.
    pub event_id: EventId,
    /// Predicted podium.
    pub podium: Podium,
    /// First placement instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

/// Official result of an event. At most one per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResult {
    /// Event the result belongs to.
    pub event_id: EventId,
    /// Official podium.
    pub podium: Podium,
    /// Instant the result was (last) saved.
    pub saved_at: DateTime<Utc>,
}
