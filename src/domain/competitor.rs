//! Competitors (drivers) that can be picked in predictions and results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LeagueError;

/// Short unique competitor code such as `VER` or `LEC`.
///
/// Always upper-case ASCII alphanumerics, 2 to 10 characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompetitorCode(String);

impl CompetitorCode {
    /// Parses and normalises a competitor code.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::InvalidCompetitor`] when the code is empty, too
    /// long, or contains characters other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, LeagueError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid_len = (2..=10).contains(&code.len());
        if !valid_len || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LeagueError::InvalidCompetitor(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompetitorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CompetitorCode {
    type Error = LeagueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CompetitorCode> for String {
    fn from(code: CompetitorCode) -> Self {
        code.0
    }
}

/// A competitor in the roster. Never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Competitor {
    /// Unique code.
    pub code: CompetitorCode,
    /// Display name.
    pub full_name: String,
    /// Whether the competitor is on the current grid.
    pub is_active: bool,
    /// When the competitor was added to the roster.
    pub created_at: DateTime<Utc>,
}

/// The grid the roster is seeded with on first start.
const SEASON_ROSTER: [(&str, &str); 20] = [
    ("VER", "Max Verstappen"),
    ("LAW", "Liam Lawson"),
    ("LEC", "Charles Leclerc"),
    ("HAM", "Lewis Hamilton"),
    ("RUS", "George Russell"),
    ("ANT", "Andrea Kimi Antonelli"),
    ("NOR", "Lando Norris"),
    ("PIA", "Oscar Piastri"),
    ("ALO", "Fernando Alonso"),
    ("STR", "Lance Stroll"),
    ("GAS", "Pierre Gasly"),
    ("DOO", "Jack Doohan"),
    ("ALB", "Alex Albon"),
    ("SAI", "Carlos Sainz Jr."),
    ("OCO", "Esteban Ocon"),
    ("BEA", "Oliver Bearman"),
    ("TSU", "Yuki Tsunoda"),
    ("HAD", "Isack Hadjar"),
    ("HUL", "Nico Hülkenberg"),
    ("BOR", "Gabriel Bortoleto"),
];

/// Builds the default active roster.
#[must_use]
pub fn seed_roster(now: DateTime<Utc>) -> Vec<Competitor> {
    SEASON_ROSTER
        .iter()
        .filter_map(|(code, name)| {
            CompetitorCode::parse(code).ok().map(|code| Competitor {
                code,
                full_name: (*name).to_string(),
                is_active: true,
                created_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalises_case_and_whitespace() {
        let Ok(code) = CompetitorCode::parse(" ver ") else {
            panic!("expected valid code");
        };
        assert_eq!(code.as_str(), "VER");
    }

    #[test]
    fn parse_rejects_bad_codes() {
        assert!(CompetitorCode::parse("").is_err());
        assert!(CompetitorCode::parse("V").is_err());
        assert!(CompetitorCode::parse("VER-1").is_err());
        assert!(CompetitorCode::parse("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<CompetitorCode, _> = serde_json::from_str("\"nor\"");
        assert!(matches!(ok, Ok(ref c) if c.as_str() == "NOR"));
        let bad: Result<CompetitorCode, _> = serde_json::from_str("\"no r\"");
        assert!(bad.is_err());
    }

    #[test]
    fn roster_has_twenty_unique_active_drivers() {
        let roster = seed_roster(Utc::now());
        assert_eq!(roster.len(), 20);
        let mut codes: Vec<_> = roster.iter().map(|c| c.code.clone()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 20);
        assert!(roster.iter().all(|c| c.is_active));
    }
}
