//! Betting window state machine.
//!
//! ```text
//!              Close (auto at start - offset, or admin)
//!   Scheduled ─────────────────────────────────────────▶ BettingClosed
//!       ▲                                                  │      │
//!       └───────────── Reopen (admin, logged) ─────────────┘      │ Resolve
//!                                                                  ▼
//!                                               Resulted ◀── Amend (confirmed overwrite)
//! ```
//!
//! The automatic close is never stored eagerly: [`BettingWindow::effective_status`]
//! derives it from the stored status and the clock, so stored state and wall
//! time cannot drift apart. The reminder scheduler persists due closures when
//! it sweeps, which only makes the stored status catch up with the derived one.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use super::{Event, EventStatus};
use crate::error::LeagueError;

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Close betting (automatic or admin).
    Close,
    /// Reopen betting after a close (admin only).
    Reopen,
    /// Enter the first result.
    Resolve,
    /// Replace an existing result after explicit confirmation.
    Amend,
}

impl EventStatus {
    /// Applies `transition`, returning the next stored status.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::StateConflict`] carrying `self` when the
    /// transition is not legal.
    pub fn apply(self, transition: Transition) -> Result<Self, LeagueError> {
        use EventStatus::{BettingClosed, Resulted, Scheduled};

        let from = self;
        match (from, transition) {
            (Scheduled, Transition::Close) => Ok(BettingClosed),
            (BettingClosed, Transition::Reopen) => Ok(Scheduled),
            (BettingClosed, Transition::Resolve) | (Resulted, Transition::Amend) => Ok(Resulted),
            (Scheduled, Transition::Resolve | Transition::Amend) => Err(conflict(
                from,
                "Betting is still open. Close betting before entering the result.",
            )),
            (Resulted, Transition::Resolve) => Err(conflict(
                from,
                "A result is already entered. Confirm the overwrite to replace it.",
            )),
            (BettingClosed, Transition::Close) => {
                Err(conflict(from, "Betting is already closed for this event."))
            }
            (Scheduled, Transition::Reopen) => {
                Err(conflict(from, "Betting is already open for this event."))
            }
            (BettingClosed, Transition::Amend) => Err(conflict(
                from,
                "There is no result to overwrite yet. Enter the result instead.",
            )),
            (Resulted, Transition::Close | Transition::Reopen) => Err(conflict(
                from,
                "The event already has a result; its betting window can no longer change.",
            )),
        }
    }
}

fn conflict(status: EventStatus, message: &str) -> LeagueError {
    LeagueError::StateConflict {
        message: message.to_string(),
        status,
    }
}

/// Betting window rules for a configured closing offset.
#[derive(Debug, Clone, Copy)]
pub struct BettingWindow {
    closing_offset: Duration,
    timezone: FixedOffset,
}

impl BettingWindow {
    /// Creates a window that closes `closing_offset` before each event start.
    /// Close instants reported to callers are expressed in `timezone`.
    #[must_use]
    pub const fn new(closing_offset: Duration, timezone: FixedOffset) -> Self {
        Self {
            closing_offset,
            timezone,
        }
    }

    /// The configured closing offset.
    #[must_use]
    pub const fn closing_offset(&self) -> Duration {
        self.closing_offset
    }

    /// Instant at which betting closes for `event`. Saturates at the
    /// earliest representable instant.
    #[must_use]
    pub fn closes_at(&self, event: &Event) -> DateTime<Utc> {
        event
            .starts_at
            .checked_sub_signed(self.closing_offset)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Status derived from the stored status and the clock.
    #[must_use]
    pub fn effective_status(&self, event: &Event, now: DateTime<Utc>) -> EventStatus {
        match event.status {
            EventStatus::Scheduled if now >= self.closes_at(event) => EventStatus::BettingClosed,
            status => status,
        }
    }

    /// Returns `true` iff predictions for `event` may be written at `now`.
    #[must_use]
    pub fn can_mutate_prediction(&self, event: &Event, now: DateTime<Utc>) -> bool {
        self.effective_status(event, now) == EventStatus::Scheduled
    }

    /// Returns `true` when the stored status lags behind an automatic close.
    #[must_use]
    pub fn close_is_due(&self, event: &Event, now: DateTime<Utc>) -> bool {
        event.status == EventStatus::Scheduled
            && self.effective_status(event, now) == EventStatus::BettingClosed
    }

    /// Guards a prediction write.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::BettingClosed`] outside the betting window.
    pub fn ensure_open(&self, event: &Event, now: DateTime<Utc>) -> Result<(), LeagueError> {
        if self.can_mutate_prediction(event, now) {
            Ok(())
        } else {
            Err(LeagueError::BettingClosed {
                event_id: event.id,
                status: self.effective_status(event, now),
                closes_at: self.closes_at(event).with_timezone(&self.timezone),
            })
        }
    }

    /// Validates `transition` against the effective status at `now` and
    /// returns the status to store.
    ///
    /// A reopen is refused when the window would close again immediately;
    /// the start time has to move first.
    ///
    /// # Errors
    ///
    /// Returns [`LeagueError::StateConflict`] when the transition is illegal.
    pub fn transition(
        &self,
        event: &Event,
        now: DateTime<Utc>,
        transition: Transition,
    ) -> Result<EventStatus, LeagueError> {
        let current = self.effective_status(event, now);
        let next = current.apply(transition)?;
        if transition == Transition::Reopen && now >= self.closes_at(event) {
            return Err(conflict(
                current,
                "The betting window for this start time has passed. Move the start time before reopening.",
            ));
        }
        Ok(next)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn window() -> BettingWindow {
        let Some(tz) = FixedOffset::east_opt(3 * 3600) else {
            panic!("valid offset");
        };
        BettingWindow::new(Duration::minutes(10), tz)
    }

    fn bahrain(starts_at: DateTime<Utc>) -> Event {
        Event::new("Bahrain GP".to_string(), starts_at, starts_at - Duration::days(30))
    }

    fn start() -> DateTime<Utc> {
        let Some(start) = DateTime::from_timestamp(1_740_931_200, 0) else {
            panic!("valid timestamp");
        };
        start
    }

    #[test]
    fn open_strictly_before_close_instant() {
        let event = bahrain(start());
        let w = window();
        assert!(w.can_mutate_prediction(&event, start() - Duration::minutes(20)));
        assert!(w.can_mutate_prediction(&event, start() - Duration::minutes(10) - Duration::seconds(1)));
        assert!(!w.can_mutate_prediction(&event, start() - Duration::minutes(10)));
        assert!(!w.can_mutate_prediction(&event, start() - Duration::minutes(5)));
    }

    #[test]
    fn lazy_close_is_reported_without_stored_change() {
        let event = bahrain(start());
        let w = window();
        let now = start() - Duration::minutes(5);
        assert_eq!(event.status, EventStatus::Scheduled);
        assert_eq!(w.effective_status(&event, now), EventStatus::BettingClosed);
        assert!(w.close_is_due(&event, now));
    }

    #[test]
    fn ensure_open_reports_close_instant() {
        let event = bahrain(start());
        let Err(LeagueError::BettingClosed { closes_at, status, .. }) =
            window().ensure_open(&event, start())
        else {
            panic!("expected betting closed");
        };
        assert_eq!(closes_at, start() - Duration::minutes(10));
        assert_eq!(closes_at.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(status, EventStatus::BettingClosed);
    }

    #[test]
    fn resolve_requires_closed_betting() {
        let event = bahrain(start());
        let w = window();
        let early = start() - Duration::hours(1);
        assert!(matches!(
            w.transition(&event, early, Transition::Resolve),
            Err(LeagueError::StateConflict { status: EventStatus::Scheduled, .. })
        ));
        // Lazily closed events may be resolved directly.
        let later = start() + Duration::hours(2);
        assert!(matches!(
            w.transition(&event, later, Transition::Resolve),
            Ok(EventStatus::Resulted)
        ));
    }

    #[test]
    fn resulted_is_terminal_except_amend() {
        for t in [Transition::Close, Transition::Reopen, Transition::Resolve] {
            assert!(EventStatus::Resulted.apply(t).is_err(), "{t:?}");
        }
        assert!(matches!(
            EventStatus::Resulted.apply(Transition::Amend),
            Ok(EventStatus::Resulted)
        ));
    }

    #[test]
    fn reopen_only_from_closed_and_only_before_close_instant() {
        let mut event = bahrain(start());
        let w = window();
        let early = start() - Duration::hours(3);
        assert!(w.transition(&event, early, Transition::Reopen).is_err());

        event.status = EventStatus::BettingClosed;
        assert!(matches!(
            w.transition(&event, early, Transition::Reopen),
            Ok(EventStatus::Scheduled)
        ));
        let late = start() - Duration::minutes(1);
        assert!(w.transition(&event, late, Transition::Reopen).is_err());
    }

    #[test]
    fn admin_close_from_open_window() {
        let event = bahrain(start());
        let w = window();
        let early = start() - Duration::hours(3);
        assert!(matches!(
            w.transition(&event, early, Transition::Close),
            Ok(EventStatus::BettingClosed)
        ));
        assert!(w.transition(&event, start(), Transition::Close).is_err());
    }

    #[test]
    fn close_instant_saturates_for_earliest_start() {
        let event = Event::new("Ancient GP".to_string(), DateTime::<Utc>::MIN_UTC, start());
        let w = window();
        assert_eq!(w.closes_at(&event), DateTime::<Utc>::MIN_UTC);
        assert_eq!(w.effective_status(&event, start()), EventStatus::BettingClosed);
    }
}
