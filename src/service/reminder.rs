//! Pre-event reminder scheduler.
//!
//! A background loop scans events on a fixed interval. Each event gets at
//! most one reminder: the `reminder_sent` flag is written once the batch
//! reached somebody, or once every recipient kept failing for
//! `reminder_max_attempts` scans. The same loop records automatic betting
//! closes that are due.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;

use super::LeagueService;
use super::notifier::{Button, Notifier};
use super::views::ReminderCandidate;
use crate::domain::{EventId, LeagueEvent};

/// Outcome of recording a fully failed reminder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Try again on the next scan.
    Retry {
        /// Failed scans so far.
        attempt: u32,
    },
    /// Give up and record the reminder as sent.
    Exhausted {
        /// Failed scans in total.
        attempts: u32,
    },
}

/// Counts fully failed reminder batches per event.
///
/// Held in memory only; after a restart an event gets a fresh budget.
#[derive(Debug, Default)]
pub struct ReminderAttempts {
    failures: HashMap<EventId, u32>,
    max_attempts: u32,
}

impl ReminderAttempts {
    /// Creates a tracker that gives up after `max_attempts` failures.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            failures: HashMap::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Records a failed batch for `event_id`.
    pub fn record_failure(&mut self, event_id: EventId) -> AttemptDecision {
        let attempt = self.failures.entry(event_id).or_insert(0);
        *attempt += 1;
        let attempts = *attempt;
        if attempts < self.max_attempts {
            AttemptDecision::Retry { attempt: attempts }
        } else {
            self.failures.remove(&event_id);
            AttemptDecision::Exhausted { attempts }
        }
    }

    /// Forgets the failures of `event_id`.
    pub fn clear(&mut self, event_id: EventId) {
        self.failures.remove(&event_id);
    }

    /// Failed batches recorded for `event_id`.
    #[must_use]
    pub fn attempts(&self, event_id: EventId) -> u32 {
        self.failures.get(&event_id).copied().unwrap_or(0)
    }
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Events whose reminder was recorded as sent.
    pub reminded: Vec<EventId>,
    /// Events whose batch failed and will be retried.
    pub retrying: Vec<EventId>,
    /// Events given up after too many failed batches.
    pub given_up: Vec<EventId>,
    /// Events whose automatic close was recorded.
    pub closed: Vec<EventId>,
}

/// Sends pre-event reminders and records automatic closes.
#[derive(Debug)]
pub struct ReminderScheduler {
    service: Arc<LeagueService>,
    notifier: Arc<dyn Notifier>,
    attempts: Mutex<ReminderAttempts>,
}

impl ReminderScheduler {
    /// Creates a scheduler using the service's reminder settings.
    #[must_use]
    pub fn new(service: Arc<LeagueService>, notifier: Arc<dyn Notifier>) -> Self {
        let max_attempts = service.config().reminder_max_attempts;
        Self {
            service,
            notifier,
            attempts: Mutex::new(ReminderAttempts::new(max_attempts)),
        }
    }

    /// Runs scans until `shutdown` turns `true` or its sender is dropped.
    ///
    /// A scan in progress always completes before the loop exits.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let config = self.service.config();
        let scan_interval = Duration::from_secs(config.reminder_scan_interval_secs.max(1));
        tracing::info!(
            scan_interval_secs = scan_interval.as_secs(),
            lead_hours = config.reminder_lead_hours,
            max_attempts = config.reminder_max_attempts,
            "reminder scheduler started"
        );

        let mut interval = tokio::time::interval(scan_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let report = self.scan_once().await;
                    if report != ScanReport::default() {
                        tracing::debug!(
                            reminded = report.reminded.len(),
                            retrying = report.retrying.len(),
                            given_up = report.given_up.len(),
                            closed = report.closed.len(),
                            "reminder scan finished"
                        );
                    }
                }
            }
        }
        tracing::info!("reminder scheduler stopped");
    }

    /// Performs one scan: reminds every due event, then records due closes.
    pub async fn scan_once(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let lead = self.service.config().reminder_lead();

        for candidate in self.service.reminder_candidates(lead).await {
            let event_id = candidate.event_id;
            let (delivered, failed) = self.deliver(&candidate).await;

            let give_up = if delivered > 0 || failed == 0 {
                self.attempts.lock().await.clear(event_id);
                false
            } else {
                match self.attempts.lock().await.record_failure(event_id) {
                    AttemptDecision::Retry { attempt } => {
                        tracing::warn!(%event_id, attempt, failed, "reminder reached nobody, retrying next scan");
                        report.retrying.push(event_id);
                        continue;
                    }
                    AttemptDecision::Exhausted { attempts } => {
                        tracing::error!(%event_id, attempts, "reminder reached nobody, giving up");
                        true
                    }
                }
            };

            match self.service.mark_reminder_sent(event_id).await {
                Ok(true) => {
                    let _ = self.service.event_bus().publish(LeagueEvent::ReminderSent {
                        event_id,
                        delivered,
                        failed,
                        timestamp: self.service.now(),
                    });
                    tracing::info!(%event_id, delivered, failed, "reminder recorded as sent");
                    if give_up {
                        report.given_up.push(event_id);
                    } else {
                        report.reminded.push(event_id);
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(%event_id, error = %e, "failed to record reminder flag");
                }
            }
        }

        report.closed = self.service.close_due_events().await;
        report
    }

    async fn deliver(&self, candidate: &ReminderCandidate) -> (usize, usize) {
        let recipients = self.service.reminder_recipients().await;
        let message = self.reminder_text(candidate);
        let buttons = [Button::new(
            "Place prediction",
            format!("predict:{}", candidate.event_id),
        )];

        let mut delivered = 0;
        let mut failed = 0;
        for recipient in &recipients {
            match self.notifier.send(recipient, &message, &buttons).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        event_id = %candidate.event_id,
                        %recipient,
                        error = %e,
                        "reminder delivery failed"
                    );
                }
            }
        }
        (delivered, failed)
    }

    fn reminder_text(&self, candidate: &ReminderCandidate) -> String {
        let config = self.service.config();
        format!(
            "⏰ {} starts at {} (UTC{}).\nBetting closes at {}. Place your podium prediction!",
            candidate.name,
            self.service.format_local(candidate.starts_at),
            config.timezone,
            self.service.format_local(candidate.closes_at),
        )
    }
}
