//! Audit trail of league changes.
//!
//! Subscribes to the [`crate::domain::EventBus`] and writes one structured
//! log line per [`LeagueEvent`]. Reopens, deletions and overwritten results
//! are logged at `warn` so they stand out.

use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::domain::LeagueEvent;

/// Log target used for audit lines.
pub const AUDIT_TARGET: &str = "podium_gateway::audit";

/// Background task recording every league change.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditTrail;

impl AuditTrail {
    /// Creates an audit trail.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Records bus events until shutdown or until the bus closes. Returns
    /// the number of entries written.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<LeagueEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut recorded = 0;
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        self.record(&event);
                        recorded += 1;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: AUDIT_TARGET, skipped, "audit trail lost events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(recorded, "audit trail stopped");
        recorded
    }

    /// Writes one audit line and returns the entry that was logged.
    pub fn record(&self, event: &LeagueEvent) -> Value {
        let entry = match serde_json::to_value(event) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(target: AUDIT_TARGET, error = %e, "audit entry could not be serialized");
                return Value::Null;
            }
        };
        let kind = entry
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let event_id = event.event_id();

        match event {
            LeagueEvent::BettingReopened { .. }
            | LeagueEvent::EventDeleted { .. }
            | LeagueEvent::ResultSettled {
                overwrite: true, ..
            } => {
                tracing::warn!(target: AUDIT_TARGET, %event_id, kind, %entry, "league change");
            }
            _ => {
                tracing::info!(target: AUDIT_TARGET, %event_id, kind, %entry, "league change");
            }
        }
        entry
    }
}
