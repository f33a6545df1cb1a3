//! Relays prediction activity to the rest of the league.
//!
//! Subscribes to the [`crate::domain::EventBus`] and, for every placed or
//! changed prediction, tells the other allowed participants what was
//! picked.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use super::LeagueService;
use super::notifier::Notifier;
use crate::domain::{LeagueEvent, Podium};

/// Background task announcing predictions.
#[derive(Debug)]
pub struct PredictionAnnouncer {
    service: Arc<LeagueService>,
    notifier: Arc<dyn Notifier>,
}

impl PredictionAnnouncer {
    /// Creates an announcer.
    #[must_use]
    pub const fn new(service: Arc<LeagueService>, notifier: Arc<dyn Notifier>) -> Self {
        Self { service, notifier }
    }

    /// Consumes bus events until shutdown or until the bus closes.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<LeagueEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        self.handle(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "announcer lagged behind the event bus");
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
        tracing::debug!("prediction announcer stopped");
    }

    /// Announces one event; returns the number of successful deliveries.
    pub async fn handle(&self, event: &LeagueEvent) -> usize {
        let LeagueEvent::PredictionPlaced {
            event_name,
            starts_at,
            podium,
            participant_id,
            display_name,
            is_update,
            ..
        } = event
        else {
            return 0;
        };

        let recipients = self.service.announcement_recipients(*participant_id).await;
        if recipients.is_empty() {
            return 0;
        }
        let podium_lines = self.podium_lines(podium).await;
        let action = if *is_update {
            "updated their prediction"
        } else {
            "placed a prediction"
        };
        let message = format!(
            "🎯 {display_name} {action}!\n\n🏁 {event_name}\n📅 {}\n\n{podium_lines}",
            self.service.format_local(*starts_at),
        );

        let mut delivered = 0;
        for recipient in &recipients {
            match self.notifier.send(recipient, &message, &[]).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(%recipient, error = %e, "announcement delivery failed");
                }
            }
        }
        tracing::info!(
            participant_id = %participant_id,
            delivered,
            recipients = recipients.len(),
            "prediction announced"
        );
        delivered
    }

    async fn podium_lines(&self, podium: &Podium) -> String {
        let mut lines = Vec::with_capacity(podium.picks().len());
        for (medal, code) in ["🥇", "🥈", "🥉"].iter().zip(podium.picks()) {
            let line = match self.service.store().competitor(code).await {
                Some(competitor) => format!("{medal} {code} - {}", competitor.full_name),
                None => format!("{medal} {code}"),
            };
            lines.push(line);
        }
        lines.join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::config::LeagueConfig;
    use crate::domain::{Clock, EventBus, Identity, LeagueStore, ManualClock, ParticipantId};
    use crate::service::notifier::{Recipient, RecordingNotifier};

    #[tokio::test]
    async fn other_allowed_participants_hear_about_predictions() {
        let Some(start) = DateTime::from_timestamp(1_740_931_200, 0) else {
            panic!("valid timestamp");
        };
        let clock = Arc::new(ManualClock::new(start - Duration::days(1)));
        let config = LeagueConfig {
            persistence_enabled: false,
            admin_ids: [ParticipantId::new(1)].into_iter().collect(),
            auto_approve_participants: true,
            ..LeagueConfig::default()
        };
        let service = Arc::new(LeagueService::new(
            Arc::new(LeagueStore::new()),
            EventBus::new(16),
            None,
            clock as Arc<dyn Clock>,
            config,
        ));
        let Ok(_) = service.seed_roster_if_empty().await else {
            panic!("seeding failed");
        };
        let admin = Identity::new(ParticipantId::new(1), Some("Admin".to_string()));
        let ana = Identity::new(ParticipantId::new(10), Some("Ana".to_string()));
        let Ok(view) = service.create_event(&admin, "Bahrain GP", start).await else {
            panic!("event creation failed");
        };

        let mut rx = service.event_bus().subscribe();
        let picks: Vec<String> = ["VER", "NOR", "PIA"].iter().map(|c| (*c).to_string()).collect();
        let Ok(_) = service.place_prediction(&ana, view.event.id, &picks).await else {
            panic!("placement failed");
        };
        let Ok(event) = rx.recv().await else {
            panic!("no bus event");
        };

        let notifier = Arc::new(RecordingNotifier::new());
        let announcer = PredictionAnnouncer::new(
            Arc::clone(&service),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        assert_eq!(announcer.handle(&event).await, 1);

        let to_admin = notifier.sent_to(&Recipient::Participant(ParticipantId::new(1)));
        let Some(message) = to_admin.first() else {
            panic!("admin was not notified");
        };
        assert!(message.message.contains("Ana placed a prediction"));
        assert!(message.message.contains("🥇 VER - Max Verstappen"));
        assert!(notifier.sent_to(&Recipient::Participant(ParticipantId::new(10))).is_empty());
    }
}
