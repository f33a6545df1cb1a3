//! End-to-end league scenarios driven through the public service API with a
//! manual clock and in-memory state.

#![allow(clippy::panic)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use podium_gateway::config::LeagueConfig;
use podium_gateway::domain::{
    Clock, EventBus, EventId, EventStatus, Identity, LeagueStore, ManualClock, ParticipantId,
};
use podium_gateway::error::LeagueError;
use podium_gateway::service::{
    BulkEventRow, LeagueService, Notifier, Recipient, RecordingNotifier, ReminderScheduler,
};

const ADMIN: i64 = 1;

fn bahrain_start() -> DateTime<Utc> {
    let Some(start) = DateTime::from_timestamp(1_740_931_200, 0) else {
        panic!("valid timestamp");
    };
    start
}

fn league(clock: &Arc<ManualClock>) -> Arc<LeagueService> {
    let config = LeagueConfig {
        persistence_enabled: false,
        bet_closing_offset_minutes: 10,
        reminder_lead_hours: 2,
        admin_ids: [ParticipantId::new(ADMIN)].into_iter().collect(),
        auto_approve_participants: true,
        ..LeagueConfig::default()
    };
    Arc::new(LeagueService::new(
        Arc::new(LeagueStore::new()),
        EventBus::new(256),
        None,
        Arc::clone(clock) as Arc<dyn Clock>,
        config,
    ))
}

fn who(id: i64, name: &str) -> Identity {
    Identity::new(ParticipantId::new(id), Some(name.to_string()))
}

fn picks(codes: [&str; 3]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_string()).collect()
}

async fn seeded(clock: &Arc<ManualClock>) -> Arc<LeagueService> {
    let service = league(clock);
    let Ok(added) = service.seed_roster_if_empty().await else {
        panic!("seeding failed");
    };
    assert_eq!(added, 20);
    service
}

#[tokio::test]
async fn bahrain_grand_prix_from_prediction_to_standings() {
    let clock = Arc::new(ManualClock::new(bahrain_start() - Duration::days(3)));
    let service = seeded(&clock).await;
    let admin = who(ADMIN, "Race Control");
    let ana = who(10, "Ana");
    let ben = who(11, "Ben");

    let Ok(event) = service
        .create_event(&admin, "Bahrain Grand Prix", bahrain_start())
        .await
    else {
        panic!("event creation failed");
    };
    let event_id = event.event.id;

    clock.set(bahrain_start() - Duration::minutes(20));
    let Ok(placed) = service
        .place_prediction(&ana, event_id, &picks(["VER", "NOR", "PIA"]))
        .await
    else {
        panic!("prediction at T-20m must succeed");
    };
    assert!(placed.changed);
    let Ok(_) = service
        .place_prediction(&ben, event_id, &picks(["LEC", "HAM", "RUS"]))
        .await
    else {
        panic!("prediction at T-20m must succeed");
    };

    clock.set(bahrain_start() - Duration::minutes(5));
    let late = service
        .place_prediction(&ana, event_id, &picks(["NOR", "VER", "PIA"]))
        .await;
    assert!(matches!(late, Err(LeagueError::BettingClosed { .. })));

    let before = service
        .leaderboard(None)
        .await
        .unwrap_or_default()
        .into_iter()
        .find(|row| row.participant_id == ParticipantId::new(10))
        .map_or(0, |row| row.total_points);

    clock.set(bahrain_start() + Duration::hours(2));
    let Ok(summary) = service
        .enter_result(&admin, event_id, &picks(["VER", "PIA", "NOR"]), false)
        .await
    else {
        panic!("result entry failed");
    };
    let points: Vec<(i64, u8)> = summary
        .scores
        .iter()
        .map(|s| (s.participant_id.get(), s.points))
        .collect();
    assert_eq!(points, vec![(10, 5), (11, 0)]);

    let Ok(board) = service.leaderboard(None).await else {
        panic!("leaderboard failed");
    };
    let Some(top) = board.first() else {
        panic!("empty leaderboard");
    };
    assert_eq!(top.participant_id, ParticipantId::new(10));
    assert_eq!(top.total_points, before + 5);
    assert_eq!(top.rank, 1);

    let Ok(history) = service.history(&ben).await else {
        panic!("history failed");
    };
    assert_eq!(history.total_points, 0);
    assert_eq!(history.entries.first().and_then(|e| e.points), Some(0));

    let Ok(view) = service.get_event(event_id).await else {
        panic!("event missing");
    };
    assert_eq!(view.status, EventStatus::Resulted);

    let Ok(report) = service.verify_totals(&admin).await else {
        panic!("verification failed");
    };
    assert!(report.consistent);
}

#[tokio::test]
async fn settling_twice_leaves_totals_unchanged() {
    let clock = Arc::new(ManualClock::new(bahrain_start() - Duration::days(1)));
    let service = seeded(&clock).await;
    let admin = who(ADMIN, "Race Control");
    let Ok(event) = service
        .create_event(&admin, "Bahrain Grand Prix", bahrain_start())
        .await
    else {
        panic!("event creation failed");
    };
    let _ = service
        .place_prediction(&who(10, "Ana"), event.event.id, &picks(["VER", "PIA", "NOR"]))
        .await;

    clock.set(bahrain_start() + Duration::hours(2));
    for confirm in [false, true] {
        let Ok(_) = service
            .enter_result(&admin, event.event.id, &picks(["VER", "PIA", "NOR"]), confirm)
            .await
        else {
            panic!("settlement failed");
        };
    }
    let Ok(history) = service.history(&who(10, "Ana")).await else {
        panic!("history failed");
    };
    assert_eq!(history.total_points, 9);
}

#[tokio::test]
async fn bulk_upload_keeps_good_rows_and_reports_bad_dates() {
    let clock = Arc::new(ManualClock::new(bahrain_start() - Duration::days(10)));
    let service = league(&clock);
    let admin = who(ADMIN, "Race Control");

    let mut rows: Vec<BulkEventRow> = (1..=20)
        .map(|round| BulkEventRow {
            name: format!("Round {round}"),
            date: format!("2025-{:02}-{:02}", 3 + round / 4, 1 + round),
            time: "15:00".to_string(),
        })
        .collect();
    rows.push(BulkEventRow {
        name: "Monaco Grand Prix".to_string(),
        date: "2025-02-30".to_string(),
        time: "15:00".to_string(),
    });
    rows.push(BulkEventRow {
        name: "Las Vegas Grand Prix".to_string(),
        date: "22/11/2025".to_string(),
        time: "06:00".to_string(),
    });
    assert_eq!(rows.len(), 22);

    let Ok(report) = service.bulk_create_events(&admin, rows, Vec::new()).await else {
        panic!("bulk upload failed");
    };
    assert_eq!(report.accepted.len(), 20);
    assert_eq!(report.rejections.len(), 2);
    assert!(
        report
            .rejections
            .iter()
            .any(|r| r.input.starts_with("Monaco Grand Prix"))
    );
    assert_eq!(service.list_events().await.len(), 20);
}

#[tokio::test]
async fn each_event_is_reminded_at_most_once() {
    let clock = Arc::new(ManualClock::new(bahrain_start() - Duration::days(1)));
    let service = league(&clock);
    let admin = who(ADMIN, "Race Control");
    let mut ids: Vec<EventId> = Vec::new();
    for (name, offset_hours) in [("Bahrain Grand Prix", 0), ("Saudi Arabian Grand Prix", 1)] {
        let Ok(view) = service
            .create_event(&admin, name, bahrain_start() + Duration::hours(offset_hours))
            .await
        else {
            panic!("event creation failed");
        };
        ids.push(view.event.id);
    }

    let notifier = Arc::new(RecordingNotifier::new());
    let scheduler = ReminderScheduler::new(
        Arc::clone(&service),
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    clock.set(bahrain_start() - Duration::hours(6));
    for _ in 0..12 {
        let _ = scheduler.scan_once().await;
        clock.advance(Duration::minutes(30));
    }

    let to_admin = notifier.sent_to(&Recipient::Participant(ParticipantId::new(ADMIN)));
    assert_eq!(to_admin.len(), 2);
    for id in ids {
        let Ok(view) = service.get_event(id).await else {
            panic!("event missing");
        };
        assert!(view.event.reminder_sent);
    }
}
