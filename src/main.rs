//! podium-gateway server entry point.
//!
//! Loads league state, starts the reminder scheduler, the prediction
//! announcer and the audit trail, and serves the REST API until SIGINT or SIGTERM.

use std::sync::Arc;

use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use podium_gateway::api;
use podium_gateway::app_state::AppState;
use podium_gateway::config::LeagueConfig;
use podium_gateway::domain::{Clock, EventBus, LeagueStore, StoreSnapshot, SystemClock};
use podium_gateway::persistence::{PostgresPersistence, read_with_retry, retry};
use podium_gateway::service::{
    AuditTrail, LeagueService, Notifier, PredictionAnnouncer, ReminderScheduler, TracingNotifier,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Load configuration
    let config = LeagueConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        persistence = config.persistence_enabled,
        admins = config.admin_ids.len(),
        closing_offset_minutes = config.bet_closing_offset_minutes,
        "starting podium-gateway"
    );

    // Storage and initial state
    let (persistence, snapshot) = if config.persistence_enabled {
        let db = PostgresPersistence::connect(&config).await?;
        db.run_migrations().await?;
        let snapshot = read_with_retry(
            "load_snapshot",
            config.persistence_read_retries,
            retry::DEFAULT_READ_BACKOFF,
            || db.load_snapshot(|id| config.is_admin(id)),
        )
        .await?;
        (Some(db), snapshot)
    } else {
        tracing::warn!("persistence disabled, league state lives in memory only");
        (None, StoreSnapshot::default())
    };
    tracing::info!(
        participants = snapshot.participants.len(),
        events = snapshot.events.len(),
        score_records = snapshot.score_records.len(),
        "league state loaded"
    );

    // Build domain layer
    let store = Arc::new(LeagueStore::from_snapshot(snapshot));
    let event_bus = EventBus::new(config.event_bus_capacity);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Build service layer
    let listen_addr = config.listen_addr;
    let league_service = Arc::new(LeagueService::new(
        store,
        event_bus.clone(),
        persistence,
        clock,
        config,
    ));
    league_service.seed_roster_if_empty().await?;
    verify_on_startup(&league_service).await;

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&league_service),
        Arc::clone(&notifier),
    ));
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let announcer = PredictionAnnouncer::new(Arc::clone(&league_service), notifier);
    let announcer_task = tokio::spawn(announcer.run(event_bus.subscribe(), shutdown_rx.clone()));
    let audit_task = tokio::spawn(
        AuditTrail::new().run(event_bus.subscribe(), shutdown_rx.clone()),
    );

    // Build router
    let app = api::build_app(AppState::new(league_service, shutdown_rx));
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "reminder scheduler task failed");
    }
    if let Err(e) = announcer_task.await {
        tracing::error!(error = %e, "announcer task failed");
    }
    match audit_task.await {
        Ok(recorded) => tracing::debug!(recorded, "audit trail drained"),
        Err(e) => tracing::error!(error = %e, "audit task failed"),
    }
    tracing::info!("podium-gateway stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Logs drift between stored totals and score records after loading.
async fn verify_on_startup(service: &LeagueService) {
    let ledger = service.store().ledger().read().await;
    let mismatches = ledger.mismatches();
    if mismatches.is_empty() {
        tracing::debug!(records = ledger.record_count(), "totals consistent");
    } else {
        tracing::error!(
            mismatches = mismatches.len(),
            "totals disagree with score records"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining requests");
}
