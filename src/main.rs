use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emdr_consumer::config::Config;
use emdr_consumer::jobs::emdr_stats_flush::{flush_emdr_stats, start_emdr_stats_flush_job};
use emdr_consumer::jobs::status_report::start_status_report_job;
use emdr_consumer::services::dispatcher::Dispatcher;
use emdr_consumer::services::market_store::MarketStore;
use emdr_consumer::services::pg_store::PgStore;
use emdr_consumer::services::relay_feed::RelaySubscriber;

/// Raw messages queued between the relays and the decoder
const INGEST_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,emdr_consumer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let mut options = ConnectOptions::new(config.database_url.clone());
    options.max_connections(config.pool_size());
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn MarketStore> = Arc::new(PgStore::new(db));
    let dispatcher = Arc::new(Dispatcher::from_config(store.clone(), &config));

    start_emdr_stats_flush_job(
        store.clone(),
        dispatcher.metrics().clone(),
        config.emdr_stats_interval,
    )
    .await;

    if config.display_stats {
        start_status_report_job(
            dispatcher.throughput().clone(),
            dispatcher.backlog().clone(),
            config.status_interval,
        )
        .await;
    }

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(INGEST_CHANNEL_CAPACITY);
    let relays = RelaySubscriber::new(config.relays.clone(), tx).start();

    tracing::info!(
        relays = relays.len(),
        rejection_multiplier = config.rejection_multiplier,
        extensive_logging = config.extensive_logging,
        max_in_flight_messages = config.max_in_flight_messages,
        pool_size = config.pool_size(),
        "EMDR consumer running"
    );

    // Pinned once so a signal that arrives during ingest is not missed
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping consumer");
                break;
            }
            msg = rx.recv() => {
                match msg {
                    Some(raw) => {
                        // Blocks here while the in-flight limit is reached
                        dispatcher.ingest(&raw).await;
                    }
                    None => {
                        tracing::warn!("All relay connections stopped");
                        break;
                    }
                }
            }
        }
    }

    for relay in relays {
        relay.abort();
    }

    // Persist the partial interval before exiting
    let report = flush_emdr_stats(store.as_ref(), dispatcher.metrics(), chrono::Utc::now()).await;
    tracing::info!(written = report.written, failed = report.failed, "Final EMDR stats flush");
}
