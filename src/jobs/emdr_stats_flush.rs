//! EMDR Stats Flush Job
//!
//! Periodically drains the interval counters into market_data_emdrstats,
//! one row per status code.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{error, info};

use crate::services::emdr_metrics::EmdrMetrics;
use crate::services::market_store::MarketStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub failed: usize,
}

/// Snapshot and reset the counters, then write every status code on its
/// own. A code whose insert fails has its count restored so the next flush
/// carries it; the remaining codes are still written.
pub async fn flush_emdr_stats(
    store: &dyn MarketStore,
    metrics: &EmdrMetrics,
    now: DateTime<Utc>,
) -> FlushReport {
    let snapshot = metrics.snapshot_and_reset();
    let mut report = FlushReport::default();

    for (status, count) in snapshot.iter() {
        match store.insert_status_count(status, count, now).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                metrics.restore(status, count);
                report.failed += 1;
                error!(
                    status_code = status.code(),
                    count = count,
                    error = %e,
                    "Failed to write status count, keeping it for the next flush"
                );
            }
        }
    }

    report
}

/// Start the EMDR stats flush job
///
/// The first flush happens one `period` after start.
pub async fn start_emdr_stats_flush_job(
    store: Arc<dyn MarketStore>,
    metrics: Arc<EmdrMetrics>,
    period: Duration,
) {
    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "EMDR stats flush job started");

        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping EMDR stats flush job");
                    break;
                }
                _ = ticker.tick() => {
                    let report = flush_emdr_stats(store.as_ref(), &metrics, Utc::now()).await;
                    if report.failed > 0 {
                        error!(written = report.written, failed = report.failed, "EMDR stats flush incomplete");
                    } else {
                        info!(written = report.written, "EMDR stats flushed");
                    }
                }
            }
        }

        info!("EMDR stats flush job stopped");
    });
}
