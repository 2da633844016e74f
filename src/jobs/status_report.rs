//! Status Report Job
//!
//! Logs per-second throughput and the per-stage backlog at a fixed interval.

use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant};
use tracing::info;

use crate::services::backlog::Backlog;
use crate::services::throughput::{Throughput, ThroughputSnapshot};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusRates {
    pub messages: f64,
    pub order_messages: f64,
    pub history_messages: f64,
    pub order_upserts: f64,
    pub history_upserts: f64,
}

impl StatusRates {
    pub fn per_second(snapshot: &ThroughputSnapshot, period: Duration) -> Self {
        let secs = period.as_secs_f64().max(f64::EPSILON);
        Self {
            messages: snapshot.messages as f64 / secs,
            order_messages: snapshot.order_messages as f64 / secs,
            history_messages: snapshot.history_messages as f64 / secs,
            order_upserts: snapshot.order_upserts as f64 / secs,
            history_upserts: snapshot.history_upserts as f64 / secs,
        }
    }
}

pub async fn start_status_report_job(
    throughput: Arc<Throughput>,
    backlog: Arc<Backlog>,
    period: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping status report job");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = throughput.take();
                    let rates = StatusRates::per_second(&snapshot, period);
                    let pending = backlog.snapshot();

                    info!(
                        messages_per_sec = rates.messages,
                        order_messages_per_sec = rates.order_messages,
                        history_messages_per_sec = rates.history_messages,
                        order_upserts_per_sec = rates.order_upserts,
                        history_upserts_per_sec = rates.history_upserts,
                        decode_errors = snapshot.decode_errors,
                        backlog_messages = pending.messages,
                        backlog_std_dev = pending.std_dev,
                        backlog_orders = pending.orders,
                        backlog_statistics = pending.statistics,
                        backlog_history = pending.history,
                        "EMDR status"
                    );
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_are_per_second() {
        let snapshot = ThroughputSnapshot {
            messages: 50,
            order_messages: 40,
            history_messages: 10,
            order_upserts: 400,
            history_upserts: 25,
            decode_errors: 0,
        };

        let rates = StatusRates::per_second(&snapshot, Duration::from_secs(5));

        assert_eq!(rates.messages, 10.0);
        assert_eq!(rates.order_messages, 8.0);
        assert_eq!(rates.history_messages, 2.0);
        assert_eq!(rates.order_upserts, 80.0);
        assert_eq!(rates.history_upserts, 5.0);
    }
}
