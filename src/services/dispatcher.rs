//! Per-message pipeline
//!
//! Messages are decoded one at a time by the caller of [`Dispatcher::ingest`].
//! Each classified batch then runs as its own task; an order batch fans out
//! into one task per region/type group. A store error abandons only the
//! group (or history batch) that raised it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::batch::{MarketBatch, OrderBatch};
use crate::models::history::HistoryRecord;
use crate::models::order::{OrderRecord, RegionType};
use crate::models::status::StatusCode;
use crate::services::anomaly::AnomalyEvaluator;
use crate::services::backlog::{Backlog, Stage};
use crate::services::decoder::decode_message;
use crate::services::emdr_metrics::EmdrMetrics;
use crate::services::history_merge::merge_history;
use crate::services::market_store::MarketStore;
use crate::services::order_merge::merge_group;
use crate::services::region_stats::{compute_region_stat, persist_region_stat};
use crate::services::throughput::Throughput;

pub struct Dispatcher {
    store: Arc<dyn MarketStore>,
    evaluator: AnomalyEvaluator,
    metrics: Arc<EmdrMetrics>,
    throughput: Arc<Throughput>,
    backlog: Arc<Backlog>,
    extensive_logging: bool,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn MarketStore>,
        evaluator: AnomalyEvaluator,
        max_concurrent_store_ops: usize,
        max_in_flight_messages: usize,
        extensive_logging: bool,
    ) -> Self {
        Self {
            store,
            evaluator,
            metrics: Arc::new(EmdrMetrics::new()),
            throughput: Arc::new(Throughput::new()),
            backlog: Arc::new(Backlog::new(
                max_concurrent_store_ops,
                max_in_flight_messages,
            )),
            extensive_logging,
        }
    }

    pub fn from_config(store: Arc<dyn MarketStore>, config: &Config) -> Self {
        Self::new(
            store,
            AnomalyEvaluator::new(config.rejection_multiplier),
            config.max_concurrent_store_ops,
            config.max_in_flight_messages,
            config.extensive_logging,
        )
    }

    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<EmdrMetrics> {
        &self.metrics
    }

    pub fn throughput(&self) -> &Arc<Throughput> {
        &self.throughput
    }

    pub fn backlog(&self) -> &Arc<Backlog> {
        &self.backlog
    }

    /// Decode one raw message and spawn its processing.
    /// Waits while the in-flight message limit is reached, so a slow store
    /// pushes back on the caller instead of queueing unbounded tasks.
    /// Undecodable and unrecognised messages are dropped and yield `None`.
    pub async fn ingest(self: &Arc<Self>, raw: &[u8]) -> Option<JoinHandle<()>> {
        self.throughput.message();

        let batch = match decode_message(raw) {
            Ok(MarketBatch::Ignored(result_type)) => {
                debug!(result_type = %result_type, "Ignoring message");
                return None;
            }
            Ok(batch) => batch,
            Err(e) => {
                self.throughput.decode_error();
                warn!(error = %e, bytes = raw.len(), "Dropping undecodable message");
                return None;
            }
        };

        let in_flight = self.backlog.enter(Stage::Messages).await;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            this.process_batch(batch, Utc::now()).await;
        }))
    }

    pub async fn process_batch(self: &Arc<Self>, batch: MarketBatch, now: DateTime<Utc>) {
        match batch {
            MarketBatch::Orders(orders) => self.process_orders(orders, now).await,
            MarketBatch::History(rows) => self.process_history(rows, now).await,
            MarketBatch::Ignored(_) => {}
        }
    }

    /// Run every group of the batch concurrently and wait for all of them
    pub async fn process_orders(self: &Arc<Self>, batch: OrderBatch, now: DateTime<Utc>) {
        self.metrics.incr(StatusCode::OrderMessages);
        self.throughput.order_message();

        if batch.is_empty() {
            self.metrics.incr(StatusCode::EmptyOrderMessages);
            return;
        }

        let mut groups = JoinSet::new();
        for &pair in batch.region_types() {
            let orders = batch.group(pair);
            let this = Arc::clone(self);
            groups.spawn(async move { this.process_group(pair, orders, now).await });
        }

        while let Some(result) = groups.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Order group task failed");
            }
        }
    }

    /// Stats lookup, anomaly evaluation, merge, then region statistics.
    /// Each step short-circuits the rest of the group on a store error.
    pub async fn process_group(
        &self,
        pair: RegionType,
        mut orders: Vec<OrderRecord>,
        now: DateTime<Utc>,
    ) {
        let stats = {
            let _guard = self.backlog.enter(Stage::StdDev).await;
            self.store.comparison_stats(pair).await
        };
        let stats = match stats {
            Ok(stats) => stats,
            Err(e) => {
                self.report_group_error(Stage::StdDev, pair, &e, &orders);
                return;
            }
        };

        let has_suspicious = self.evaluator.evaluate(&stats, &mut orders);
        if has_suspicious {
            debug!(
                region_id = pair.region_id,
                type_id = pair.type_id,
                suspicious = orders.iter().filter(|o| o.is_suspicious).count(),
                "Suspicious orders in group, skipping retirement"
            );
        }

        let merged = {
            let _guard = self.backlog.enter(Stage::Orders).await;
            merge_group(self.store.as_ref(), pair, &orders, has_suspicious).await
        };
        let outcome = match merged {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_group_error(Stage::Orders, pair, &e, &orders);
                return;
            }
        };

        self.metrics.add(StatusCode::OrderInserts, outcome.counts.inserted);
        self.metrics.add(StatusCode::OrderUpdates, outcome.counts.updated);
        self.metrics
            .add(StatusCode::OrderStaleUpdates, outcome.counts.stale);
        self.throughput
            .order_upserts(outcome.counts.inserted + outcome.counts.updated);

        if self.extensive_logging {
            debug!(
                region_id = pair.region_id,
                type_id = pair.type_id,
                inserted = outcome.counts.inserted,
                updated = outcome.counts.updated,
                stale = outcome.counts.stale,
                deactivated = outcome.deactivated,
                "Merged order group"
            );
        }

        let _guard = self.backlog.enter(Stage::Statistics).await;
        self.aggregate(pair, now).await;
    }

    async fn aggregate(&self, pair: RegionType, now: DateTime<Utc>) {
        let quotes = match self.store.active_order_quotes(pair).await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!(
                    stage = Stage::Statistics.as_str(),
                    region_id = pair.region_id,
                    type_id = pair.type_id,
                    error = %e,
                    "Failed to fetch active orders"
                );
                return;
            }
        };

        let Some(stat) = compute_region_stat(pair, &quotes) else {
            return;
        };

        if let Err(e) = persist_region_stat(self.store.as_ref(), &stat, now).await {
            if self.extensive_logging {
                error!(
                    stage = Stage::Statistics.as_str(),
                    region_id = pair.region_id,
                    type_id = pair.type_id,
                    error = %e,
                    stat = ?stat,
                    "Failed to store region stats"
                );
            } else {
                error!(
                    stage = Stage::Statistics.as_str(),
                    region_id = pair.region_id,
                    type_id = pair.type_id,
                    error = %e,
                    "Failed to store region stats"
                );
            }
        }
    }

    /// Only a history batch that reaches the store counts as a message
    pub async fn process_history(&self, rows: Vec<HistoryRecord>, now: DateTime<Utc>) {
        if rows.is_empty() {
            debug!("Skipping empty history message");
            return;
        }

        let merged = {
            let _guard = self.backlog.enter(Stage::History).await;
            merge_history(self.store.as_ref(), &rows, now).await
        };

        match merged {
            Ok(counts) => {
                self.metrics.incr(StatusCode::HistoryMessages);
                self.throughput.history_message();
                self.metrics.add(StatusCode::HistoryUpdates, counts.updated);
                self.throughput
                    .history_upserts(counts.inserted + counts.updated);
            }
            Err(e) if self.extensive_logging => {
                error!(
                    stage = Stage::History.as_str(),
                    rows = rows.len(),
                    error = %e,
                    params = ?rows,
                    "History merge failed"
                );
            }
            Err(e) => {
                error!(
                    stage = Stage::History.as_str(),
                    rows = rows.len(),
                    error = %e,
                    "History merge failed"
                );
            }
        }
    }

    fn report_group_error(
        &self,
        stage: Stage,
        pair: RegionType,
        err: &StoreError,
        orders: &[OrderRecord],
    ) {
        if self.extensive_logging {
            error!(
                stage = stage.as_str(),
                region_id = pair.region_id,
                type_id = pair.type_id,
                error = %err,
                params = ?orders,
                "Order group aborted"
            );
        } else {
            error!(
                stage = stage.as_str(),
                region_id = pair.region_id,
                type_id = pair.type_id,
                orders = orders.len(),
                error = %err,
                "Order group aborted"
            );
        }
    }
}
