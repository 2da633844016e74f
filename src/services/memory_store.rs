//! In-memory `MarketStore`
//!
//! Mirrors the Postgres semantics (monotonic order updates, update window
//! for dated buckets, sample standard deviation) without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::DbErr;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::StoreError;
use crate::models::history::{HistoryRecord, HistoryUpsertCounts};
use crate::models::order::{OrderQuote, OrderRecord, OrderUpsertCounts, RegionType};
use crate::models::region_stat::RegionItemStat;
use crate::models::status::StatusCode;
use crate::services::anomaly::ComparisonStats;
use crate::services::market_store::{within_update_window, MarketStore};

#[derive(Debug, Clone, PartialEq)]
pub struct StatHistoryRow {
    pub date: DateTime<Utc>,
    pub stat: RegionItemStat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRow {
    pub status: StatusCode,
    pub count: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<i64, OrderRecord>,
    history: Vec<HistoryRecord>,
    region_stats: HashMap<RegionType, RegionItemStat>,
    region_stat_history: Vec<StatHistoryRow>,
    status_rows: Vec<StatusRow>,
    failing_pairs: HashSet<RegionType>,
    failing_statuses: HashSet<StatusCode>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_order(&self, order: OrderRecord) {
        self.tables.lock().orders.insert(order.order_id, order);
    }

    pub fn seed_history(&self, row: HistoryRecord) {
        self.tables.lock().history.push(row);
    }

    pub fn seed_region_stat_history(&self, date: DateTime<Utc>, stat: RegionItemStat) {
        self.tables
            .lock()
            .region_stat_history
            .push(StatHistoryRow { date, stat });
    }

    /// Make every pair-scoped operation for `pair` fail
    pub fn fail_pair(&self, pair: RegionType) {
        self.tables.lock().failing_pairs.insert(pair);
    }

    /// Make status inserts for `status` fail until cleared
    pub fn fail_status(&self, status: StatusCode) {
        self.tables.lock().failing_statuses.insert(status);
    }

    pub fn clear_failures(&self) {
        let mut tables = self.tables.lock();
        tables.failing_pairs.clear();
        tables.failing_statuses.clear();
    }

    pub fn order(&self, order_id: i64) -> Option<OrderRecord> {
        self.tables.lock().orders.get(&order_id).cloned()
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.tables.lock().orders.values().cloned().collect()
    }

    pub fn active_order_ids(&self, pair: RegionType) -> Vec<i64> {
        self.tables
            .lock()
            .orders
            .values()
            .filter(|o| o.is_active && o.region_type() == pair)
            .map(|o| o.order_id)
            .collect()
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.tables.lock().history.clone()
    }

    pub fn region_stat(&self, pair: RegionType) -> Option<RegionItemStat> {
        self.tables.lock().region_stats.get(&pair).copied()
    }

    pub fn region_stat_history(&self) -> Vec<StatHistoryRow> {
        self.tables.lock().region_stat_history.clone()
    }

    pub fn status_rows(&self) -> Vec<StatusRow> {
        self.tables.lock().status_rows.clone()
    }

    fn check_pair(tables: &Tables, pair: RegionType) -> Result<(), StoreError> {
        if tables.failing_pairs.contains(&pair) {
            return Err(StoreError::Database(DbErr::Custom(format!(
                "injected failure for {}",
                pair
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn comparison_stats(&self, pair: RegionType) -> Result<ComparisonStats, StoreError> {
        let tables = self.tables.lock();
        Self::check_pair(&tables, pair)?;

        let prices: Vec<f64> = tables
            .orders
            .values()
            .filter(|o| o.region_type() == pair && o.is_active && !o.is_suspicious)
            .map(|o| o.price.to_f64().unwrap_or(0.0))
            .collect();

        let count = prices.len() as i64;
        if prices.is_empty() {
            return Ok(ComparisonStats::default());
        }

        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        // Sample standard deviation, NULL for a single row like Postgres STDDEV
        let std_dev = (prices.len() > 1).then(|| {
            let sum_sq: f64 = prices.iter().map(|p| (p - mean).powi(2)).sum();
            (sum_sq / (prices.len() - 1) as f64).sqrt()
        });

        Ok(ComparisonStats {
            count,
            mean: Some(mean),
            std_dev,
        })
    }

    async fn upsert_orders(
        &self,
        pair: RegionType,
        orders: &[OrderRecord],
    ) -> Result<OrderUpsertCounts, StoreError> {
        let mut tables = self.tables.lock();
        Self::check_pair(&tables, pair)?;

        let mut counts = OrderUpsertCounts::default();
        for incoming in orders {
            match tables.orders.get_mut(&incoming.order_id) {
                Some(stored) if stored.generated_at < incoming.generated_at => {
                    stored.price = incoming.price;
                    stored.volume_remaining = incoming.volume_remaining;
                    stored.generated_at = incoming.generated_at;
                    stored.issue_date = incoming.issue_date;
                    stored.is_suspicious = incoming.is_suspicious;
                    stored.uploader_hash = incoming.uploader_hash.clone();
                    stored.is_active = true;
                    counts.updated += 1;
                }
                Some(_) => counts.stale += 1,
                None => {
                    let mut order = incoming.clone();
                    order.is_active = true;
                    tables.orders.insert(order.order_id, order);
                    counts.inserted += 1;
                }
            }
        }

        Ok(counts)
    }

    async fn deactivate_missing(
        &self,
        pair: RegionType,
        keep_ids: &[i64],
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        Self::check_pair(&tables, pair)?;

        let keep: HashSet<i64> = keep_ids.iter().copied().collect();
        let mut retired = 0;
        for order in tables.orders.values_mut() {
            if order.is_active && order.region_type() == pair && !keep.contains(&order.order_id) {
                order.is_active = false;
                retired += 1;
            }
        }

        Ok(retired)
    }

    async fn active_order_quotes(&self, pair: RegionType) -> Result<Vec<OrderQuote>, StoreError> {
        let tables = self.tables.lock();
        Self::check_pair(&tables, pair)?;

        Ok(tables
            .orders
            .values()
            .filter(|o| o.is_active && o.region_type() == pair)
            .map(|o| OrderQuote {
                price: o.price.to_f64().unwrap_or(0.0),
                is_bid: o.is_bid,
                volume_remaining: o.volume_remaining,
            })
            .collect())
    }

    async fn upsert_history(
        &self,
        rows: &[HistoryRecord],
        now: DateTime<Utc>,
    ) -> Result<HistoryUpsertCounts, StoreError> {
        let mut tables = self.tables.lock();
        for row in rows {
            Self::check_pair(&tables, row.region_type())?;
        }

        let mut counts = HistoryUpsertCounts::default();
        for row in rows {
            let existing = tables.history.iter().position(|h| {
                h.region_type() == row.region_type()
                    && h.date == row.date
                    && within_update_window(h.date, now)
            });

            match existing {
                Some(i) => {
                    tables.history[i] = row.clone();
                    counts.updated += 1;
                }
                None => {
                    tables.history.push(row.clone());
                    counts.inserted += 1;
                }
            }
        }

        Ok(counts)
    }

    async fn upsert_region_stat(&self, stat: &RegionItemStat) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        Self::check_pair(&tables, stat.region_type)?;

        tables.region_stats.insert(stat.region_type, *stat);
        Ok(())
    }

    async fn upsert_region_stat_history(
        &self,
        stat: &RegionItemStat,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        Self::check_pair(&tables, stat.region_type)?;

        let existing = tables.region_stat_history.iter().position(|r| {
            r.stat.region_type == stat.region_type
                && r.date == date
                && within_update_window(r.date, now)
        });

        match existing {
            Some(i) => tables.region_stat_history[i].stat = *stat,
            None => tables
                .region_stat_history
                .push(StatHistoryRow { date, stat: *stat }),
        }
        Ok(())
    }

    async fn insert_status_count(
        &self,
        status: StatusCode,
        count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if tables.failing_statuses.contains(&status) {
            return Err(StoreError::Database(DbErr::Custom(format!(
                "injected failure for status {}",
                status.code()
            ))));
        }

        tables.status_rows.push(StatusRow { status, count, at });
        Ok(())
    }
}
