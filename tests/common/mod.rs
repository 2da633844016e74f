#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emdr_consumer::error::StoreError;
use emdr_consumer::models::history::{HistoryRecord, HistoryUpsertCounts};
use emdr_consumer::models::order::{OrderQuote, OrderRecord, OrderUpsertCounts, RegionType};
use emdr_consumer::models::region_stat::RegionItemStat;
use emdr_consumer::models::status::StatusCode;
use emdr_consumer::services::anomaly::{AnomalyEvaluator, ComparisonStats};
use emdr_consumer::services::dispatcher::Dispatcher;
use emdr_consumer::services::market_store::MarketStore;
use emdr_consumer::services::memory_store::MemoryStore;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Set up test database connection
/// Uses TEST_DATABASE_URL environment variable or falls back to default
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let database_url = env::var("TEST_DATABASE_URL").unwrap_or_else(|_| {
        "postgresql://emdr_user@localhost:5432/emdr_test".to_string()
    });

    Database::connect(&database_url).await
}

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// The Forge, Tritanium
pub fn pair() -> RegionType {
    RegionType::new(10000002, 34)
}

/// Domain, Tritanium
pub fn other_pair() -> RegionType {
    RegionType::new(10000043, 34)
}

pub fn order(
    pair: RegionType,
    order_id: i64,
    price: Decimal,
    is_bid: bool,
    generated_at: DateTime<Utc>,
) -> OrderRecord {
    OrderRecord {
        order_id,
        region_id: pair.region_id,
        type_id: pair.type_id,
        station_id: 60003760,
        solar_system_id: 30000142,
        price,
        volume_remaining: 1000,
        volume_entered: 1000,
        min_volume: 1,
        range: 32767,
        is_bid,
        issue_date: generated_at,
        duration: 90,
        generated_at,
        is_suspicious: false,
        uploader_hash: "uploader".to_string(),
        is_active: true,
    }
}

pub fn history(pair: RegionType, date: DateTime<Utc>, average: Decimal) -> HistoryRecord {
    HistoryRecord {
        region_id: pair.region_id,
        type_id: pair.type_id,
        date,
        num_orders: 12,
        low: average - Decimal::ONE,
        high: average + Decimal::ONE,
        average,
        quantity: 5000,
    }
}

/// Dispatcher over a fresh in-memory store with k = 3
pub fn dispatcher() -> (Arc<MemoryStore>, Arc<Dispatcher>) {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher_over(store.clone(), 64, false);
    (store, dispatcher)
}

pub fn dispatcher_over(
    store: Arc<dyn MarketStore>,
    max_in_flight_messages: usize,
    extensive_logging: bool,
) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        store,
        AnomalyEvaluator::new(3.0),
        4,
        max_in_flight_messages,
        extensive_logging,
    ))
}

/// `MemoryStore` whose stats lookups wait until [`HeldStore::release`]
pub struct HeldStore {
    inner: MemoryStore,
    gate: Semaphore,
    waiting: AtomicUsize,
}

impl HeldStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Stats lookups currently parked at the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl MarketStore for HeldStore {
    async fn comparison_stats(&self, pair: RegionType) -> Result<ComparisonStats, StoreError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        drop(permit);
        self.inner.comparison_stats(pair).await
    }

    async fn upsert_orders(
        &self,
        pair: RegionType,
        orders: &[OrderRecord],
    ) -> Result<OrderUpsertCounts, StoreError> {
        self.inner.upsert_orders(pair, orders).await
    }

    async fn deactivate_missing(
        &self,
        pair: RegionType,
        keep_ids: &[i64],
    ) -> Result<u64, StoreError> {
        self.inner.deactivate_missing(pair, keep_ids).await
    }

    async fn active_order_quotes(&self, pair: RegionType) -> Result<Vec<OrderQuote>, StoreError> {
        self.inner.active_order_quotes(pair).await
    }

    async fn upsert_history(
        &self,
        rows: &[HistoryRecord],
        now: DateTime<Utc>,
    ) -> Result<HistoryUpsertCounts, StoreError> {
        self.inner.upsert_history(rows, now).await
    }

    async fn upsert_region_stat(&self, stat: &RegionItemStat) -> Result<(), StoreError> {
        self.inner.upsert_region_stat(stat).await
    }

    async fn upsert_region_stat_history(
        &self,
        stat: &RegionItemStat,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.upsert_region_stat_history(stat, date, now).await
    }

    async fn insert_status_count(
        &self,
        status: StatusCode,
        count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.insert_status_count(status, count, at).await
    }
}

/// Single-row order message for The Forge, Tritanium
pub fn order_message(order_id: i64, price: f64) -> Vec<u8> {
    let json = format!(
        r#"{{
        "resultType": "orders",
        "version": "0.1",
        "uploadKeys": [{{"name": "emk", "key": "abc123"}}],
        "columns": ["price","volRemaining","range","orderID","volEntered","minVolume","bid","issueDate","duration","stationID","solarSystemID"],
        "rowsets": [
            {{
                "generatedAt": "2026-10-14T11:00:00+00:00",
                "regionID": 10000002,
                "typeID": 34,
                "rows": [
                    [{price}, 1000, 32767, {order_id}, 1000, 1, false, "2026-10-14T09:00:00+00:00", 90, 60003760, 30000142]
                ]
            }}
        ]
    }}"#
    );
    compress(&json)
}

pub fn compress(json: &str) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    encoder.finish().unwrap()
}
