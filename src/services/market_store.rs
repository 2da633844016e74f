//! Persistence seam for the ingestion engine
//!
//! Everything the merge, anomaly and statistics stages read or write goes
//! through [`MarketStore`]. `PgStore` backs it with Postgres; `MemoryStore`
//! holds the same tables in memory for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::StoreError;
use crate::models::history::{HistoryRecord, HistoryUpsertCounts};
use crate::models::order::{OrderQuote, OrderRecord, OrderUpsertCounts, RegionType};
use crate::models::region_stat::RegionItemStat;
use crate::models::status::StatusCode;
use crate::services::anomaly::ComparisonStats;

/// How far back a dated bucket may still be updated in place
pub const UPDATE_WINDOW_DAYS: i64 = 1;

/// Oldest bucket date that is still updatable at `now`
pub fn update_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(UPDATE_WINDOW_DAYS)
}

/// Whether a stored bucket dated `date` may be overwritten at `now`.
/// Older buckets are immutable and a later report gets a fresh row.
pub fn within_update_window(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date >= update_window_start(now)
}

/// Midnight UTC of the day containing `now`
pub fn day_bucket(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&midnight)
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Count, mean and sample standard deviation of the prices of active,
    /// non-suspicious orders for the pair
    async fn comparison_stats(&self, pair: RegionType) -> Result<ComparisonStats, StoreError>;

    /// Insert unseen orders and overwrite stored ones whose `generated_at`
    /// is strictly older than the incoming row. `orders` must have unique ids.
    async fn upsert_orders(
        &self,
        pair: RegionType,
        orders: &[OrderRecord],
    ) -> Result<OrderUpsertCounts, StoreError>;

    /// Mark every active order of the pair not listed in `keep_ids` inactive.
    /// Returns the number of orders retired.
    async fn deactivate_missing(
        &self,
        pair: RegionType,
        keep_ids: &[i64],
    ) -> Result<u64, StoreError>;

    async fn active_order_quotes(&self, pair: RegionType) -> Result<Vec<OrderQuote>, StoreError>;

    async fn upsert_history(
        &self,
        rows: &[HistoryRecord],
        now: DateTime<Utc>,
    ) -> Result<HistoryUpsertCounts, StoreError>;

    /// Overwrite the latest statistics row of the pair
    async fn upsert_region_stat(&self, stat: &RegionItemStat) -> Result<(), StoreError>;

    /// Upsert the statistics snapshot for `date` under the update window rule
    async fn upsert_region_stat_history(
        &self,
        stat: &RegionItemStat,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn insert_status_count(
        &self,
        status: StatusCode,
        count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_update_window() {
        let now = at("2026-10-14T12:00:00+00:00");

        assert!(within_update_window(at("2026-10-14T00:00:00+00:00"), now));
        assert!(within_update_window(at("2026-10-13T12:00:00+00:00"), now));
        assert!(!within_update_window(at("2026-10-13T00:00:00+00:00"), now));
        assert!(!within_update_window(at("2026-09-01T00:00:00+00:00"), now));
    }

    #[test]
    fn test_day_bucket() {
        assert_eq!(
            day_bucket(at("2026-10-14T23:59:59+00:00")),
            at("2026-10-14T00:00:00+00:00")
        );
        assert_eq!(
            day_bucket(at("2026-10-14T01:30:00+02:00")),
            at("2026-10-13T00:00:00+00:00")
        );
    }
}
