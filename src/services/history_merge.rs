//! Daily history merge

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::StoreError;
use crate::models::history::{HistoryRecord, HistoryUpsertCounts};
use crate::services::market_store::MarketStore;

/// Upsert history rows keyed by (region, type, date). A key repeated within
/// the batch keeps its last occurrence.
pub async fn merge_history(
    store: &dyn MarketStore,
    rows: &[HistoryRecord],
    now: DateTime<Utc>,
) -> Result<HistoryUpsertCounts, StoreError> {
    let mut position: HashMap<(i64, i64, DateTime<Utc>), usize> = HashMap::new();
    let mut unique: Vec<HistoryRecord> = Vec::with_capacity(rows.len());

    for row in rows {
        let key = (row.region_id, row.type_id, row.date);
        match position.get(&key) {
            Some(&i) => unique[i] = row.clone(),
            None => {
                position.insert(key, unique.len());
                unique.push(row.clone());
            }
        }
    }

    if unique.is_empty() {
        return Ok(HistoryUpsertCounts::default());
    }

    store.upsert_history(&unique, now).await
}
