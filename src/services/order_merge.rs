//! Order merge and retirement for one region/type group

use std::collections::HashMap;

use crate::error::StoreError;
use crate::models::order::{OrderRecord, OrderUpsertCounts, RegionType};
use crate::services::market_store::MarketStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub counts: OrderUpsertCounts,
    /// Active orders retired because the batch no longer lists them
    pub deactivated: u64,
}

/// Collapse repeated order ids, keeping the newest snapshot of each.
/// First-seen order is preserved.
pub fn dedupe_orders(orders: &[OrderRecord]) -> Vec<OrderRecord> {
    let mut position: HashMap<i64, usize> = HashMap::new();
    let mut unique: Vec<OrderRecord> = Vec::with_capacity(orders.len());

    for order in orders {
        match position.get(&order.order_id) {
            Some(&i) => {
                if unique[i].generated_at < order.generated_at {
                    unique[i] = order.clone();
                }
            }
            None => {
                position.insert(order.order_id, unique.len());
                unique.push(order.clone());
            }
        }
    }

    unique
}

/// Upsert a group of annotated orders, then retire the pair's active orders
/// missing from the group unless the group carried a suspicious order
pub async fn merge_group(
    store: &dyn MarketStore,
    pair: RegionType,
    orders: &[OrderRecord],
    has_suspicious: bool,
) -> Result<MergeOutcome, StoreError> {
    let unique = dedupe_orders(orders);
    let counts = store.upsert_orders(pair, &unique).await?;

    let deactivated = if has_suspicious {
        0
    } else {
        let keep_ids: Vec<i64> = unique.iter().map(|o| o.order_id).collect();
        store.deactivate_missing(pair, &keep_ids).await?
    };

    Ok(MergeOutcome {
        counts,
        deactivated,
    })
}
