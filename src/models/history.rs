use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::RegionType;

/// Daily market summary for a region/type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub region_id: i64,
    pub type_id: i64,
    /// Day bucket the summary covers
    pub date: DateTime<Utc>,
    pub num_orders: i64,
    pub low: Decimal,
    pub high: Decimal,
    pub average: Decimal,
    pub quantity: i64,
}

impl HistoryRecord {
    pub fn region_type(&self) -> RegionType {
        RegionType::new(self.region_id, self.type_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryUpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}
