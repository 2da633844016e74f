use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Grouping key for order statistics and anomaly thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionType {
    pub region_id: i64,
    pub type_id: i64,
}

impl RegionType {
    pub fn new(region_id: i64, type_id: i64) -> Self {
        Self { region_id, type_id }
    }
}

impl std::fmt::Display for RegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region_id, self.type_id)
    }
}

/// A single market order as reported by an uploader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: i64,
    pub region_id: i64,
    pub type_id: i64,
    pub station_id: i64,
    pub solar_system_id: i64,
    pub price: Decimal,
    pub volume_remaining: i64,
    pub volume_entered: i64,
    pub min_volume: i64,
    pub range: i32,
    pub is_bid: bool,
    pub issue_date: DateTime<Utc>,
    pub duration: i32,
    /// Time the source snapshot was taken
    pub generated_at: DateTime<Utc>,
    pub is_suspicious: bool,
    pub uploader_hash: String,
    pub is_active: bool,
}

impl OrderRecord {
    pub fn region_type(&self) -> RegionType {
        RegionType::new(self.region_id, self.type_id)
    }
}

/// The slice of an active order the region statistics need
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub price: f64,
    pub is_bid: bool,
    pub volume_remaining: i64,
}

/// Rows touched by one order upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderUpsertCounts {
    pub inserted: u64,
    /// Existing rows superseded by a newer snapshot
    pub updated: u64,
    /// Received rows that were not newer than the stored one
    pub stale: u64,
}
