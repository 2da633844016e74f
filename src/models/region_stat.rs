use serde::{Deserialize, Serialize};

use super::order::RegionType;

/// Band-passed statistics for one side of the book
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideStat {
    pub mean: f64,
    pub weighted_average: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Upper band edge (95th percentile of the raw prices)
    pub percentile_95: f64,
    /// Remaining volume of the in-band orders
    pub volume: i64,
}

impl SideStat {
    /// Replace every NaN with zero so nothing undefined reaches the store
    pub fn sanitized(self) -> Self {
        fn clean(v: f64) -> f64 {
            if v.is_nan() { 0.0 } else { v }
        }

        Self {
            mean: clean(self.mean),
            weighted_average: clean(self.weighted_average),
            median: clean(self.median),
            std_dev: clean(self.std_dev),
            percentile_95: clean(self.percentile_95),
            volume: self.volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionItemStat {
    pub region_type: RegionType,
    pub bid: SideStat,
    pub ask: SideStat,
}
