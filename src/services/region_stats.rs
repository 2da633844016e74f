//! Region statistics aggregation, run after every successful order merge

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::order::{OrderQuote, RegionType};
use crate::models::region_stat::RegionItemStat;
use crate::services::market_store::{day_bucket, MarketStore};
use crate::services::price_stats::side_stat;

/// Build the statistics row for `pair`, or `None` when either side of the
/// book has no active orders
pub fn compute_region_stat(pair: RegionType, quotes: &[OrderQuote]) -> Option<RegionItemStat> {
    let (bids, asks): (Vec<OrderQuote>, Vec<OrderQuote>) =
        quotes.iter().copied().partition(|q| q.is_bid);

    if bids.is_empty() || asks.is_empty() {
        return None;
    }

    Some(RegionItemStat {
        region_type: pair,
        bid: side_stat(&bids).sanitized(),
        ask: side_stat(&asks).sanitized(),
    })
}

/// Write `stat` to the day bucket of `now`, then to the latest row
pub async fn persist_region_stat(
    store: &dyn MarketStore,
    stat: &RegionItemStat,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    store
        .upsert_region_stat_history(stat, day_bucket(now), now)
        .await?;
    store.upsert_region_stat(stat).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, is_bid: bool, volume_remaining: i64) -> OrderQuote {
        OrderQuote {
            price,
            is_bid,
            volume_remaining,
        }
    }

    #[test]
    fn test_missing_side_yields_nothing() {
        let pair = RegionType::new(10000002, 34);
        let bids_only = [quote(5.0, true, 10), quote(6.0, true, 10)];

        assert!(compute_region_stat(pair, &bids_only).is_none());
        assert!(compute_region_stat(pair, &[]).is_none());
    }

    #[test]
    fn test_sides_are_computed_independently() {
        let pair = RegionType::new(10000002, 34);
        let quotes = [
            quote(5.0, true, 10),
            quote(5.0, true, 10),
            quote(9.0, false, 2),
            quote(9.0, false, 2),
        ];

        let stat = compute_region_stat(pair, &quotes).unwrap();

        assert_eq!(stat.region_type, pair);
        assert_eq!(stat.bid.mean, 5.0);
        assert_eq!(stat.bid.volume, 20);
        assert_eq!(stat.ask.mean, 9.0);
        assert_eq!(stat.ask.weighted_average, 9.0);
        assert_eq!(stat.ask.volume, 4);
    }

    #[test]
    fn test_zero_volume_side_is_sanitized() {
        let pair = RegionType::new(10000002, 34);
        let quotes = [quote(5.0, true, 0), quote(9.0, false, 3)];

        let stat = compute_region_stat(pair, &quotes).unwrap();

        assert_eq!(stat.bid.weighted_average, 0.0);
        assert_eq!(stat.bid.volume, 0);
        assert_eq!(stat.ask.weighted_average, 9.0);
    }
}
