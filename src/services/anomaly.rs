//! Suspicious order detection
//!
//! An order is suspicious when it sits more than `k` standard deviations
//! from the mean of the live, trusted orders of its region/type AND on the
//! side of the mean that costs its owner money: a bid above the mean or an
//! ask below it. Cheap bids and expensive asks are never flagged.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::order::OrderRecord;

/// Groups with this many comparison orders or fewer are never flagged
pub const MIN_COMPARISON_ORDERS: i64 = 5;

/// Price statistics of the active, non-suspicious orders of a region/type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub count: i64,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyEvaluator {
    rejection_multiplier: f64,
}

impl AnomalyEvaluator {
    pub fn new(rejection_multiplier: f64) -> Self {
        Self {
            rejection_multiplier,
        }
    }

    pub fn rejection_multiplier(&self) -> f64 {
        self.rejection_multiplier
    }

    pub fn is_suspicious(&self, stats: &ComparisonStats, price: f64, is_bid: bool) -> bool {
        if stats.count <= MIN_COMPARISON_ORDERS {
            return false;
        }
        let Some(mean) = stats.mean else {
            return false;
        };

        let threshold = self.rejection_multiplier * stats.std_dev.unwrap_or(0.0);
        if price > mean {
            price - mean > threshold && is_bid
        } else {
            mean - price > threshold && !is_bid
        }
    }

    /// Set `is_suspicious` on every order of one group.
    /// Returns true if any order was flagged.
    pub fn evaluate(&self, stats: &ComparisonStats, orders: &mut [OrderRecord]) -> bool {
        let mut has_suspicious = false;
        for order in orders.iter_mut() {
            let price = order.price.to_f64().unwrap_or(0.0);
            order.is_suspicious = self.is_suspicious(stats, price, order.is_bid);
            has_suspicious |= order.is_suspicious;
        }
        has_suspicious
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(count: i64) -> ComparisonStats {
        ComparisonStats {
            count,
            mean: Some(100.0),
            std_dev: Some(10.0),
        }
    }

    #[test]
    fn test_asymmetric_outlier_rule() {
        let evaluator = AnomalyEvaluator::new(3.0);
        let stats = stats(20);

        assert!(evaluator.is_suspicious(&stats, 135.0, true));
        assert!(!evaluator.is_suspicious(&stats, 135.0, false));
        assert!(evaluator.is_suspicious(&stats, 65.0, false));
        assert!(!evaluator.is_suspicious(&stats, 65.0, true));
    }

    #[test]
    fn test_within_band_is_never_flagged() {
        let evaluator = AnomalyEvaluator::new(3.0);
        let stats = stats(20);

        assert!(!evaluator.is_suspicious(&stats, 130.0, true));
        assert!(!evaluator.is_suspicious(&stats, 70.0, false));
        assert!(!evaluator.is_suspicious(&stats, 100.0, false));
    }

    #[test]
    fn test_insufficient_sample() {
        let evaluator = AnomalyEvaluator::new(3.0);

        assert!(!evaluator.is_suspicious(&stats(3), 1_000_000.0, true));
        assert!(!evaluator.is_suspicious(&stats(MIN_COMPARISON_ORDERS), 0.01, false));
        assert!(evaluator.is_suspicious(&stats(MIN_COMPARISON_ORDERS + 1), 0.01, false));
    }

    #[test]
    fn test_zero_std_dev_flags_any_deviation_on_the_costly_side() {
        let evaluator = AnomalyEvaluator::new(3.0);
        let stats = ComparisonStats {
            count: 10,
            mean: Some(100.0),
            std_dev: Some(0.0),
        };

        assert!(evaluator.is_suspicious(&stats, 100.5, true));
        assert!(!evaluator.is_suspicious(&stats, 100.0, true));
    }
}
