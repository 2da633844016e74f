//! Interval counters persisted to market_data_emdrstats
//!
//! Every pipeline stage bumps these through a shared `Arc<EmdrMetrics>`.
//! The flush job drains them with [`EmdrMetrics::snapshot_and_reset`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::status::StatusCode;

const COUNTERS: usize = StatusCode::ALL.len();

/// Counter values taken at one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    counts: [u64; COUNTERS],
}

impl MetricsSnapshot {
    pub fn get(&self, status: StatusCode) -> u64 {
        self.counts[status.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatusCode, u64)> + '_ {
        StatusCode::ALL.iter().map(|s| (*s, self.counts[s.index()]))
    }
}

#[derive(Debug, Default)]
pub struct EmdrMetrics {
    counts: Mutex<[u64; COUNTERS]>,
}

impl EmdrMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, status: StatusCode) {
        self.add(status, 1);
    }

    pub fn add(&self, status: StatusCode, n: u64) {
        if n == 0 {
            return;
        }
        let mut counts = self.counts.lock();
        counts[status.index()] = counts[status.index()].saturating_add(n);
    }

    pub fn get(&self, status: StatusCode) -> u64 {
        self.counts.lock()[status.index()]
    }

    /// Take every counter and zero it under one lock
    pub fn snapshot_and_reset(&self) -> MetricsSnapshot {
        let counts = std::mem::take(&mut *self.counts.lock());
        MetricsSnapshot { counts }
    }

    /// Put back a count that could not be persisted so the next flush
    /// retries it
    pub fn restore(&self, status: StatusCode, n: u64) {
        self.add(status, n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = EmdrMetrics::new();
        metrics.incr(StatusCode::OrderMessages);
        metrics.incr(StatusCode::OrderMessages);
        metrics.add(StatusCode::OrderInserts, 40);

        let snapshot = metrics.snapshot_and_reset();

        assert_eq!(snapshot.get(StatusCode::OrderMessages), 2);
        assert_eq!(snapshot.get(StatusCode::OrderInserts), 40);
        assert_eq!(snapshot.get(StatusCode::HistoryUpdates), 0);
        for status in StatusCode::ALL {
            assert_eq!(metrics.get(status), 0);
        }
    }

    #[test]
    fn test_restore_carries_into_next_snapshot() {
        let metrics = EmdrMetrics::new();
        metrics.add(StatusCode::HistoryUpdates, 7);

        let first = metrics.snapshot_and_reset();
        metrics.restore(StatusCode::HistoryUpdates, first.get(StatusCode::HistoryUpdates));
        metrics.incr(StatusCode::HistoryUpdates);

        assert_eq!(metrics.snapshot_and_reset().get(StatusCode::HistoryUpdates), 8);
    }

    #[test]
    fn test_snapshot_iterates_in_code_order() {
        let metrics = EmdrMetrics::new();
        metrics.incr(StatusCode::EmptyOrderMessages);

        let codes: Vec<i16> = metrics
            .snapshot_and_reset()
            .iter()
            .map(|(s, _)| s.code())
            .collect();

        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
