//! Per-stage concurrency bounds with in-flight gauges

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Decoded messages whose batch task has not finished
    Messages,
    StdDev,
    Orders,
    Statistics,
    History,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Messages => "messages",
            Stage::StdDev => "std_dev",
            Stage::Orders => "orders",
            Stage::Statistics => "statistics",
            Stage::History => "history",
        }
    }
}

/// Bounds the outstanding work of one stage
#[derive(Debug)]
pub struct StageLimiter {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
}

impl StageLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a permit. The gauge counts the call from the moment it
    /// queues until the returned guard drops.
    pub async fn enter(&self) -> StageGuard {
        self.waiting.fetch_add(1, Ordering::Relaxed);
        let gauge = GaugeGuard(self.waiting.clone());
        // The semaphore is never closed
        let permit = self.permits.clone().acquire_owned().await.ok();

        StageGuard {
            _permit: permit,
            _gauge: gauge,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct GaugeGuard(Arc<AtomicUsize>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct StageGuard {
    _permit: Option<OwnedSemaphorePermit>,
    _gauge: GaugeGuard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogSnapshot {
    pub messages: usize,
    pub std_dev: usize,
    pub orders: usize,
    pub statistics: usize,
    pub history: usize,
}

#[derive(Debug)]
pub struct Backlog {
    messages: StageLimiter,
    std_dev: StageLimiter,
    orders: StageLimiter,
    statistics: StageLimiter,
    history: StageLimiter,
}

impl Backlog {
    /// The store stages share `max_concurrent`; `max_in_flight_messages`
    /// bounds how many decoded batches may be spawned at once.
    pub fn new(max_concurrent: usize, max_in_flight_messages: usize) -> Self {
        Self {
            messages: StageLimiter::new(max_in_flight_messages),
            std_dev: StageLimiter::new(max_concurrent),
            orders: StageLimiter::new(max_concurrent),
            statistics: StageLimiter::new(max_concurrent),
            history: StageLimiter::new(max_concurrent),
        }
    }

    pub fn stage(&self, stage: Stage) -> &StageLimiter {
        match stage {
            Stage::Messages => &self.messages,
            Stage::StdDev => &self.std_dev,
            Stage::Orders => &self.orders,
            Stage::Statistics => &self.statistics,
            Stage::History => &self.history,
        }
    }

    pub async fn enter(&self, stage: Stage) -> StageGuard {
        self.stage(stage).enter().await
    }

    pub fn snapshot(&self) -> BacklogSnapshot {
        BacklogSnapshot {
            messages: self.messages.in_flight(),
            std_dev: self.std_dev.in_flight(),
            orders: self.orders.in_flight(),
            statistics: self.statistics.in_flight(),
            history: self.history.in_flight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_gauge_follows_guards() {
        let backlog = Backlog::new(4, 8);

        let a = backlog.enter(Stage::Orders).await;
        let b = backlog.enter(Stage::Orders).await;
        let c = backlog.enter(Stage::History).await;
        let d = backlog.enter(Stage::Messages).await;

        let snapshot = backlog.snapshot();
        assert_eq!(snapshot.messages, 1);
        assert_eq!(snapshot.orders, 2);
        assert_eq!(snapshot.history, 1);
        assert_eq!(snapshot.std_dev, 0);

        drop(a);
        drop(c);
        drop(d);
        assert_eq!(backlog.snapshot().orders, 1);
        assert_eq!(backlog.snapshot().history, 0);
        drop(b);
        assert_eq!(backlog.snapshot(), BacklogSnapshot::default());
    }

    #[tokio::test]
    async fn test_limiter_bounds_concurrency() {
        let limiter = Arc::new(StageLimiter::new(1));
        let held = limiter.enter().await;

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _guard = limiter.enter().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(limiter.in_flight(), 2);

        drop(held);
        waiter.await.unwrap();
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_message_limit_is_separate_from_store_stages() {
        let backlog = Backlog::new(4, 1);
        let held = backlog.enter(Stage::Messages).await;

        // Store stages are unaffected by a saturated message limit
        let _orders = backlog.enter(Stage::Orders).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(20), backlog.enter(Stage::Messages)).await;
        assert!(blocked.is_err());

        drop(held);
        let _next = backlog.enter(Stage::Messages).await;
        assert_eq!(backlog.snapshot().messages, 1);
    }
}
