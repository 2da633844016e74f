//! Rate counters for the periodic status report. Not persisted.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputSnapshot {
    pub messages: u64,
    pub order_messages: u64,
    pub history_messages: u64,
    pub order_upserts: u64,
    pub history_upserts: u64,
    pub decode_errors: u64,
}

#[derive(Debug, Default)]
pub struct Throughput {
    messages: AtomicU64,
    order_messages: AtomicU64,
    history_messages: AtomicU64,
    order_upserts: AtomicU64,
    history_upserts: AtomicU64,
    decode_errors: AtomicU64,
}

impl Throughput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn order_message(&self) {
        self.order_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn history_message(&self) {
        self.history_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn order_upserts(&self, n: u64) {
        self.order_upserts.fetch_add(n, Ordering::Relaxed);
    }

    pub fn history_upserts(&self, n: u64) {
        self.history_upserts.fetch_add(n, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and zero every counter
    pub fn take(&self) -> ThroughputSnapshot {
        ThroughputSnapshot {
            messages: self.messages.swap(0, Ordering::Relaxed),
            order_messages: self.order_messages.swap(0, Ordering::Relaxed),
            history_messages: self.history_messages.swap(0, Ordering::Relaxed),
            order_upserts: self.order_upserts.swap(0, Ordering::Relaxed),
            history_upserts: self.history_upserts.swap(0, Ordering::Relaxed),
            decode_errors: self.decode_errors.swap(0, Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_resets() {
        let throughput = Throughput::new();
        throughput.message();
        throughput.message();
        throughput.order_upserts(12);
        throughput.decode_error();

        let first = throughput.take();
        assert_eq!(first.messages, 2);
        assert_eq!(first.order_upserts, 12);
        assert_eq!(first.decode_errors, 1);

        assert_eq!(throughput.take(), ThroughputSnapshot::default());
    }
}
