//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe, shared between workers through an `Arc`

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    messages_received: AtomicU64,
    messages_acked: AtomicU64,
    messages_requeued: AtomicU64,
    messages_dead_lettered: AtomicU64,
    documents_indexed: AtomicU64,
    documents_deleted: AtomicU64,
    fanout_queries: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Message metrics

    /// Increment deliveries taken off the queue
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment acknowledged deliveries
    pub fn increment_acked(&self) {
        self.messages_acked.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment deliveries sent to the retry exchange
    pub fn increment_requeued(&self) {
        self.messages_requeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment deliveries sent to the failed exchange
    pub fn increment_dead_lettered(&self) {
        self.messages_dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    // Index metrics

    /// Increment documents written to the sink
    pub fn add_documents_indexed(&self, count: u64) {
        self.documents_indexed.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment documents removed from the sink
    pub fn increment_documents_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment projection queries issued during fan-out
    pub fn add_fanout_queries(&self, count: u64) {
        self.fanout_queries.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_acked: self.messages_acked.load(Ordering::Relaxed),
            messages_requeued: self.messages_requeued.load(Ordering::Relaxed),
            messages_dead_lettered: self.messages_dead_lettered.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            fanout_queries: self.fanout_queries.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_acked: u64,
    pub messages_requeued: u64,
    pub messages_dead_lettered: u64,
    pub documents_indexed: u64,
    pub documents_deleted: u64,
    pub fanout_queries: u64,
}
