//! Operation counters for the group engine.
//!
//! Relaxed atomics: these are statistics, not synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Counter").field(&self.get()).finish()
    }
}

/// Counters kept by the membership engine and moderation console.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub groups_created: Counter,
    pub joins_requested: Counter,
    pub joins_approved: Counter,
    pub joins_rejected: Counter,
    pub members_left: Counter,
    pub members_kicked: Counter,
    pub groups_edited: Counter,
    /// Operations that ended in a workflow error.
    pub operations_refused: Counter,
    /// Notifications the emitter did not accept.
    pub notifications_dropped: Counter,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub groups_created: u64,
    pub joins_requested: u64,
    pub joins_approved: u64,
    pub joins_rejected: u64,
    pub members_left: u64,
    pub members_kicked: u64,
    pub groups_edited: u64,
    pub operations_refused: u64,
    pub notifications_dropped: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            groups_created: self.groups_created.get(),
            joins_requested: self.joins_requested.get(),
            joins_approved: self.joins_approved.get(),
            joins_rejected: self.joins_rejected.get(),
            members_left: self.members_left.get(),
            members_kicked: self.members_kicked.get(),
            groups_edited: self.groups_edited.get(),
            operations_refused: self.operations_refused.get(),
            notifications_dropped: self.notifications_dropped.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments() {
        let c = Counter::default();
        assert_eq!(c.get(), 0);
        c.inc();
        c.inc();
        assert_eq!(c.get(), 2);
    }

    #[test]
    fn snapshot_copies_values() {
        let metrics = EngineMetrics::new();
        metrics.joins_requested.inc();
        metrics.joins_approved.inc();
        metrics.joins_requested.inc();
        let snap = metrics.snapshot();
        assert_eq!(snap.joins_requested, 2);
        assert_eq!(snap.joins_approved, 1);
        assert_eq!(snap.members_kicked, 0);
    }

    #[test]
    fn snapshot_serializes() {
        let metrics = EngineMetrics::new();
        metrics.notifications_dropped.inc();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["notifications_dropped"], 1);
    }
}
