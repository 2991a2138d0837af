use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for store activity, readable without locking the topic map.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Inbound frames parsed and applied
    pub updates_applied: AtomicU64,
    /// Inbound frames dropped because they failed to parse
    pub malformed_dropped: AtomicU64,
    /// Entries seeded from a configuration snapshot
    pub bootstrap_writes: AtomicU64,
    /// Local writes via `set`
    pub local_publishes: AtomicU64,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current statistics as a snapshot
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            bootstrap_writes: self.bootstrap_writes.load(Ordering::Relaxed),
            local_publishes: self.local_publishes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub updates_applied: u64,
    pub malformed_dropped: u64,
    pub bootstrap_writes: u64,
    pub local_publishes: u64,
}
