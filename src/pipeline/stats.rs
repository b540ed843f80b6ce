//! Pipeline statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the pipeline loops
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_captured: AtomicU64,
    capture_failures: AtomicU64,
    frames_dropped: AtomicU64,
    frames_processed: AtomicU64,
    broadcasts: AtomicU64,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames successfully captured and enqueued
    pub frames_captured: u64,
    /// Acquisition cycles skipped on capture failure or timeout
    pub capture_failures: u64,
    /// Frames evicted from a full queue
    pub frames_dropped: u64,
    /// Frames compared against the previous-frame reference
    pub frames_processed: u64,
    /// Motion events broadcast to subscribers
    pub broadcasts: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn record_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_zeroed() {
        let stats = PipelineStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = PipelineStats::new();

        stats.record_captured();
        stats.record_captured();
        stats.record_capture_failure();
        stats.record_dropped();
        stats.record_processed();
        stats.record_broadcast();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_captured, 2);
        assert_eq!(snapshot.capture_failures, 1);
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.frames_processed, 1);
        assert_eq!(snapshot.broadcasts, 1);
    }
}
