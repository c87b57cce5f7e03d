use std::sync::atomic::{AtomicU64, Ordering};

/// Session counters, updated from the capture and processing threads and
/// readable from anywhere.
#[derive(Debug, Default)]
pub struct PipelineStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    published: AtomicU64,
    detection_errors: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames delivered by the source.
    pub captured: u64,
    /// Frames discarded by back-pressure before processing.
    pub dropped: u64,
    /// Frames that entered processing but were not published.
    pub failed: u64,
    pub published: u64,
    /// Detector failures, including ones shown without overlays.
    pub detection_errors: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_error(&self) {
        self.detection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            detection_errors: self.detection_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_stats_are_zero() {
        assert_eq!(PipelineStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters_are_independent() {
        let stats = PipelineStats::new();
        stats.record_captured();
        stats.record_captured();
        stats.record_dropped();
        stats.record_published();
        stats.record_detection_error();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                captured: 2,
                dropped: 1,
                failed: 0,
                published: 1,
                detection_errors: 1,
            }
        );
    }

    #[test]
    fn test_counts_from_many_threads() {
        let stats = Arc::new(PipelineStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        stats.record_captured();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().captured, 1000);
    }
}
