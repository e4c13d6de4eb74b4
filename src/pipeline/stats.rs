use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for pipeline throughput monitoring
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Frames accepted into the queue
    pub frames_submitted: AtomicU64,
    /// Frames refused because the queue was full
    pub frames_dropped: AtomicU64,
    /// Frames that ran to an outcome
    pub frames_processed: AtomicU64,
    /// Outcomes that carried a card
    pub cards_recognized: AtomicU64,
    /// Frames stopped at the suit gate
    pub suit_rejections: AtomicU64,
    /// Frames stopped at the rank gate
    pub rank_rejections: AtomicU64,
    /// Rank classifier invocations
    pub rank_invocations: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics as a snapshot
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            cards_recognized: self.cards_recognized.load(Ordering::Relaxed),
            suit_rejections: self.suit_rejections.load(Ordering::Relaxed),
            rank_rejections: self.rank_rejections.load(Ordering::Relaxed),
            rank_invocations: self.rank_invocations.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStatsSnapshot {
    pub frames_submitted: u64,
    pub frames_dropped: u64,
    pub frames_processed: u64,
    pub cards_recognized: u64,
    pub suit_rejections: u64,
    pub rank_rejections: u64,
    pub rank_invocations: u64,
}

impl PipelineStatsSnapshot {
    /// Share of processed frames that produced a card
    pub fn recognition_rate(&self) -> f64 {
        if self.frames_processed == 0 {
            0.0
        } else {
            self.cards_recognized as f64 / self.frames_processed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = PipelineStats::new();
        assert_eq!(stats.snapshot().recognition_rate(), 0.0);

        for _ in 0..4 {
            PipelineStats::bump(&stats.frames_processed);
        }
        PipelineStats::bump(&stats.cards_recognized);
        PipelineStats::bump(&stats.frames_dropped);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_processed, 4);
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.recognition_rate(), 0.25);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let stats = PipelineStats::new();
        PipelineStats::bump(&stats.rank_invocations);

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["rank_invocations"], 1);
        assert_eq!(json["cards_recognized"], 0);
    }
}
