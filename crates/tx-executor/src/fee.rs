use std::collections::VecDeque;

/// Minimum priority-fee bid regardless of observed network conditions (§4.E, §9).
pub const MIN_PRIORITY_FEE_MICROLAMPORTS: u64 = 10_000;

const HISTORY_LEN: usize = 20;

/// Tracks the last [`HISTORY_LEN`] observed per-transaction priority fees and
/// derives a bid as their median, floored at [`MIN_PRIORITY_FEE_MICROLAMPORTS`]
/// (§9 Open Question, decided in favor of the simplest percentile that still
/// reacts to contention).
#[derive(Debug, Default)]
pub struct PriorityFeeTracker {
    recent: VecDeque<u64>,
}

impl PriorityFeeTracker {
    pub fn new() -> Self {
        Self {
            recent: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn observe(&mut self, fee_microlamports: u64) {
        if self.recent.len() == HISTORY_LEN {
            self.recent.pop_front();
        }
        self.recent.push_back(fee_microlamports);
    }

    pub fn estimate(&self) -> u64 {
        if self.recent.is_empty() {
            return MIN_PRIORITY_FEE_MICROLAMPORTS;
        }
        let mut sorted: Vec<u64> = self.recent.iter().copied().collect();
        sorted.sort_unstable();
        let median = sorted[sorted.len() / 2];
        median.max(MIN_PRIORITY_FEE_MICROLAMPORTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_returns_floor() {
        let tracker = PriorityFeeTracker::new();
        assert_eq!(tracker.estimate(), MIN_PRIORITY_FEE_MICROLAMPORTS);
    }

    #[test]
    fn median_rises_above_floor_under_contention() {
        let mut tracker = PriorityFeeTracker::new();
        for fee in [50_000, 60_000, 70_000, 80_000, 90_000] {
            tracker.observe(fee);
        }
        assert_eq!(tracker.estimate(), 70_000);
    }

    #[test]
    fn history_is_capped_and_drops_oldest() {
        let mut tracker = PriorityFeeTracker::new();
        for _ in 0..HISTORY_LEN {
            tracker.observe(100_000);
        }
        tracker.observe(0);
        // A single very low observation can't swamp 19 high ones.
        assert_eq!(tracker.estimate(), 100_000);
    }

    #[test]
    fn low_fees_never_drop_below_floor() {
        let mut tracker = PriorityFeeTracker::new();
        for _ in 0..5 {
            tracker.observe(100);
        }
        assert_eq!(tracker.estimate(), MIN_PRIORITY_FEE_MICROLAMPORTS);
    }
}
