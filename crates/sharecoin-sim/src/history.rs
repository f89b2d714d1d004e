//! Rolling record of discovery times for the average block interval.

use std::collections::VecDeque;

use crate::constants::BLOCK_TIME_HISTORY;

/// Bounded queue of discovery timestamps (milliseconds since the Unix epoch).
/// The oldest entry is evicted once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct BlockTimeHistory {
    samples: VecDeque<i64>,
    capacity: usize,
}

impl Default for BlockTimeHistory {
    fn default() -> Self {
        Self::with_capacity(BLOCK_TIME_HISTORY)
    }
}

impl BlockTimeHistory {
    /// A capacity below two could never produce an interval and is raised to two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, at_ms: i64) {
        self.samples.push_back(at_ms);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean gap between consecutive samples, in seconds.
    pub fn average_interval_secs(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let total_ms: i64 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(prev, next)| next - prev)
            .sum();
        let gaps = (self.samples.len() - 1) as f64;
        Some(total_ms as f64 / gaps / 1000.0)
    }

    /// `"N/A"` below two samples, otherwise seconds with two decimals.
    pub fn format_average(&self) -> String {
        match self.average_interval_secs() {
            Some(secs) => format!("{secs:.2}"),
            None => "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_two_samples_is_na() {
        let mut history = BlockTimeHistory::default();
        assert_eq!(history.format_average(), "N/A");
        history.record(1_000);
        assert_eq!(history.average_interval_secs(), None);
        assert_eq!(history.format_average(), "N/A");
    }

    #[test]
    fn two_samples_ten_seconds_apart() {
        let mut history = BlockTimeHistory::default();
        history.record(1_000_000);
        history.record(1_010_000);
        assert_eq!(history.format_average(), "10.00");
    }

    #[test]
    fn average_over_uneven_gaps() {
        let mut history = BlockTimeHistory::default();
        for at in [0, 4_000, 6_000, 15_000] {
            history.record(at);
        }
        // (4 + 2 + 9) / 3
        assert_eq!(history.format_average(), "5.00");
    }

    #[test]
    fn oldest_sample_evicted_at_capacity() {
        let mut history = BlockTimeHistory::with_capacity(3);
        history.record(0);
        history.record(100_000);
        history.record(101_000);
        history.record(102_000);
        assert_eq!(history.len(), 3);
        // The 100s gap from the evicted sample no longer counts.
        assert_eq!(history.format_average(), "1.00");
    }

    #[test]
    fn tiny_capacity_is_raised() {
        let mut history = BlockTimeHistory::with_capacity(0);
        history.record(0);
        history.record(2_500);
        assert_eq!(history.format_average(), "2.50");
    }
}
