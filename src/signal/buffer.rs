// SampleBuffer - bounded raw/smoothed ring buffers with moving-average smoothing
//
// Holds the last W raw samples and, in lock-step, one smoothed value per raw
// sample. Smoothing keeps a running sum over the last K raw samples so each
// push is O(1) regardless of K.
//
// Warm-up: while fewer than K samples have been pushed in total, the smoothed
// value is the raw sample itself.

use std::collections::VecDeque;

/// Default display window (W)
pub const DEFAULT_DISPLAY_WINDOW: usize = 200;
/// Default moving-average window (K)
pub const DEFAULT_AVERAGING_WINDOW: usize = 20;

/// Raw EMG reading as received on the wire
pub type RawSample = i32;

/// Consistent copy of both series taken at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSnapshot {
    pub raw: Vec<RawSample>,
    pub smoothed: Vec<f64>,
    /// Samples pushed since creation, including evicted ones
    pub total_pushed: u64,
}

impl SignalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn latest_smoothed(&self) -> Option<f64> {
        self.smoothed.last().copied()
    }
}

/// Bounded, insertion-ordered sample buffer with its smoothed companion
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    raw: VecDeque<RawSample>,
    smoothed: VecDeque<f64>,
    /// Last K raw samples, oldest first
    tail: VecDeque<RawSample>,
    tail_sum: i64,
    capacity: usize,
    averaging_window: usize,
    total_pushed: u64,
}

impl SampleBuffer {
    /// Create an empty buffer
    ///
    /// # Arguments
    /// * `capacity` - Display window W (samples retained)
    /// * `averaging_window` - Moving-average window K
    ///
    /// # Panics
    /// Panics if either size is 0 or if `averaging_window > capacity`.
    /// `AppConfig::validate` rejects those configurations first.
    pub fn new(capacity: usize, averaging_window: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        assert!(averaging_window > 0, "averaging_window must be greater than 0");
        assert!(
            averaging_window <= capacity,
            "averaging_window must not exceed capacity"
        );

        Self {
            raw: VecDeque::with_capacity(capacity),
            smoothed: VecDeque::with_capacity(capacity),
            tail: VecDeque::with_capacity(averaging_window),
            tail_sum: 0,
            capacity,
            averaging_window,
            total_pushed: 0,
        }
    }

    /// Append a raw sample and its smoothed value, evicting the oldest
    /// entries once the buffer is full
    ///
    /// # Returns
    /// The smoothed value appended for this sample
    pub fn push(&mut self, sample: RawSample) -> f64 {
        if self.tail.len() == self.averaging_window {
            if let Some(old) = self.tail.pop_front() {
                self.tail_sum -= i64::from(old);
            }
        }
        self.tail.push_back(sample);
        self.tail_sum += i64::from(sample);
        self.total_pushed += 1;

        let smoothed = if self.total_pushed < self.averaging_window as u64 {
            f64::from(sample)
        } else {
            self.tail_sum as f64 / self.averaging_window as f64
        };

        if self.raw.len() == self.capacity {
            self.raw.pop_front();
            self.smoothed.pop_front();
        }
        self.raw.push_back(sample);
        self.smoothed.push_back(smoothed);

        smoothed
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn averaging_window(&self) -> usize {
        self.averaging_window
    }

    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn latest_smoothed(&self) -> Option<f64> {
        self.smoothed.back().copied()
    }

    pub fn raw(&self) -> impl Iterator<Item = RawSample> + '_ {
        self.raw.iter().copied()
    }

    pub fn smoothed(&self) -> impl Iterator<Item = f64> + '_ {
        self.smoothed.iter().copied()
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            raw: self.raw.iter().copied().collect(),
            smoothed: self.smoothed.iter().copied().collect(),
            total_pushed: self.total_pushed,
        }
    }

    /// Drop all samples and restart warm-up
    pub fn clear(&mut self) {
        self.raw.clear();
        self.smoothed.clear();
        self.tail.clear();
        self.tail_sum = 0;
        self.total_pushed = 0;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_WINDOW, DEFAULT_AVERAGING_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[RawSample]) -> f64 {
        values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = SampleBuffer::new(10, 3);
        for i in 0..100 {
            buffer.push(i);
            assert!(buffer.len() <= 10, "len {} exceeded capacity", buffer.len());
            assert_eq!(buffer.raw().count(), buffer.smoothed().count());
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.total_pushed(), 100);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = SampleBuffer::new(4, 1);
        for sample in [10, 20, 30, 40, 50, 60] {
            buffer.push(sample);
        }
        let raw: Vec<RawSample> = buffer.raw().collect();
        assert_eq!(raw, vec![30, 40, 50, 60], "oldest samples must go first");
    }

    #[test]
    fn test_warm_up_returns_raw_sample() {
        let mut buffer = SampleBuffer::new(50, 5);
        for (i, sample) in [300, 304, 310, 302].into_iter().enumerate() {
            let smoothed = buffer.push(sample);
            assert_eq!(
                smoothed,
                f64::from(sample),
                "sample {} is before warm-up completes",
                i
            );
        }
    }

    #[test]
    fn test_mean_of_last_k_after_warm_up() {
        let k = 5;
        let mut buffer = SampleBuffer::new(30, k);
        let samples: Vec<RawSample> = (0..60).map(|i| 300 + (i * 7) % 13).collect();

        for (i, &sample) in samples.iter().enumerate() {
            let smoothed = buffer.push(sample);
            let expected = if i + 1 < k {
                f64::from(sample)
            } else {
                mean(&samples[i + 1 - k..=i])
            };
            assert!(
                (smoothed - expected).abs() < 1e-9,
                "sample {}: expected {}, got {}",
                i,
                expected,
                smoothed
            );
            assert_eq!(buffer.latest_smoothed(), Some(smoothed));
        }
    }

    #[test]
    fn test_k_equals_one_tracks_raw() {
        let mut buffer = SampleBuffer::new(8, 1);
        for sample in [5, 9, 2, 7] {
            assert_eq!(buffer.push(sample), f64::from(sample));
        }
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let mut buffer = SampleBuffer::new(3, 2);
        buffer.push(1);
        buffer.push(3);
        buffer.push(5);
        buffer.push(7);

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.raw, vec![3, 5, 7]);
        assert_eq!(snapshot.smoothed, vec![2.0, 4.0, 6.0]);
        assert_eq!(snapshot.total_pushed, 4);
        assert_eq!(snapshot.latest_smoothed(), Some(6.0));
    }

    #[test]
    fn test_clear_restarts_warm_up() {
        let mut buffer = SampleBuffer::new(10, 3);
        for sample in [10, 20, 30, 40] {
            buffer.push(sample);
        }
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(99), 99.0);
    }

    #[test]
    #[should_panic(expected = "averaging_window must not exceed capacity")]
    fn test_averaging_wider_than_capacity_panics() {
        SampleBuffer::new(5, 6);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        SampleBuffer::new(0, 1);
    }

    #[test]
    fn test_default_constants() {
        let buffer = SampleBuffer::default();
        assert_eq!(buffer.capacity(), DEFAULT_DISPLAY_WINDOW);
        assert_eq!(buffer.averaging_window(), DEFAULT_AVERAGING_WINDOW);
    }
}
