// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Fixed-capacity latency ring buffer

use std::collections::VecDeque;

/// FIFO of the most recent latency samples (milliseconds)
#[derive(Debug, Clone)]
pub struct LatencyRing {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest once full
    pub fn push(&mut self, ms: f64) {
        self.samples.push_back(ms);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean, zero when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Nearest-rank percentile: `sorted[floor(p * n)]`, zero when empty.
    ///
    /// `p` is a fraction in `[0, 1]`. The index is clamped so `p = 1.0`
    /// returns the maximum.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        // stable, so equal samples keep arrival order
        sorted.sort_by(|a, b| a.total_cmp(b));

        let index = (p.clamp(0.0, 1.0) * sorted.len() as f64).floor() as usize;
        sorted[index.min(sorted.len() - 1)]
    }

    /// Samples oldest first
    pub fn history(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut ring = LatencyRing::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            ring.push(v);
        }
        assert_eq!(ring.history(), vec![2.0, 3.0, 4.0]);
        assert_eq!(ring.mean(), 3.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let mut ring = LatencyRing::new(60);
        // pushed out of order to make sure sorting happens
        for i in (1..=60).rev() {
            ring.push(i as f64 * 10.0);
        }
        assert_eq!(ring.percentile(0.95), 580.0);
        assert_eq!(ring.percentile(0.0), 10.0);
        assert_eq!(ring.percentile(1.0), 600.0);
    }

    #[test]
    fn test_empty_is_zero() {
        let ring = LatencyRing::new(60);
        assert_eq!(ring.mean(), 0.0);
        assert_eq!(ring.percentile(0.95), 0.0);
    }
}
