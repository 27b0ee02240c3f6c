// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Telemetry aggregation - latency history and detection rate

mod latency;
mod window;

pub use latency::LatencyRing;
pub use window::RateWindow;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::TelemetryConfig;

/// Percentile reported as `p95_latency_ms`
const P95: f64 = 0.95;

/// Rolling performance figures for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    /// Literal rolling sum over the window, not normalised to a rate
    pub detections_per_minute: f64,
    pub total_frames: u64,
    /// Oldest first
    pub latency_history: Vec<f64>,
}

/// Latency ring buffer plus detection-count window
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    latencies: LatencyRing,
    detections: RateWindow,
    total_frames: u64,
}

impl TelemetryAggregator {
    pub fn new(latency_capacity: usize, window: Duration) -> Self {
        Self {
            latencies: LatencyRing::new(latency_capacity),
            detections: RateWindow::new(window),
            total_frames: 0,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(
            config.latency_capacity,
            Duration::milliseconds(config.rate_window_ms as i64),
        )
    }

    pub fn record_latency(&mut self, ms: f64) {
        if !ms.is_finite() || ms < 0.0 {
            warn!("Ignoring invalid latency sample {}", ms);
            return;
        }
        self.latencies.push(ms);
    }

    pub fn record_detections(&mut self, count: usize, now: DateTime<Utc>) {
        self.detections.record(count, now);
    }

    /// Count one successful inference
    pub fn record_frame(&mut self) {
        self.total_frames += 1;
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn latency_len(&self) -> usize {
        self.latencies.len()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionStats {
        SessionStats {
            avg_latency_ms: self.latencies.mean(),
            p95_latency_ms: self.latencies.percentile(P95),
            detections_per_minute: self.detections.sum(now) as f64,
            total_frames: self.total_frames,
            latency_history: self.latencies.history(),
        }
    }
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_average_over_last_60() {
        let mut agg = TelemetryAggregator::default();
        for i in 0..100 {
            agg.record_latency(i as f64);
        }
        let stats = agg.snapshot(t0());
        assert_eq!(stats.latency_history.len(), 60);
        // samples 40..=99
        let expected = (40..100).sum::<i32>() as f64 / 60.0;
        assert!((stats.avg_latency_ms - expected).abs() < 1e-9);
        assert_eq!(stats.latency_history[0], 40.0);
    }

    #[test]
    fn test_p95_on_ascending_buffer() {
        let mut agg = TelemetryAggregator::default();
        for i in 1..=60 {
            agg.record_latency(i as f64 * 10.0);
        }
        assert_eq!(agg.snapshot(t0()).p95_latency_ms, 580.0);
    }

    #[test]
    fn test_detection_window_expires() {
        let mut agg = TelemetryAggregator::default();
        agg.record_detections(3, t0());
        assert_eq!(agg.snapshot(t0()).detections_per_minute, 3.0);
        assert_eq!(
            agg.snapshot(t0() + Duration::seconds(61)).detections_per_minute,
            0.0
        );
    }

    #[test]
    fn test_empty_snapshot_is_zero() {
        let stats = TelemetryAggregator::default().snapshot(t0());
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn test_invalid_latency_ignored() {
        let mut agg = TelemetryAggregator::default();
        agg.record_latency(f64::NAN);
        agg.record_latency(-1.0);
        agg.record_latency(12.0);
        assert_eq!(agg.latency_len(), 1);
    }

    #[test]
    fn test_frames_count_independently_of_latency() {
        let mut agg = TelemetryAggregator::default();
        for _ in 0..75 {
            agg.record_latency(5.0);
            agg.record_frame();
        }
        let stats = agg.snapshot(t0());
        assert_eq!(stats.total_frames, 75);
        assert_eq!(stats.latency_history.len(), 60);
    }
}
