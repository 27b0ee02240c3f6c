// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use serde::Serialize;
use chrono::{DateTime, Utc};

use super::StreamState;
use crate::device::{AlarmStatus, HealthStatus};
use crate::error::ConsoleError;
use crate::events::DetectionEvent;
use crate::telemetry::SessionStats;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Stats,
    Detection,
    Health,
    Alarm,
    Stream,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: ConsoleEvent,
}

#[derive(Debug, Clone, Serialize)]
pub enum ConsoleEvent {
    StatsUpdated(SessionStats),
    Detection(DetectionEvent),
    HealthUpdated(HealthStatus),
    HealthDegraded { reason: String },
    AlarmUpdated(AlarmStatus),
    StreamStateChanged(StreamState),
    CycleFailed { code: &'static str, message: String },
    Error { code: &'static str, message: String },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    stats_tx: broadcast::Sender<SessionStats>,
    detection_tx: broadcast::Sender<DetectionEvent>,
    frame_tx: broadcast::Sender<Arc<[u8]>>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (stats_tx, _) = broadcast::channel(capacity);
        let (detection_tx, _) = broadcast::channel(capacity);
        // frames are large and only the newest matters
        let (frame_tx, _) = broadcast::channel(4);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            stats_tx,
            detection_tx,
            frame_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_stats(&self, stats: SessionStats) {
        let _ = self.stats_tx.send(stats.clone());
        self.publish_event(EventType::Stats, ConsoleEvent::StatsUpdated(stats));
    }

    pub fn publish_detection(&self, detection: DetectionEvent) {
        let _ = self.detection_tx.send(detection.clone());
        self.publish_event(EventType::Detection, ConsoleEvent::Detection(detection));
    }

    pub fn publish_health(&self, health: HealthStatus) {
        self.publish_event(EventType::Health, ConsoleEvent::HealthUpdated(health));
    }

    pub fn publish_health_degraded(&self, reason: &str) {
        self.publish_event(
            EventType::Health,
            ConsoleEvent::HealthDegraded {
                reason: reason.to_string(),
            },
        );
    }

    pub fn publish_alarm(&self, alarm: AlarmStatus) {
        self.publish_event(EventType::Alarm, ConsoleEvent::AlarmUpdated(alarm));
    }

    pub fn publish_stream_state(&self, state: StreamState) {
        self.publish_event(EventType::Stream, ConsoleEvent::StreamStateChanged(state));
    }

    pub fn publish_cycle_failed(&self, error: &ConsoleError) {
        self.publish_event(
            EventType::Error,
            ConsoleEvent::CycleFailed {
                code: error.code(),
                message: error.to_string(),
            },
        );
    }

    pub fn publish_error(&self, error: &ConsoleError) {
        self.publish_event(
            EventType::Error,
            ConsoleEvent::Error {
                code: error.code(),
                message: error.to_string(),
            },
        );
    }

    /// Frames from the display-only stream skip the generic event log
    pub fn publish_live_frame(&self, frame: Vec<u8>) {
        let _ = self.frame_tx.send(Arc::from(frame));
    }

    fn publish_event(&self, event_type: EventType, payload: ConsoleEvent) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_stats(&self) -> broadcast::Receiver<SessionStats> {
        self.stats_tx.subscribe()
    }

    pub fn subscribe_detections(&self) -> broadcast::Receiver<DetectionEvent> {
        self.detection_tx.subscribe()
    }

    pub fn subscribe_frames(&self) -> broadcast::Receiver<Arc<[u8]>> {
        self.frame_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Events published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
