// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Shared session state

use std::sync::Arc;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::device::{AlarmStatus, BoundingBox, DeviceCondition, HealthStatus, InferenceResponse};
use crate::events::{DetectionEvent, EventFilter, EventStore};
use crate::overlay::{OverlayCanvas, OverlayRenderer};
use crate::telemetry::{SessionStats, TelemetryAggregator};

/// Last image returned by the device
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
}

/// Everything a session accumulates. Locks are never held across an await.
pub struct Session {
    telemetry: Mutex<TelemetryAggregator>,
    events: Mutex<EventStore>,
    health: RwLock<Option<HealthStatus>>,
    alarm: RwLock<Option<AlarmStatus>>,
    canvas: Mutex<OverlayCanvas>,
    renderer: RwLock<OverlayRenderer>,
    frame: RwLock<Option<Frame>>,
    default_source: (u32, u32),
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            telemetry: Mutex::new(TelemetryAggregator::from_config(&config.telemetry)),
            events: Mutex::new(EventStore::new(config.events.capacity)),
            health: RwLock::new(None),
            alarm: RwLock::new(None),
            canvas: Mutex::new(OverlayCanvas::new(
                config.overlay.surface_width as f64,
                config.overlay.surface_height as f64,
            )),
            renderer: RwLock::new(OverlayRenderer::new(
                config.overlay.style.clone(),
                config.overlay.enabled,
            )),
            frame: RwLock::new(None),
            default_source: (
                config.streaming.default_source_width,
                config.streaming.default_source_height,
            ),
        }
    }

    /// Fold one response into telemetry: latency, detection count, frame.
    pub fn record_inference(&self, response: &InferenceResponse, now: DateTime<Utc>) -> SessionStats {
        let mut telemetry = self.telemetry.lock();
        telemetry.record_latency(response.metadata.inference_ms);
        telemetry.record_detections(response.detections.len(), now);
        telemetry.record_frame();
        telemetry.snapshot(now)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        self.telemetry.lock().snapshot(now)
    }

    pub fn append_event(&self, event: DetectionEvent) {
        self.events.lock().append(event);
    }

    pub fn filter_events(&self, filter: &EventFilter) -> Vec<DetectionEvent> {
        self.events.lock().filter(filter)
    }

    pub fn event_labels(&self) -> Vec<String> {
        self.events.lock().labels()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn health(&self) -> Option<HealthStatus> {
        self.health.read().clone()
    }

    pub fn set_health(&self, health: HealthStatus) {
        *self.health.write() = Some(health);
    }

    /// Mark the last known health as degraded, keeping its other fields.
    /// Nothing is held until the device has answered once.
    pub fn degrade_health(&self) -> Option<HealthStatus> {
        let mut health = self.health.write();
        let status = health.as_mut()?;
        status.status = DeviceCondition::Degraded;
        Some(status.clone())
    }

    pub fn model_loaded(&self) -> bool {
        self.health
            .read()
            .as_ref()
            .map(|h| h.model.loaded)
            .unwrap_or(false)
    }

    pub fn alarm(&self) -> Option<AlarmStatus> {
        self.alarm.read().clone()
    }

    pub fn set_alarm(&self, alarm: AlarmStatus) {
        *self.alarm.write() = Some(alarm);
    }

    /// Source size for scaling boxes when the response carried no image
    pub fn fallback_source_size(&self) -> (u32, u32) {
        self.health
            .read()
            .as_ref()
            .and_then(|h| h.frame_size())
            .unwrap_or(self.default_source)
    }

    pub fn paint_overlay(&self, detections: &[BoundingBox], source_width: u32, source_height: u32) -> usize {
        let renderer = self.renderer.read();
        let mut canvas = self.canvas.lock();
        renderer.paint(&mut *canvas, detections, source_width as f64, source_height as f64)
    }

    pub fn overlay_enabled(&self) -> bool {
        self.renderer.read().enabled()
    }

    /// Disabling also clears the canvas
    pub fn set_overlay_enabled(&self, enabled: bool) {
        self.renderer.write().set_enabled(enabled);
        if !enabled {
            use crate::overlay::Surface;
            self.canvas.lock().clear();
        }
    }

    pub fn canvas(&self) -> OverlayCanvas {
        self.canvas.lock().clone()
    }

    pub fn canvas_generation(&self) -> u64 {
        self.canvas.lock().generation()
    }

    pub fn set_frame(&self, bytes: Vec<u8>, width: u32, height: u32) {
        let mut frame = self.frame.write();
        let sequence = frame.as_ref().map(|f| f.sequence + 1).unwrap_or(0);
        *frame = Some(Frame {
            bytes: Arc::from(bytes),
            width,
            height,
            sequence,
        });
    }

    pub fn frame(&self) -> Option<Frame> {
        self.frame.read().clone()
    }
}
