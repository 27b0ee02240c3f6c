// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Streaming scheduler - periodic capture, infer, record, paint

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{EventBus, Session, TaskScheduler};
use crate::config::{validate_fps, StreamingConfig};
use crate::device::{decode_image, DecodedImage, DeviceApi, InferenceRequest, InferenceResponse};
use crate::error::{ConsoleError, Result};
use crate::events::DetectionEvent;
use crate::telemetry::SessionStats;

/// Name of the streaming ticker in the task scheduler
pub const STREAM_TASK: &str = "stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Stopped,
    Running,
}

/// What one completed cycle produced
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub detections: usize,
    pub inference_ms: f64,
    pub round_trip_ms: f64,
    pub painted: usize,
    pub event_id: Option<String>,
    pub stats: SessionStats,
}

/// Result of a tick
#[derive(Debug)]
pub enum TickOutcome {
    Dispatched(JoinHandle<Result<CycleReport>>),
    /// A cycle was still in flight
    Dropped,
}

impl TickOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, TickOutcome::Dropped)
    }
}

struct Pipeline {
    device: Arc<dyn DeviceApi>,
    session: Arc<Session>,
    bus: Arc<EventBus>,
    busy: AtomicBool,
    dropped: AtomicU64,
    return_image: AtomicBool,
}

/// Clears the in-flight flag when the cycle ends, panics included
struct InFlight(Arc<Pipeline>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
    }
}

impl Pipeline {
    fn acquire(self: &Arc<Self>) -> Option<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(self.clone()))
    }

    fn tick(self: &Arc<Self>) -> TickOutcome {
        let Some(guard) = self.acquire() else {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(dropped, "Cycle in flight, tick dropped");
            return TickOutcome::Dropped;
        };

        let request = InferenceRequest::capture(self.return_image.load(Ordering::Relaxed));
        TickOutcome::Dispatched(tokio::spawn(async move {
            let pipeline = guard.0.clone();
            let result = pipeline.run_cycle(&request).await;
            drop(guard);
            result
        }))
    }

    async fn run_cycle(&self, request: &InferenceRequest) -> Result<CycleReport> {
        let started = Instant::now();
        let response = match self.device.infer(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(code = e.code(), "Inference cycle failed: {}", e);
                self.bus.publish_cycle_failed(&e);
                return Err(e);
            }
        };
        let round_trip_ms = started.elapsed().as_secs_f64() * 1000.0;

        let image = match response.encoded_image.clone() {
            Some(encoded) => Some(
                tokio::task::spawn_blocking(move || decode_image(&encoded))
                    .await
                    .unwrap_or_else(|e| Err(ConsoleError::DecodeError(format!("decode task failed: {}", e)))),
            ),
            None => None,
        };

        Ok(record_cycle(&self.session, &self.bus, response, image, round_trip_ms))
    }
}

/// Apply a successful response to the session in cycle order: telemetry,
/// stats event, overlay paint, then the detection event.
fn record_cycle(
    session: &Session,
    bus: &EventBus,
    response: InferenceResponse,
    image: Option<Result<DecodedImage>>,
    round_trip_ms: f64,
) -> CycleReport {
    let now = Utc::now();
    let stats = session.record_inference(&response, now);
    bus.publish_stats(stats.clone());

    let (source_width, source_height) = match image {
        Some(Ok(image)) => {
            let size = (image.width, image.height);
            session.set_frame(image.bytes, image.width, image.height);
            size
        }
        Some(Err(e)) => {
            warn!("Returned image not decodable: {}", e);
            bus.publish_error(&e);
            session.fallback_source_size()
        }
        None => session.fallback_source_size(),
    };
    let painted = session.paint_overlay(&response.detections, source_width, source_height);

    let event = DetectionEvent::from_response(&response, now);
    let event_id = event.as_ref().map(|e| e.id.clone());
    if let Some(event) = event {
        debug!(id = %event.id, detections = event.detections.len(), "Detection event");
        session.append_event(event.clone());
        bus.publish_detection(event);
    }

    CycleReport {
        detections: response.detections.len(),
        inference_ms: response.metadata.inference_ms,
        round_trip_ms,
        painted,
        event_id,
        stats,
    }
}

/// Drives inference cycles at a fixed rate with at most one in flight
pub struct StreamingScheduler {
    pipeline: Arc<Pipeline>,
    tasks: Arc<TaskScheduler>,
    state: Mutex<StreamState>,
    fps: AtomicU32,
}

impl StreamingScheduler {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        session: Arc<Session>,
        bus: Arc<EventBus>,
        tasks: Arc<TaskScheduler>,
        config: &StreamingConfig,
    ) -> Result<Self> {
        validate_fps(config.fps)?;
        Ok(Self {
            pipeline: Arc::new(Pipeline {
                device,
                session,
                bus,
                busy: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
                return_image: AtomicBool::new(config.return_image),
            }),
            tasks,
            state: Mutex::new(StreamState::Stopped),
            fps: AtomicU32::new(config.fps),
        })
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == StreamState::Running
    }

    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps() as u64)
    }

    /// Ticks skipped because a cycle was still running
    pub fn dropped_ticks(&self) -> u64 {
        self.pipeline.dropped.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> bool {
        self.pipeline.busy.load(Ordering::Acquire)
    }

    pub fn set_return_image(&self, return_image: bool) {
        self.pipeline.return_image.store(return_image, Ordering::Relaxed);
    }

    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == StreamState::Running {
            return Ok(());
        }
        if !self.pipeline.session.model_loaded() {
            let err = ConsoleError::PreconditionFailed("model not loaded".to_string());
            self.pipeline.bus.publish_error(&err);
            return Err(err);
        }

        self.schedule_ticker();
        *state = StreamState::Running;
        drop(state);

        info!("Streaming started at {} fps", self.fps());
        self.pipeline.bus.publish_stream_state(StreamState::Running);
        Ok(())
    }

    /// Cancel the ticker. A cycle already in flight still completes.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == StreamState::Stopped {
            return;
        }
        self.tasks.cancel(STREAM_TASK);
        *state = StreamState::Stopped;
        drop(state);

        info!("Streaming stopped");
        self.pipeline.bus.publish_stream_state(StreamState::Stopped);
    }

    pub fn set_fps(&self, fps: u32) -> Result<()> {
        validate_fps(fps)?;
        let previous = self.fps.swap(fps, Ordering::Relaxed);

        let state = self.state.lock();
        if *state == StreamState::Running && previous != fps {
            self.schedule_ticker();
            info!("Streaming rate changed {} -> {} fps", previous, fps);
        }
        Ok(())
    }

    pub fn tick(&self) -> TickOutcome {
        self.pipeline.tick()
    }

    /// Run one cycle with a caller-built request, sharing the in-flight guard
    /// with the ticker.
    pub async fn run_once(&self, request: InferenceRequest) -> Result<CycleReport> {
        request.validate()?;
        let guard = self.pipeline.acquire().ok_or_else(|| {
            ConsoleError::PreconditionFailed("an inference is already in flight".to_string())
        })?;
        let result = self.pipeline.run_cycle(&request).await;
        drop(guard);
        result
    }

    fn schedule_ticker(&self) {
        let pipeline = self.pipeline.clone();
        self.tasks.schedule(STREAM_TASK, self.interval(), move || {
            pipeline.tick();
            std::future::ready(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::ConsoleEvent;
    use crate::device::{
        AlarmControl, AlarmStatus, BoundingBox, HealthStatus, InferenceMetadata, ModelLoadResponse, ModelStatus,
    };
    use async_trait::async_trait;
    use base64::Engine;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    struct FakeDevice {
        calls: AtomicUsize,
        gate: Option<Semaphore>,
        fail: bool,
        detections: Vec<BoundingBox>,
        image: Option<String>,
    }

    impl FakeDevice {
        fn new(detections: Vec<BoundingBox>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                fail: false,
                detections,
                image: None,
            }
        }

        fn with_image(mut self, encoded: String) -> Self {
            self.image = Some(encoded);
            self
        }

        fn gated(mut self) -> Self {
            self.gate = Some(Semaphore::new(0));
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1);
            }
        }
    }

    #[async_trait]
    impl DeviceApi for FakeDevice {
        async fn health(&self) -> Result<HealthStatus> {
            Ok(HealthStatus::default())
        }

        async fn load_model(&self) -> Result<ModelLoadResponse> {
            Ok(ModelLoadResponse { success: true, message: String::new() })
        }

        async fn infer(&self, _request: &InferenceRequest) -> Result<InferenceResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail {
                return Err(ConsoleError::RemoteError { status: 503, message: "busy".into() });
            }
            Ok(InferenceResponse {
                detections: self.detections.clone(),
                metadata: InferenceMetadata {
                    inference_ms: 25.0,
                    detection_count: self.detections.len(),
                    ..Default::default()
                },
                encoded_image: self.image.clone(),
            })
        }

        async fn alarm_status(&self) -> Result<AlarmStatus> {
            Ok(AlarmStatus::default())
        }

        async fn alarm_control(&self, _control: AlarmControl) -> Result<AlarmStatus> {
            Ok(AlarmStatus::default())
        }

        async fn capture(&self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        device: Arc<FakeDevice>,
        session: Arc<Session>,
        bus: Arc<EventBus>,
        tasks: Arc<TaskScheduler>,
        streaming: StreamingScheduler,
    }

    fn harness(device: FakeDevice, fps: u32, model_loaded: bool) -> Harness {
        let mut config = Config::default();
        config.streaming.fps = fps;
        let device = Arc::new(device);
        let session = Arc::new(Session::new(&config));
        if model_loaded {
            session.set_health(HealthStatus {
                model: ModelStatus { loaded: true, ..Default::default() },
                ..Default::default()
            });
        }
        let bus = Arc::new(EventBus::default());
        let tasks = Arc::new(TaskScheduler::new());
        let streaming = StreamingScheduler::new(
            device.clone(),
            session.clone(),
            bus.clone(),
            tasks.clone(),
            &config.streaming,
        )
        .unwrap();
        Harness { device, session, bus, tasks, streaming }
    }

    fn png_base64(width: u32, height: u32) -> String {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    fn car() -> BoundingBox {
        BoundingBox::new("car", 0.9, 64.0, 48.0, 128.0, 96.0)
    }

    async fn wait_for_calls(device: &FakeDevice, calls: usize) {
        while device.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    fn dispatched(outcome: TickOutcome) -> JoinHandle<Result<CycleReport>> {
        match outcome {
            TickOutcome::Dispatched(handle) => handle,
            TickOutcome::Dropped => panic!("tick was dropped"),
        }
    }

    #[tokio::test]
    async fn test_start_requires_loaded_model() {
        let h = harness(FakeDevice::new(vec![]), 2, false);
        let err = h.streaming.start().unwrap_err();
        assert!(matches!(err, ConsoleError::PreconditionFailed(_)));
        assert_eq!(h.streaming.state(), StreamState::Stopped);
        assert!(!h.tasks.is_scheduled(STREAM_TASK));
    }

    #[tokio::test]
    async fn test_tick_dropped_while_in_flight() {
        let h = harness(FakeDevice::new(vec![]).gated(), 2, true);

        let first = dispatched(h.streaming.tick());
        wait_for_calls(&h.device, 1).await;

        assert!(h.streaming.tick().is_dropped());
        assert_eq!(h.device.calls(), 1);
        assert_eq!(h.streaming.dropped_ticks(), 1);

        h.device.release();
        first.await.unwrap().unwrap();
        assert!(!h.streaming.in_flight());

        h.device.release();
        let second = dispatched(h.streaming.tick());
        second.await.unwrap().unwrap();
        assert_eq!(h.device.calls(), 2);
    }

    #[tokio::test]
    async fn test_cycle_records_in_order() {
        let h = harness(FakeDevice::new(vec![car()]), 2, true);
        let mut events = h.bus.subscribe_events();

        let report = dispatched(h.streaming.tick()).await.unwrap().unwrap();
        assert_eq!(report.detections, 1);
        assert_eq!(report.painted, 1);
        assert!(report.event_id.is_some());
        assert_eq!(report.stats.total_frames, 1);
        assert_eq!(report.stats.avg_latency_ms, 25.0);

        assert!(matches!(events.try_recv().unwrap().payload, ConsoleEvent::StatsUpdated(_)));
        assert!(matches!(events.try_recv().unwrap().payload, ConsoleEvent::Detection(_)));
        assert_eq!(h.session.event_count(), 1);

        // no image and no camera size: default 640x480 source on a 640x480 surface
        assert_eq!(h.session.canvas().boxes()[0].x, 64.0);
    }

    #[tokio::test]
    async fn test_empty_result_appends_no_event() {
        let h = harness(FakeDevice::new(vec![]), 2, true);
        let report = dispatched(h.streaming.tick()).await.unwrap().unwrap();

        assert_eq!(report.stats.total_frames, 1);
        assert!(report.event_id.is_none());
        assert_eq!(h.session.event_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_cycle_leaves_stats_untouched() {
        let h = harness(FakeDevice::new(vec![car()]).failing(), 2, true);
        let mut events = h.bus.subscribe_events();

        let err = dispatched(h.streaming.tick()).await.unwrap().unwrap_err();
        assert!(matches!(err, ConsoleError::RemoteError { status: 503, .. }));
        assert!(matches!(
            events.try_recv().unwrap().payload,
            ConsoleEvent::CycleFailed { code: "REMOTE_ERROR", .. }
        ));
        assert_eq!(h.session.stats(Utc::now()).total_frames, 0);

        // next tick still dispatches
        assert!(!h.streaming.tick().is_dropped());
    }

    #[tokio::test]
    async fn test_stop_keeps_in_flight_result() {
        let h = harness(FakeDevice::new(vec![car()]).gated(), 1, true);
        h.streaming.start().unwrap();

        let in_flight = dispatched(h.streaming.tick());
        wait_for_calls(&h.device, 1).await;

        h.streaming.stop();
        assert_eq!(h.streaming.state(), StreamState::Stopped);
        assert!(!h.tasks.is_scheduled(STREAM_TASK));

        h.device.release();
        in_flight.await.unwrap().unwrap();
        assert_eq!(h.session.stats(Utc::now()).total_frames, 1);
        assert_eq!(h.session.event_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_change_keeps_single_ticker() {
        let h = harness(FakeDevice::new(vec![]), 2, true);
        h.streaming.start().unwrap();
        assert_eq!(h.tasks.interval_of(STREAM_TASK), Some(Duration::from_millis(500)));

        h.streaming.set_fps(5).unwrap();
        assert_eq!(h.tasks.interval_of(STREAM_TASK), Some(Duration::from_millis(200)));
        assert_eq!(h.tasks.task_names(), vec![STREAM_TASK.to_string()]);

        assert!(matches!(h.streaming.set_fps(0), Err(ConsoleError::ValidationError(_))));
        assert_eq!(h.streaming.fps(), 5);
        h.streaming.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_drives_cycles() {
        let h = harness(FakeDevice::new(vec![]), 4, true);
        h.streaming.start().unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(h.device.calls(), 4);
        h.streaming.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_inference_drops_ticks() {
        let h = harness(FakeDevice::new(vec![]).gated(), 10, true);
        h.streaming.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(h.device.calls(), 1);
        assert!(h.streaming.dropped_ticks() >= 3);
        h.streaming.stop();
    }

    #[tokio::test]
    async fn test_run_once_rejects_while_in_flight() {
        let h = harness(FakeDevice::new(vec![]).gated(), 2, true);
        let _in_flight = dispatched(h.streaming.tick());
        wait_for_calls(&h.device, 1).await;

        let err = h.streaming.run_once(InferenceRequest::capture(false)).await.unwrap_err();
        assert!(matches!(err, ConsoleError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_large_image_keeps_runtime_responsive() {
        let encoded = png_base64(3840, 2160);
        let h = harness(FakeDevice::new(vec![car()]).with_image(encoded), 2, true);

        let beats = Arc::new(Mutex::new(Vec::new()));
        let heartbeat = {
            let beats = beats.clone();
            tokio::spawn(async move {
                loop {
                    beats.lock().push(Instant::now());
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = dispatched(h.streaming.tick()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        heartbeat.abort();

        let frame = h.session.frame().unwrap();
        assert_eq!((frame.width, frame.height), (3840, 2160));
        assert_eq!(report.painted, 1);
        // 640 px surface over a 3840 px source
        assert!((h.session.canvas().boxes()[0].x - 64.0 / 6.0).abs() < 1e-9);

        let beats = beats.lock();
        let max_gap = beats.windows(2).map(|w| w[1] - w[0]).max().unwrap();
        assert!(max_gap < Duration::from_millis(60), "runtime stalled for {:?}", max_gap);
    }

    #[tokio::test]
    async fn test_undecodable_image_uses_fallback_size() {
        let h = harness(FakeDevice::new(vec![car()]).with_image("aGVsbG8=".into()), 2, true);
        let mut events = h.bus.subscribe_events();

        let report = dispatched(h.streaming.tick()).await.unwrap().unwrap();
        assert_eq!(report.stats.total_frames, 1);
        assert!(report.event_id.is_some());
        assert!(h.session.frame().is_none());
        assert_eq!(h.session.canvas().boxes()[0].x, 64.0);

        assert!(matches!(events.try_recv().unwrap().payload, ConsoleEvent::StatsUpdated(_)));
        assert!(matches!(
            events.try_recv().unwrap().payload,
            ConsoleEvent::Error { code: "DECODE_ERROR", .. }
        ));
    }
}
