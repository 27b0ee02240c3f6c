// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Console engine - wires the device, session and background tasks

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::{CycleReport, EventBus, Session, StreamingScheduler, TaskScheduler};
use crate::config::Config;
use crate::device::{DeviceApi, DeviceClient, HealthStatus, InferenceRequest, LiveStream, ModelLoadResponse};
use crate::error::{ConsoleError, Result};
use crate::events::{EventExporter, EventFilter, ExportFormat};
use crate::poller::{AlarmController, Pollers};

/// Main console engine
pub struct Console {
    pub config: Arc<Config>,
    device: Arc<dyn DeviceApi>,
    session: Arc<Session>,
    bus: Arc<EventBus>,
    tasks: Arc<TaskScheduler>,
    streaming: StreamingScheduler,
    pollers: Pollers,
    alarm: AlarmController,
    live: Option<LiveStream>,
    start_time: Instant,
}

impl Console {
    /// Build a console talking HTTP to `config.device.base_url`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(DeviceClient::from_config(&config.device)?);
        let mut console = Self::with_device(config, client.clone())?;
        console.live = Some(LiveStream::new(
            client,
            console.bus.clone(),
            console.config.streaming.live_max_frame_bytes,
        ));
        Ok(console)
    }

    /// Build a console over any device implementation
    pub fn with_device(config: Config, device: Arc<dyn DeviceApi>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let session = Arc::new(Session::new(&config));
        let bus = Arc::new(EventBus::default());
        let tasks = Arc::new(TaskScheduler::new());

        let streaming = StreamingScheduler::new(
            device.clone(),
            session.clone(),
            bus.clone(),
            tasks.clone(),
            &config.streaming,
        )?;
        let pollers = Pollers::new(
            device.clone(),
            session.clone(),
            bus.clone(),
            tasks.clone(),
            config.polling.clone(),
        );
        let alarm = AlarmController::new(device.clone(), session.clone(), bus.clone());

        Ok(Self {
            config,
            device,
            session,
            bus,
            tasks,
            streaming,
            pollers,
            alarm,
            live: None,
            start_time: Instant::now(),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn streaming(&self) -> &StreamingScheduler {
        &self.streaming
    }

    pub fn pollers(&self) -> &Pollers {
        &self.pollers
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.alarm
    }

    /// Display-only stream, present when built over HTTP
    pub fn live_stream(&self) -> Option<&LiveStream> {
        self.live.as_ref()
    }

    /// Start the background pollers
    pub fn start(&self) {
        info!("Starting console against {}", self.config.device.base_url);
        self.pollers.start();
    }

    pub async fn refresh_health(&self) -> Result<HealthStatus> {
        self.pollers.health().poll_once().await
    }

    /// Ask the device to load its model, then re-read health so the
    /// loaded flag is current.
    pub async fn load_model(&self) -> Result<ModelLoadResponse> {
        let response = self.device.load_model().await.map_err(|e| {
            self.bus.publish_error(&e);
            e
        })?;
        if response.success {
            info!("Model loaded: {}", response.message);
        } else {
            warn!("Model load refused: {}", response.message);
        }

        if let Err(e) = self.refresh_health().await {
            warn!("Health refresh after model load failed: {}", e);
        }
        Ok(response)
    }

    /// One manual inference through the streaming pipeline
    pub async fn infer_once(&self, request: InferenceRequest) -> Result<CycleReport> {
        if !self.session.model_loaded() {
            return Err(ConsoleError::PreconditionFailed("model not loaded".to_string()));
        }
        self.streaming.run_once(request).await
    }

    /// Raw still from the device camera
    pub async fn capture(&self) -> Result<Vec<u8>> {
        self.device.capture().await
    }

    /// Write the filtered events to `path`, format chosen by extension.
    /// Returns the number of events written.
    pub fn export_events(&self, filter: &EventFilter, path: &Path) -> Result<usize> {
        let format = ExportFormat::from_path(path)?;
        let events = self.session.filter_events(filter);
        EventExporter::new(format).export_to_path(&events, path)?;
        info!("Exported {} events to {:?}", events.len(), path);
        Ok(events.len())
    }

    /// Stop streaming, the live view and every poller
    pub fn shutdown(&self) {
        info!("Stopping console...");
        self.streaming.stop();
        if let Some(live) = &self.live {
            live.stop();
        }
        self.tasks.cancel_all();
        info!("Console stopped");
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
