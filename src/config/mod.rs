// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use crate::error::ConsoleError;
use crate::overlay::OverlayStyle;

/// Lowest streaming rate accepted
pub const MIN_FPS: u32 = 1;
/// Highest streaming rate accepted
pub const MAX_FPS: u32 = 30;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level, overridden by `--debug` / `--trace`
    pub log_level: String,

    /// Remote device
    pub device: DeviceConfig,

    /// Streaming loop
    pub streaming: StreamingConfig,

    /// Health / alarm polling
    pub polling: PollingConfig,

    /// Telemetry aggregation
    pub telemetry: TelemetryConfig,

    /// Detection event store
    pub events: EventsConfig,

    /// Overlay rendering
    pub overlay: OverlayConfig,

    /// GUI configuration
    pub gui: GuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            device: DeviceConfig::default(),
            streaming: StreamingConfig::default(),
            polling: PollingConfig::default(),
            telemetry: TelemetryConfig::default(),
            events: EventsConfig::default(),
            overlay: OverlayConfig::default(),
            gui: GuiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("edgewatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn log_level(&self) -> std::result::Result<Level, ConsoleError> {
        self.log_level
            .trim()
            .parse()
            .map_err(|_| ConsoleError::ValidationError(format!("unknown log_level '{}'", self.log_level)))
    }

    /// Check every section for values the console cannot run with
    pub fn validate(&self) -> std::result::Result<(), ConsoleError> {
        self.log_level()?;
        if self.device.base_url.trim().is_empty() {
            return Err(ConsoleError::ValidationError("device.base_url is empty".to_string()));
        }
        if self.device.request_timeout_ms == 0 {
            return Err(ConsoleError::ValidationError(
                "device.request_timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(location) = &self.device.location {
            location.validate()?;
        }
        validate_fps(self.streaming.fps)?;
        if self.polling.health_interval_secs == 0 || self.polling.alarm_interval_secs == 0 {
            return Err(ConsoleError::ValidationError(
                "polling intervals must be positive".to_string(),
            ));
        }
        if self.telemetry.latency_capacity == 0 || self.telemetry.rate_window_ms == 0 {
            return Err(ConsoleError::ValidationError(
                "telemetry capacity and window must be positive".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConsoleError::ValidationError("events.capacity must be positive".to_string()));
        }
        Ok(())
    }
}

/// Reject rates outside `MIN_FPS..=MAX_FPS`
pub fn validate_fps(fps: u32) -> std::result::Result<(), ConsoleError> {
    if (MIN_FPS..=MAX_FPS).contains(&fps) {
        Ok(())
    } else {
        Err(ConsoleError::ValidationError(format!(
            "fps must be between {} and {}, got {}",
            MIN_FPS, MAX_FPS, fps
        )))
    }
}

/// Remote device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the device API
    pub base_url: String,

    /// Deadline for every request, in milliseconds
    pub request_timeout_ms: u64,

    /// Where the device is installed
    pub location: Option<DeviceLocation>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 3000,
            location: None,
        }
    }
}

/// Installation coordinates of the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl DeviceLocation {
    pub fn validate(&self) -> std::result::Result<(), ConsoleError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConsoleError::ValidationError(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConsoleError::ValidationError(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Streaming loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Capture rate in frames per second
    pub fps: u32,

    /// Ask the device for the annotated image
    pub return_image: bool,

    /// Source size assumed when neither the image nor health reports one
    pub default_source_width: u32,
    pub default_source_height: u32,

    /// Display-only stream frames larger than this are dropped
    pub live_max_frame_bytes: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            fps: 2,
            return_image: true,
            default_source_width: 640,
            default_source_height: 480,
            live_max_frame_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub health_interval_secs: u64,
    pub alarm_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: 5,
            alarm_interval_secs: 3,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Latency samples kept for mean / p95
    pub latency_capacity: usize,

    /// Detection-rate window in milliseconds
    pub rate_window_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            latency_capacity: 60,
            rate_window_ms: 60_000,
        }
    }
}

/// Event store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Maximum events kept
    pub capacity: usize,

    /// Where exports land when no path is given
    pub export_dir: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: crate::events::DEFAULT_EVENT_CAPACITY,
            export_dir: PathBuf::from("./exports"),
        }
    }
}

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Draw boxes on the preview
    pub enabled: bool,

    /// Overlay surface size
    pub surface_width: u32,
    pub surface_height: u32,

    pub style: OverlayStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            surface_width: 640,
            surface_height: 480,
            style: OverlayStyle::default(),
        }
    }
}

/// GUI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Window width
    pub width: u32,

    /// Window height
    pub height: u32,

    /// Enable VSync
    pub vsync: bool,

    /// Theme
    pub theme: Theme,

    /// Show FPS counter
    pub show_fps: bool,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 820,
            vsync: true,
            theme: Theme::Dark,
            show_fps: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}
