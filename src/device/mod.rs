// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Remote device contract - wire types and the `DeviceApi` seam

mod client;
mod stream;

pub use client::*;
pub use stream::*;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use std::io::Cursor;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConsoleError, Result};

/// One detected object, in source-image pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub confidence: f64,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(label: &str, confidence: f64, x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Reject boxes the device should never have produced
    pub fn validate(&self) -> Result<()> {
        let coords = [self.x_min, self.y_min, self.x_max, self.y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ConsoleError::DecodeError(format!(
                "non-finite coordinate in box '{}'",
                self.label
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConsoleError::DecodeError(format!(
                "confidence {} out of range for '{}'",
                self.confidence, self.label
            )));
        }
        if self.x_min > self.x_max || self.y_min > self.y_max {
            return Err(ConsoleError::DecodeError(format!(
                "inverted box for '{}'",
                self.label
            )));
        }
        Ok(())
    }
}

/// Where the frame for an inference comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceRequest {
    /// Device grabs a frame from its own camera
    Capture { return_image: bool },
    /// Caller supplies a base64 encoded image
    SuppliedImage { image_base64: String, return_image: bool },
}

impl InferenceRequest {
    pub fn capture(return_image: bool) -> Self {
        InferenceRequest::Capture { return_image }
    }

    pub fn supplied(image_base64: impl Into<String>, return_image: bool) -> Self {
        InferenceRequest::SuppliedImage {
            image_base64: image_base64.into(),
            return_image,
        }
    }

    pub fn return_image(&self) -> bool {
        match self {
            InferenceRequest::Capture { return_image } => *return_image,
            InferenceRequest::SuppliedImage { return_image, .. } => *return_image,
        }
    }

    /// Fail fast when no image source is usable
    pub fn validate(&self) -> Result<()> {
        match self {
            InferenceRequest::Capture { .. } => Ok(()),
            InferenceRequest::SuppliedImage { image_base64, .. } => {
                if image_base64.trim().is_empty() {
                    Err(ConsoleError::ValidationError(
                        "image_base64 is required when not capturing from camera".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    pub(crate) fn to_wire(&self) -> InferRequestBody<'_> {
        match self {
            InferenceRequest::Capture { return_image } => InferRequestBody {
                capture_from_camera: true,
                image_base64: None,
                return_image: *return_image,
            },
            InferenceRequest::SuppliedImage { image_base64, return_image } => InferRequestBody {
                capture_from_camera: false,
                image_base64: Some(image_base64.as_str()),
                return_image: *return_image,
            },
        }
    }
}

/// JSON body of `POST /infer`
#[derive(Debug, Serialize)]
pub(crate) struct InferRequestBody<'a> {
    pub capture_from_camera: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<&'a str>,
    pub return_image: bool,
}

/// Metadata attached to every inference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceMetadata {
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default)]
    pub detection_count: usize,
    #[serde(default)]
    pub inference_ms: f64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response of `POST /infer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub detections: Vec<BoundingBox>,
    #[serde(default)]
    pub metadata: InferenceMetadata,
    #[serde(default)]
    pub encoded_image: Option<String>,
}

impl InferenceResponse {
    pub fn validate(&self) -> Result<()> {
        if !self.metadata.inference_ms.is_finite() || self.metadata.inference_ms < 0.0 {
            return Err(ConsoleError::DecodeError(format!(
                "invalid inference_ms {}",
                self.metadata.inference_ms
            )));
        }
        self.detections.iter().try_for_each(BoundingBox::validate)
    }
}

/// Overall device condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCondition {
    Ok,
    #[default]
    Degraded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraStatus {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub using_mock: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub autoload: Option<bool>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: DeviceCondition,
    #[serde(default)]
    pub camera: CameraStatus,
    #[serde(default)]
    pub model: ModelStatus,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == DeviceCondition::Ok
    }

    /// Camera frame size, if the device reported one
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        if self.camera.width > 0 && self.camera.height > 0 {
            Some((self.camera.width, self.camera.height))
        } else {
            None
        }
    }
}

/// Response of `GET /alarm` and `POST /alarm`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pulse_duration: f64,
    #[serde(default)]
    pub voice_warning: bool,
}

/// Alarm actions accepted by `POST /alarm`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlarmControl {
    Activate,
    Deactivate,
    Trigger { duration_seconds: Option<f64> },
}

impl AlarmControl {
    pub fn action(&self) -> &'static str {
        match self {
            AlarmControl::Activate => "activate",
            AlarmControl::Deactivate => "deactivate",
            AlarmControl::Trigger { .. } => "trigger",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let AlarmControl::Trigger { duration_seconds: Some(d) } = self {
            if !d.is_finite() || *d <= 0.0 {
                return Err(ConsoleError::ValidationError(format!(
                    "trigger duration must be positive, got {}",
                    d
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn to_wire(self) -> AlarmControlBody {
        let duration_seconds = match self {
            AlarmControl::Trigger { duration_seconds } => duration_seconds,
            _ => None,
        };
        AlarmControlBody {
            action: self.action(),
            duration_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AlarmControlBody {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Response of `POST /model/load`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLoadResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Everything the console needs from the device
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus>;

    /// `POST /model/load`
    async fn load_model(&self) -> Result<ModelLoadResponse>;

    /// `POST /infer`
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse>;

    /// `GET /alarm`
    async fn alarm_status(&self) -> Result<AlarmStatus>;

    /// `POST /alarm`
    async fn alarm_control(&self, control: AlarmControl) -> Result<AlarmStatus>;

    /// `GET /capture`
    async fn capture(&self) -> Result<Vec<u8>>;
}

/// A returned image, decoded far enough to know its size
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode a base64 image (plain or `data:` URL) and read its dimensions.
/// CPU bound on large payloads; async callers go through `spawn_blocking`.
pub fn decode_image(encoded: &str) -> Result<DecodedImage> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ConsoleError::DecodeError(format!("invalid base64 image: {}", e)))?;

    // Header only. Pixels are decoded by whoever displays the frame.
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| ConsoleError::DecodeError(format!("unreadable image: {}", e)))?
        .into_dimensions()
        .map_err(|e| ConsoleError::DecodeError(format!("undecodable image: {}", e)))?;

    Ok(DecodedImage { bytes, width, height })
}

/// Accepts RFC 3339 strings, naive ISO-8601 strings (taken as UTC) and
/// epoch seconds or milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Epoch(f64),
    }

    let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
    let parsed = match raw {
        None => None,
        Some(RawTimestamp::Text(text)) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
                Some(ts.with_timezone(&Utc))
            } else {
                let naive = chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(serde::de::Error::custom)?;
                Some(Utc.from_utc_datetime(&naive))
            }
        }
        Some(RawTimestamp::Epoch(value)) => {
            // Anything past year 33658 in seconds is really milliseconds
            let millis = if value > 1e12 { value } else { value * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
    };
    Ok(parsed)
}
