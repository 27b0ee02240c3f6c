// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! HTTP client for the edge device

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{
    AlarmControl, AlarmStatus, DeviceApi, HealthStatus, InferenceRequest, InferenceResponse,
    ModelLoadResponse,
};
use crate::config::DeviceConfig;
use crate::error::{ConsoleError, Result};

/// Default network deadline for every device call
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Device HTTP client. One attempt per call, no retries.
pub struct DeviceClient {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DeviceClient {
    /// Create a client with the default 3 s deadline
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Create a client with a custom deadline
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {}", e)))?;

        // The stream never finishes, so only the connect phase gets a deadline
        let stream_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            stream_client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        Self::with_timeout(
            config.base_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of the display-only MJPEG stream
    pub fn stream_url(&self, fps: u32, overlay: bool) -> String {
        format!("{}/stream?fps={}&overlay={}", self.base_url, fps, overlay)
    }

    /// Open the display-only stream. The caller drives the body.
    pub async fn open_stream(&self, fps: u32, overlay: bool) -> Result<reqwest::Response> {
        let url = self.stream_url(fps, overlay);
        debug!("Opening stream {}", url);
        let request = self.stream_client.get(&url);
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = request
            .send()
            .await
            .map_err(|e| ConsoleError::from_transport(e, self.timeout_ms()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ConsoleError::RemoteError {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }

    async fn read_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ConsoleError::from_transport(e, self.timeout_ms()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let resp = self.send(self.client.get(self.url(path))).await?;
        self.read_json(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {}", path);
        let resp = self.send(self.client.post(self.url(path)).json(body)).await?;
        self.read_json(resp).await
    }
}

/// Prefer the device's own explanation over the raw body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl DeviceApi for DeviceClient {
    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    async fn load_model(&self) -> Result<ModelLoadResponse> {
        self.post_json("/model/load", &serde_json::json!({})).await
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        request.validate()?;
        let response: InferenceResponse = self.post_json("/infer", &request.to_wire()).await?;
        response.validate()?;
        Ok(response)
    }

    async fn alarm_status(&self) -> Result<AlarmStatus> {
        self.get_json("/alarm").await
    }

    async fn alarm_control(&self, control: AlarmControl) -> Result<AlarmStatus> {
        control.validate()?;
        self.post_json("/alarm", &control.to_wire()).await
    }

    async fn capture(&self) -> Result<Vec<u8>> {
        debug!("GET /capture");
        let resp = self.send(self.client.get(self.url("/capture"))).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ConsoleError::from_transport(e, self.timeout_ms()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one canned HTTP response, returning the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn test_infer_success() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"detections":[{"label":"car","confidence":0.91,"x_min":1,"y_min":2,"x_max":30,"y_max":40}],
                "metadata":{"model_path":"m.onnx","detection_count":1,"inference_ms":42.0}}"#,
        )
        .await;
        let client = DeviceClient::new(url).unwrap();

        let response = client.infer(&InferenceRequest::capture(false)).await.unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].label, "car");
        assert_eq!(response.metadata.inference_ms, 42.0);
        assert!(response.encoded_image.is_none());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /infer "));
        assert!(request.contains(r#""capture_from_camera":true"#));
    }

    #[tokio::test]
    async fn test_remote_error_uses_detail() {
        let (url, _server) = serve_once("503 Service Unavailable", r#"{"detail":"Model not loaded"}"#).await;
        let client = DeviceClient::new(url).unwrap();

        match client.infer(&InferenceRequest::capture(false)).await {
            Err(ConsoleError::RemoteError { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "Model not loaded");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (url, _server) = serve_once("200 OK", r#"{"status": 12"#).await;
        let client = DeviceClient::new(url).unwrap();

        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ConsoleError::DecodeError(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_slow_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = DeviceClient::with_timeout(format!("http://{}", addr), Duration::from_millis(200)).unwrap();
        let err = client.alarm_status().await.unwrap_err();
        assert!(
            matches!(err, ConsoleError::RequestTimeout { timeout_ms: 200 }),
            "got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = DeviceClient::new(format!("http://{}", addr)).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Unreachable(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_supplied_request_fails_before_network() {
        // nothing listens here; validation must short-circuit
        let client = DeviceClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .infer(&InferenceRequest::supplied("", true))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::ValidationError(_)));
    }

    #[test]
    fn test_stream_url() {
        let client = DeviceClient::new("http://device.local:8000/").unwrap();
        assert_eq!(
            client.stream_url(5, true),
            "http://device.local:8000/stream?fps=5&overlay=true"
        );
    }
}
