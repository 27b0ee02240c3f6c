// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Error types for the console core

/// Result type alias
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Every failure the console core can surface.
///
/// None of these are fatal: each is reported once to the caller of the
/// failing operation and the next tick or user action starts clean.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Model not loaded when starting a stream or running inference
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Network call exceeded its deadline
    #[error("Request timed out after {timeout_ms} ms")]
    RequestTimeout { timeout_ms: u64 },

    /// Non-success response from the device
    #[error("Device returned {status}: {message}")]
    RemoteError { status: u16, message: String },

    /// Device could not be reached at all
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// Malformed or undecodable detections / image
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Caller supplied an unusable input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Map a reqwest failure onto the console taxonomy.
    pub(crate) fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ConsoleError::RequestTimeout { timeout_ms }
        } else if err.is_decode() {
            ConsoleError::DecodeError(err.to_string())
        } else if let Some(status) = err.status() {
            ConsoleError::RemoteError {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ConsoleError::Unreachable(err.to_string())
        }
    }

    /// Short machine-friendly code, used in logs and bus events
    pub fn code(&self) -> &'static str {
        match self {
            ConsoleError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            ConsoleError::RequestTimeout { .. } => "REQUEST_TIMEOUT",
            ConsoleError::RemoteError { .. } => "REMOTE_ERROR",
            ConsoleError::Unreachable(_) => "UNREACHABLE",
            ConsoleError::DecodeError(_) => "DECODE_ERROR",
            ConsoleError::ValidationError(_) => "VALIDATION_ERROR",
            ConsoleError::Io(_) => "IO_ERROR",
            ConsoleError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::DecodeError(err.to_string())
    }
}
