// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! EdgeWatch - console for an edge object-detection device
//!
//! Polls device health and alarm state, streams capture/infer cycles at a
//! configurable rate, aggregates latency and detection-rate telemetry, keeps
//! a bounded log of detection events and paints detection overlays.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        EdgeWatch Console                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌──────────┐  ┌──────────┐  │
//! │  │ Streaming │ → │  Device   │ → │ Telemetry│→ │ Overlay  │  │
//! │  │ Scheduler │   │  Client   │   │          │  │ Renderer │  │
//! │  └───────────┘   └───────────┘   └──────────┘  └──────────┘  │
//! │        ↑               ↑               ↓             ↓       │
//! │  ┌───────────┐   ┌───────────┐   ┌─────────────────────────┐ │
//! │  │   Task    │   │  Pollers  │ → │  Session + Event Store  │ │
//! │  │ Scheduler │   │  (health, │   └─────────────────────────┘ │
//! │  └───────────┘   │   alarm)  │               ↓               │
//! │                  └───────────┘   ┌─────────────────────────┐ │
//! │                                  │        Event Bus        │ │
//! │                                  └─────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod events;
pub mod overlay;
pub mod poller;
pub mod telemetry;

#[cfg(feature = "gui")]
pub mod ui;

// Re-exports for convenience
pub use config::Config;
pub use core::{Console, EventBus, Session, StreamingScheduler};
pub use device::{DeviceApi, DeviceClient};
pub use error::{ConsoleError, Result};
pub use events::{DetectionEvent, EventFilter, EventStore};
pub use overlay::OverlayRenderer;
pub use telemetry::{SessionStats, TelemetryAggregator};

/// EdgeWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// EdgeWatch name
pub const NAME: &str = "EdgeWatch";
