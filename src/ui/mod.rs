// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! UI module - egui visual console

mod app;
mod panels;
mod widgets;
mod plots;
mod theme;

pub use app::*;
pub use panels::*;
pub use widgets::*;
pub use plots::*;
pub use theme::*;

use anyhow::Result;
use eframe::egui;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::core::Console;
use crate::events::LabelFilter;

/// GUI state
pub struct GuiState {
    /// Streaming rate selected on the slider
    pub fps: u32,

    /// Event list label filter
    pub label_filter: LabelFilter,

    /// Event list confidence threshold, percent
    pub min_confidence: f64,

    /// Pulse length for manual alarm triggers
    pub trigger_seconds: f64,

    /// Display-only stream
    pub live_view: bool,
    pub live_overlay: bool,

    /// Last error or notice for the status bar
    pub last_error: Option<String>,

    /// Show about
    pub show_about: bool,
}

impl GuiState {
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            label_filter: LabelFilter::All,
            min_confidence: 0.0,
            trigger_seconds: 2.0,
            live_view: false,
            live_overlay: true,
            last_error: None,
            show_about: false,
        }
    }
}

/// Launch GUI application. Must be called inside the runtime context of
/// `runtime`.
pub fn run_gui(console: Arc<Console>, runtime: Handle) -> Result<()> {
    let config = console.config.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.gui.width as f32, config.gui.height as f32])
            .with_title("EdgeWatch - Edge Inference Console")
            .with_icon(load_icon()),
        vsync: config.gui.vsync,
        ..Default::default()
    };

    eframe::run_native(
        "EdgeWatch",
        options,
        Box::new(move |cc| {
            apply_theme(&cc.egui_ctx, config.gui.theme);
            Box::new(EdgeWatchApp::new(cc, console, runtime))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run GUI: {}", e))
}

fn load_icon() -> egui::IconData {
    egui::IconData {
        rgba: vec![0u8, 255, 136, 255].repeat(32 * 32),
        width: 32,
        height: 32,
    }
}
