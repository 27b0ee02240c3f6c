//! Main application window

use eframe::egui;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use crate::core::{ConsoleEvent, Console, Event};
use crate::overlay::OverlayCanvas;
use super::GuiState;
use super::panels::*;
use super::theme::*;
use super::widgets::*;

/// Main EdgeWatch application
pub struct EdgeWatchApp {
    console: Arc<Console>,
    runtime: Handle,
    state: GuiState,

    // Panels
    control_panel: ControlPanel,
    health_panel: HealthPanel,
    stats_panel: StatsPanel,
    event_panel: EventPanel,
    preview_panel: PreviewPanel,

    events: broadcast::Receiver<Event>,
    live_frames: broadcast::Receiver<Arc<[u8]>>,

    frame_texture: Option<egui::TextureHandle>,
    frame_sequence: Option<u64>,
    live_texture: Option<egui::TextureHandle>,
}

impl EdgeWatchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, console: Arc<Console>, runtime: Handle) -> Self {
        let fps = console.streaming().fps();
        let export_dir = console.config.events.export_dir.clone();
        let events = console.bus().subscribe_events();
        let live_frames = console.bus().subscribe_frames();

        Self {
            console,
            runtime,
            state: GuiState::new(fps),
            control_panel: ControlPanel::new(),
            health_panel: HealthPanel::new(),
            stats_panel: StatsPanel::new(),
            event_panel: EventPanel::new(export_dir),
            preview_panel: PreviewPanel::new(),
            events,
            live_frames,
            frame_texture: None,
            frame_sequence: None,
            live_texture: None,
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => match event.payload {
                    ConsoleEvent::CycleFailed { message, .. } | ConsoleEvent::Error { message, .. } => {
                        self.state.last_error = Some(message);
                    }
                    ConsoleEvent::HealthDegraded { reason } => {
                        self.state.last_error = Some(format!("Device degraded: {}", reason));
                    }
                    _ => {}
                },
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn refresh_textures(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.console.session().frame() {
            if self.frame_sequence != Some(frame.sequence) {
                self.frame_sequence = Some(frame.sequence);
                if let Some(texture) = load_texture(ctx, "inference_frame", &frame.bytes) {
                    self.frame_texture = Some(texture);
                }
            }
        }

        let mut newest = None;
        loop {
            match self.live_frames.try_recv() {
                Ok(frame) => newest = Some(frame),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if let Some(frame) = newest {
            if self.state.live_view {
                if let Some(texture) = load_texture(ctx, "live_frame", &frame) {
                    self.live_texture = Some(texture);
                }
            }
        }
    }
}

fn load_texture(ctx: &egui::Context, name: &str, bytes: &[u8]) -> Option<egui::TextureHandle> {
    match image::load_from_memory(bytes) {
        Ok(image) => {
            let rgba = image.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let color = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            Some(ctx.load_texture(name, color, egui::TextureOptions::LINEAR))
        }
        Err(e) => {
            warn!("Frame not decodable: {}", e);
            None
        }
    }
}

impl eframe::App for EdgeWatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.refresh_textures(ctx);

        let session = self.console.session().clone();
        let stats = session.stats(chrono::Utc::now());

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.state.show_about = true;
                        ui.close_menu();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.console.streaming().is_running() {
                        ui.colored_label(EdgeWatchColors::PRIMARY, format!("⏺ STREAMING {} fps", self.console.streaming().fps()));
                    }
                    if self.console.config.gui.show_fps {
                        ui.label(format!("{:.0} FPS", 1.0 / ctx.input(|i| i.predicted_dt)));
                    }
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let health = session.health();
                let color = health
                    .as_ref()
                    .map(|h| condition_color(h.status))
                    .unwrap_or(EdgeWatchColors::MUTED);
                status_indicator(ui, color, &self.console.config.device.base_url);
                ui.separator();
                ui.label(format!("Frames: {}", stats.total_frames));
                ui.separator();
                ui.label(format!("Events: {}", session.event_count()));
                ui.separator();
                sparkline(ui, &stats.latency_history, 80.0, 14.0);
                if let Some(message) = &self.state.last_error {
                    ui.separator();
                    ui.colored_label(EdgeWatchColors::DEGRADED, message);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(chrono::Local::now().format("%H:%M:%S").to_string());
                });
            });
        });

        // Left panel - controls and health
        egui::SidePanel::left("control_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.control_panel.show(ui, &self.console, &self.runtime, &mut self.state);
                    ui.add_space(8.0);
                    self.health_panel.show(ui, &self.console);
                });
            });

        // Right panel - detections
        egui::SidePanel::right("event_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.event_panel.show(ui, &self.console, &mut self.state);
            });

        // Central panel - stats and preview
        egui::CentralPanel::default().show(ctx, |ui| {
            self.stats_panel.show(ui, &stats);
            ui.separator();

            if self.state.live_view {
                self.preview_panel.show(ui, self.live_texture.as_ref(), &OverlayCanvas::default());
            } else {
                self.preview_panel.show(ui, self.frame_texture.as_ref(), &session.canvas());
            }
        });

        // About window
        if self.state.show_about {
            egui::Window::new("About EdgeWatch")
                .open(&mut self.state.show_about)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("EdgeWatch");
                        ui.label(format!("Version {}", crate::VERSION));
                        ui.label("Edge inference device console");
                        ui.separator();
                        ui.label(format!("Uptime {} s", self.console.uptime()));
                    });
                });
        }

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
