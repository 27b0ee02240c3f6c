//! UI panels

use std::path::PathBuf;
use std::sync::Arc;
use eframe::egui;
use tokio::runtime::Handle;
use tracing::warn;

use super::plots::latency_plot;
use super::theme::{condition_color, to_color32, EdgeWatchColors};
use super::widgets::*;
use super::GuiState;
use crate::core::Console;
use crate::device::{InferenceRequest, StreamParams};
use crate::events::{EventFilter, LabelFilter};
use crate::overlay::{OverlayCanvas, OverlayShape, Surface};
use crate::telemetry::SessionStats;

/// Streaming, model and alarm controls
pub struct ControlPanel;

impl ControlPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&mut self, ui: &mut egui::Ui, console: &Arc<Console>, runtime: &Handle, state: &mut GuiState) {
        let model_loaded = console.session().model_loaded();

        ui.heading("Device");
        ui.separator();

        ui.horizontal(|ui| {
            led(ui, model_loaded, EdgeWatchColors::OK, 14.0);
            ui.label(if model_loaded { "Model loaded" } else { "Model not loaded" });
        });
        if ui.button("Load model").clicked() {
            let console = console.clone();
            runtime.spawn(async move {
                if let Err(e) = console.load_model().await {
                    warn!("Model load failed: {}", e);
                }
            });
        }

        ui.add_space(8.0);
        ui.heading("Streaming");
        ui.separator();

        let streaming = console.streaming();
        ui.horizontal(|ui| {
            if streaming.is_running() {
                if ui.button("⏹ Stop").clicked() {
                    streaming.stop();
                }
            } else if ui.add_enabled(model_loaded, egui::Button::new("▶ Start")).clicked() {
                if let Err(e) = streaming.start() {
                    state.last_error = Some(e.to_string());
                }
            }

            if ui.add_enabled(model_loaded, egui::Button::new("Infer once")).clicked() {
                let console = console.clone();
                runtime.spawn(async move {
                    if let Err(e) = console.infer_once(InferenceRequest::capture(true)).await {
                        warn!("Inference failed: {}", e);
                    }
                });
            }
        });

        let fps_changed = ui
            .add(egui::Slider::new(&mut state.fps, crate::config::MIN_FPS..=crate::config::MAX_FPS).text("fps"))
            .changed();
        if fps_changed {
            if let Err(e) = streaming.set_fps(state.fps) {
                state.last_error = Some(e.to_string());
            }
        }
        ui.small(format!("Dropped ticks: {}", streaming.dropped_ticks()));

        let mut overlay = console.session().overlay_enabled();
        if ui.checkbox(&mut overlay, "Draw overlay").changed() {
            console.session().set_overlay_enabled(overlay);
        }

        if let Some(live) = console.live_stream() {
            let params = StreamParams {
                fps: state.fps,
                overlay: state.live_overlay,
            };
            let live_changed = ui.checkbox(&mut state.live_view, "Live view").changed();
            let overlay_changed = ui
                .add_enabled(state.live_view, egui::Checkbox::new(&mut state.live_overlay, "Device overlay"))
                .changed();
            if live_changed && !state.live_view {
                live.stop();
            } else if live_changed {
                live.start(params);
            } else if state.live_view && (overlay_changed || fps_changed) {
                live.set_params(StreamParams {
                    fps: state.fps,
                    overlay: state.live_overlay,
                });
            }
        }

        ui.add_space(8.0);
        ui.heading("Alarm");
        ui.separator();

        match console.session().alarm() {
            Some(alarm) => {
                ui.horizontal(|ui| {
                    led(ui, alarm.active, EdgeWatchColors::DANGER, 14.0);
                    ui.label(if alarm.active { "Active" } else { "Idle" });
                    if !alarm.enabled {
                        ui.colored_label(EdgeWatchColors::MUTED, "(disabled)");
                    }
                });
                if let Some(at) = alarm.triggered_at {
                    ui.small(format!("Last trigger {}", at.format("%H:%M:%S")));
                }
            }
            None => {
                ui.colored_label(EdgeWatchColors::MUTED, "No alarm status yet");
            }
        }

        ui.horizontal(|ui| {
            if ui.button("Activate").clicked() {
                let console = console.clone();
                runtime.spawn(async move {
                    let _ = console.alarm().activate().await;
                });
            }
            if ui.button("Deactivate").clicked() {
                let console = console.clone();
                runtime.spawn(async move {
                    let _ = console.alarm().deactivate().await;
                });
            }
        });
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut state.trigger_seconds)
                    .clamp_range(0.5..=60.0)
                    .speed(0.1)
                    .suffix(" s"),
            );
            if ui.button("Trigger").clicked() {
                let console = console.clone();
                let duration = state.trigger_seconds;
                runtime.spawn(async move {
                    let _ = console.alarm().trigger(Some(duration)).await;
                });
            }
        });
    }
}

/// Health summary
pub struct HealthPanel;

impl HealthPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, ui: &mut egui::Ui, console: &Console) {
        ui.heading("Health");
        ui.separator();

        let Some(health) = console.session().health() else {
            ui.colored_label(EdgeWatchColors::MUTED, "Waiting for first health report");
            return;
        };

        status_indicator(ui, condition_color(health.status), &format!("{:?}", health.status));
        egui::Grid::new("health_grid").num_columns(2).show(ui, |ui| {
            ui.label("Camera");
            ui.label(match (health.camera.available, health.camera.using_mock) {
                (true, true) => "mock".to_string(),
                (true, false) => format!(
                    "{}x{} @ {:.0} fps",
                    health.camera.width, health.camera.height, health.camera.fps
                ),
                (false, _) => "unavailable".to_string(),
            });
            ui.end_row();

            ui.label("Model");
            ui.label(health.model.path.as_deref().unwrap_or("-"));
            ui.end_row();
        });
    }
}

/// Stat cards and the latency plot
pub struct StatsPanel;

impl StatsPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, ui: &mut egui::Ui, stats: &SessionStats) {
        ui.horizontal(|ui| {
            stat_card(ui, "avg latency", format!("{:.1} ms", stats.avg_latency_ms));
            stat_card(ui, "p95 latency", format!("{:.1} ms", stats.p95_latency_ms));
            stat_card(ui, "detections / min", format!("{:.0}", stats.detections_per_minute));
            stat_card(ui, "frames", stats.total_frames.to_string());
        });
        ui.add_space(4.0);
        latency_plot(ui, &stats.latency_history, stats.p95_latency_ms, 160.0);
    }
}

/// Detection event list with filters and export
pub struct EventPanel {
    export_path: String,
}

impl EventPanel {
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            export_path: export_dir.join("events.csv").to_string_lossy().into_owned(),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, console: &Console, state: &mut GuiState) {
        ui.heading("Detections");
        ui.separator();

        let labels = console.session().event_labels();
        let selected = match &state.label_filter {
            LabelFilter::All => "all".to_string(),
            LabelFilter::Label(label) => label.clone(),
        };
        egui::ComboBox::from_label("Label")
            .selected_text(selected)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut state.label_filter, LabelFilter::All, "all");
                for label in labels {
                    ui.selectable_value(&mut state.label_filter, LabelFilter::Label(label.clone()), label);
                }
            });
        ui.add(egui::Slider::new(&mut state.min_confidence, 0.0..=100.0).text("min %"));

        let filter = EventFilter::new(state.label_filter.clone(), state.min_confidence);
        let events = console.session().filter_events(&filter);

        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.export_path);
            if ui.button("Export").clicked() {
                match console.export_events(&filter, std::path::Path::new(&self.export_path)) {
                    Ok(n) => state.last_error = Some(format!("Exported {} events", n)),
                    Err(e) => state.last_error = Some(e.to_string()),
                }
            }
        });
        ui.small(format!("{} of {} events", events.len(), console.session().event_count()));
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            for event in &events {
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        ui.strong(event.timestamp.format("%H:%M:%S").to_string());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.small(format!("{:.0} ms", event.metadata.inference_ms));
                        });
                    });
                    ui.horizontal_wrapped(|ui| {
                        for detection in &event.detections {
                            confidence_badge(ui, &detection.label, detection.confidence);
                        }
                    });
                });
            }
        });
    }
}

/// Latest frame with the overlay canvas replayed on top
pub struct PreviewPanel;

impl PreviewPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, ui: &mut egui::Ui, texture: Option<&egui::TextureHandle>, canvas: &OverlayCanvas) {
        let available = ui.available_size();
        let aspect = if canvas.height() > 0.0 { canvas.width() / canvas.height() } else { 4.0 / 3.0 };
        let width = available.x.min(available.y * aspect as f32).max(1.0);
        let size = egui::vec2(width, width / aspect as f32);

        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;

        painter.rect_filled(rect, 2.0, egui::Color32::from_gray(15));
        match texture {
            Some(texture) => {
                painter.image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No frame yet",
                    egui::FontId::proportional(16.0),
                    EdgeWatchColors::MUTED,
                );
            }
        }

        replay_overlay(&painter, rect, canvas);
    }
}

/// Draw the canvas display list scaled into `rect`
fn replay_overlay(painter: &egui::Painter, rect: egui::Rect, canvas: &OverlayCanvas) {
    if canvas.width() <= 0.0 || canvas.height() <= 0.0 {
        return;
    }
    let sx = rect.width() / canvas.width() as f32;
    let sy = rect.height() / canvas.height() as f32;
    let to_screen = |r: &crate::overlay::Rect| {
        egui::Rect::from_min_size(
            rect.min + egui::vec2(r.x as f32 * sx, r.y as f32 * sy),
            egui::vec2(r.w as f32 * sx, r.h as f32 * sy),
        )
    };

    for shape in canvas.shapes() {
        match shape {
            OverlayShape::StrokeRect { rect: r, color, line_width } => {
                painter.rect_stroke(to_screen(r), 0.0, egui::Stroke::new(*line_width as f32, to_color32(*color)));
            }
            OverlayShape::FillRect { rect: r, color } => {
                painter.rect_filled(to_screen(r), 0.0, to_color32(*color));
            }
            OverlayShape::Text { x, y, text, color, font_size } => {
                painter.text(
                    rect.min + egui::vec2(*x as f32 * sx, *y as f32 * sy),
                    egui::Align2::LEFT_TOP,
                    text,
                    egui::FontId::monospace(*font_size as f32 * sy.min(sx).max(0.5)),
                    to_color32(*color),
                );
            }
        }
    }
}
