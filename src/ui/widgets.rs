// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Custom UI widgets

use eframe::egui;

use super::theme::{confidence_color, EdgeWatchColors};

/// Status indicator (coloured dot with label)
pub fn status_indicator(ui: &mut egui::Ui, color: egui::Color32, label: &str) {
    ui.horizontal(|ui| {
        ui.colored_label(color, "●");
        ui.label(label);
    });
}

/// LED indicator
pub fn led(ui: &mut egui::Ui, on: bool, on_color: egui::Color32, size: f32) {
    let color = if on { on_color } else { egui::Color32::from_rgb(50, 50, 50) };

    let (response, painter) = ui.allocate_painter(egui::vec2(size, size), egui::Sense::hover());
    let center = response.rect.center();

    // Glow effect
    if on {
        let [r, g, b, _] = on_color.to_array();
        painter.circle_filled(center, size * 0.4, egui::Color32::from_rgba_unmultiplied(r, g, b, 50));
    }

    painter.circle_filled(center, size * 0.3, color);
}

/// Large number with a caption underneath
pub fn stat_card(ui: &mut egui::Ui, caption: &str, value: String) {
    egui::Frame::none()
        .fill(egui::Color32::from_gray(30))
        .inner_margin(8.0)
        .rounding(4.0)
        .show(ui, |ui| {
            ui.set_min_width(110.0);
            ui.vertical(|ui| {
                ui.heading(value);
                ui.small(caption);
            });
        });
}

/// `label 87%` chip coloured by confidence
pub fn confidence_badge(ui: &mut egui::Ui, label: &str, confidence: f64) {
    egui::Frame::none()
        .fill(confidence_color(confidence).linear_multiply(0.35))
        .inner_margin(egui::Margin::symmetric(6.0, 2.0))
        .rounding(4.0)
        .show(ui, |ui| {
            ui.colored_label(
                egui::Color32::WHITE,
                format!("{} {}%", label, (confidence * 100.0).round() as i64),
            );
        });
}

/// Sparkline (minimal inline chart)
pub fn sparkline(ui: &mut egui::Ui, data: &[f64], width: f32, height: f32) {
    if data.len() < 2 {
        return;
    }

    let (response, painter) = ui.allocate_painter(egui::vec2(width, height), egui::Sense::hover());
    let rect = response.rect;

    let min = data.iter().fold(f64::MAX, |a, &b| a.min(b));
    let max = data.iter().fold(f64::MIN, |a, &b| a.max(b));
    let range = (max - min).max(1e-10);

    let step = rect.width() / (data.len() - 1) as f32;

    let points: Vec<egui::Pos2> = data
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = rect.left() + i as f32 * step;
            let y = rect.bottom() - (((v - min) / range) as f32 * rect.height());
            egui::pos2(x, y)
        })
        .collect();

    painter.add(egui::Shape::line(
        points,
        egui::Stroke::new(1.0, EdgeWatchColors::LATENCY),
    ));
}
