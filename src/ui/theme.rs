// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Theme configuration

use eframe::egui;
use crate::config::Theme;
use crate::device::DeviceCondition;
use crate::overlay::Color;

/// Apply theme to egui context
pub fn apply_theme(ctx: &egui::Context, theme: Theme) {
    match theme {
        Theme::Dark => apply_dark_theme(ctx),
        Theme::Light => apply_light_theme(ctx),
    }
}

fn apply_dark_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.visuals = egui::Visuals::dark();

    style.visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(25, 25, 30);
    style.visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(35, 35, 40);
    style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(50, 50, 60);
    style.visuals.widgets.active.bg_fill = egui::Color32::from_rgb(60, 60, 70);

    style.visuals.selection.bg_fill = egui::Color32::from_rgb(0, 120, 80);

    style.visuals.panel_fill = egui::Color32::from_rgb(20, 20, 25);
    style.visuals.window_fill = egui::Color32::from_rgb(30, 30, 35);
    style.visuals.extreme_bg_color = egui::Color32::from_rgb(15, 15, 18);
    style.visuals.faint_bg_color = egui::Color32::from_rgb(35, 35, 40);

    style.visuals.window_rounding = egui::Rounding::same(6.0);
    style.visuals.menu_rounding = egui::Rounding::same(4.0);
    style.visuals.widgets.inactive.rounding = egui::Rounding::same(4.0);
    style.visuals.widgets.hovered.rounding = egui::Rounding::same(4.0);
    style.visuals.widgets.active.rounding = egui::Rounding::same(4.0);

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(12.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);

    ctx.set_style(style);
}

fn apply_light_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.visuals = egui::Visuals::light();

    style.visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(240, 240, 245);
    style.visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(230, 230, 235);
    style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(220, 220, 230);
    style.visuals.widgets.active.bg_fill = egui::Color32::from_rgb(200, 200, 220);

    style.visuals.panel_fill = egui::Color32::from_rgb(248, 248, 250);
    style.visuals.window_fill = egui::Color32::from_rgb(255, 255, 255);
    style.visuals.selection.bg_fill = egui::Color32::from_rgb(80, 170, 130);

    style.visuals.window_rounding = egui::Rounding::same(6.0);
    style.visuals.menu_rounding = egui::Rounding::same(4.0);

    ctx.set_style(style);
}

/// EdgeWatch colour palette
pub struct EdgeWatchColors;

impl EdgeWatchColors {
    pub const PRIMARY: egui::Color32 = egui::Color32::from_rgb(0, 255, 136);
    pub const LATENCY: egui::Color32 = egui::Color32::from_rgb(100, 200, 255);
    pub const P95: egui::Color32 = egui::Color32::from_rgb(255, 200, 100);
    pub const OK: egui::Color32 = egui::Color32::from_rgb(100, 255, 150);
    pub const DEGRADED: egui::Color32 = egui::Color32::from_rgb(255, 200, 100);
    pub const DANGER: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
    pub const MUTED: egui::Color32 = egui::Color32::from_rgb(120, 120, 130);
}

pub fn condition_color(condition: DeviceCondition) -> egui::Color32 {
    match condition {
        DeviceCondition::Ok => EdgeWatchColors::OK,
        DeviceCondition::Degraded => EdgeWatchColors::DEGRADED,
    }
}

/// Confidence 0..1 from red through yellow to green
pub fn confidence_color(confidence: f64) -> egui::Color32 {
    if confidence >= 0.75 {
        EdgeWatchColors::OK
    } else if confidence >= 0.5 {
        EdgeWatchColors::DEGRADED
    } else {
        EdgeWatchColors::DANGER
    }
}

pub fn to_color32(color: Color) -> egui::Color32 {
    let [r, g, b, a] = color.0;
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}
