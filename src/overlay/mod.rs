// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Overlay renderer - maps model-space boxes onto a display surface

mod canvas;

pub use canvas::*;

use serde::{Deserialize, Serialize};

use crate::device::BoundingBox;

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color([r, g, b, a])
    }
}

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

/// Anything boxes and labels can be painted on
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Remove everything painted so far
    fn clear(&mut self);

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64);
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Text with its top-left corner at `(x, y)`
    fn fill_text(&mut self, x: f64, y: f64, text: &str, color: Color, font_size: f64);

    /// Width the text would occupy. Surfaces with real font metrics should
    /// override the monospace estimate.
    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * 0.6
    }
}

/// Colours and sizes used for boxes and tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub box_color: Color,
    pub tag_color: Color,
    pub text_color: Color,
    pub line_width: f64,
    pub font_size: f64,
    pub tag_padding: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: Color::rgb(0, 255, 136),
            tag_color: Color::rgba(0, 255, 136, 220),
            text_color: Color::rgb(0, 0, 0),
            line_width: 2.0,
            font_size: 14.0,
            tag_padding: 4.0,
        }
    }
}

/// Label text: `"<label> (<confidence %>%)"`
pub fn label_text(bbox: &BoundingBox) -> String {
    format!("{} ({}%)", bbox.label, (bbox.confidence * 100.0).round() as i64)
}

/// Paints detection boxes scaled from source-image to surface pixels
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
    enabled: bool,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle, enabled: bool) -> Self {
        Self { style, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Clear, then paint every box. Returns the number of boxes painted.
    ///
    /// Overlays never accumulate: the surface is always cleared first, and
    /// nothing else is drawn when the overlay is disabled or the source size
    /// is unknown.
    pub fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        detections: &[BoundingBox],
        source_width: f64,
        source_height: f64,
    ) -> usize {
        surface.clear();

        if !self.enabled || source_width <= 0.0 || source_height <= 0.0 {
            return 0;
        }

        let scale_x = surface.width() / source_width;
        let scale_y = surface.height() / source_height;
        let style = &self.style;

        for bbox in detections {
            let rect = Rect::new(
                bbox.x_min * scale_x,
                bbox.y_min * scale_y,
                bbox.width() * scale_x,
                bbox.height() * scale_y,
            );
            surface.stroke_rect(rect, style.box_color, style.line_width);

            let text = label_text(bbox);
            let tag_w = surface.measure_text(&text, style.font_size) + style.tag_padding * 2.0;
            let tag_h = style.font_size + style.tag_padding * 2.0;
            let tag_y = (rect.y - tag_h).max(0.0);

            surface.fill_rect(Rect::new(rect.x, tag_y, tag_w, tag_h), style.tag_color);
            surface.fill_text(
                rect.x + style.tag_padding,
                tag_y + style.tag_padding,
                &text,
                style.text_color,
                style.font_size,
            );
        }

        detections.len()
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default(), true)
    }
}
