//! Retained overlay surface

use serde::{Deserialize, Serialize};

use super::{Color, Rect, Surface};

/// A single painted primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayShape {
    StrokeRect { rect: Rect, color: Color, line_width: f64 },
    FillRect { rect: Rect, color: Color },
    Text { x: f64, y: f64, text: String, color: Color, font_size: f64 },
}

/// Display list of the last paint. A GUI replays it every frame.
#[derive(Debug, Clone, Default)]
pub struct OverlayCanvas {
    width: f64,
    height: f64,
    shapes: Vec<OverlayShape>,
    generation: u64,
}

impl OverlayCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
            generation: 0,
        }
    }

    /// Change the logical size. Existing shapes are dropped since they were
    /// scaled for the old size.
    pub fn resize(&mut self, width: f64, height: f64) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.clear();
        }
    }

    pub fn shapes(&self) -> &[OverlayShape] {
        &self.shapes
    }

    /// Bumped on every clear
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn boxes(&self) -> Vec<Rect> {
        self.shapes
            .iter()
            .filter_map(|s| match s {
                OverlayShape::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn tags(&self) -> Vec<Rect> {
        self.shapes
            .iter()
            .filter_map(|s| match s {
                OverlayShape::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.shapes
            .iter()
            .filter_map(|s| match s {
                OverlayShape::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for OverlayCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.generation += 1;
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f64) {
        self.shapes.push(OverlayShape::StrokeRect { rect, color, line_width });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.shapes.push(OverlayShape::FillRect { rect, color });
    }

    fn fill_text(&mut self, x: f64, y: f64, text: &str, color: Color, font_size: f64) {
        self.shapes.push(OverlayShape::Text {
            x,
            y,
            text: text.to_string(),
            color,
            font_size,
        });
    }
}
