//! Plot utilities

use eframe::egui;
use egui_plot::{HLine, Legend, Line, Plot, PlotPoints};

use super::theme::EdgeWatchColors;

/// Latency history, oldest sample at x = 0, with the p95 marked
pub fn latency_plot(ui: &mut egui::Ui, history: &[f64], p95: f64, height: f32) {
    let plot = Plot::new("latency_history")
        .height(height)
        .legend(Legend::default())
        .show_axes(true)
        .show_grid(true)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .include_y(0.0)
        .y_axis_label("ms");

    plot.show(ui, |plot_ui| {
        let points: PlotPoints = history
            .iter()
            .enumerate()
            .map(|(i, &v)| [i as f64, v])
            .collect();

        plot_ui.line(
            Line::new(points)
                .color(EdgeWatchColors::LATENCY)
                .width(1.5)
                .name("latency"),
        );

        if !history.is_empty() {
            plot_ui.hline(HLine::new(p95).color(EdgeWatchColors::P95).name("p95"));
        }
    });
}
