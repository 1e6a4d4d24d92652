use std::path::Path;

use plotters::prelude::*;

use crate::error::{EvalError, Result};
use crate::report::plot::{PlotPanel, PlotSpec};

const PANEL_WIDTH: u32 = 420;
const PANEL_HEIGHT: u32 = 320;
const MAX_PANEL_COLUMNS: usize = 3;
const BOX_HALF_WIDTH: f64 = 0.25;

fn plot_err(err: impl std::fmt::Display) -> EvalError {
    EvalError::Plot(err.to_string())
}

/// Draws one box-plot panel per metric on a grid, at most three panels wide.
pub fn render_plot_svg(spec: &PlotSpec, path: &Path) -> Result<()> {
    if spec.panels.is_empty() {
        return Err(EvalError::Plot("no metrics to plot".to_string()));
    }
    let cols = spec.panels.len().min(MAX_PANEL_COLUMNS);
    let rows = spec.panels.len().div_ceil(cols);

    let root = SVGBackend::new(path, (cols as u32 * PANEL_WIDTH, rows as u32 * PANEL_HEIGHT))
        .into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((rows, cols));
    for (panel, area) in spec.panels.iter().zip(areas.iter()) {
        draw_panel(panel, spec, area)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_panel(
    panel: &PlotPanel,
    spec: &PlotSpec,
    area: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
) -> Result<()> {
    let n = panel.series.len().max(1);
    let labels: Vec<&str> = panel.series.iter().map(|s| s.label.as_str()).collect();
    let (y_lo, y_hi) = spec.y_range;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.metric, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_lo..y_hi)
        .map_err(plot_err)?;

    let label_at = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).map(|l| l.to_string()).unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_at)
        .y_labels(spec.y_ticks.len() + 1)
        .y_label_formatter(&|y| format!("{y:.1}"))
        .draw()
        .map_err(plot_err)?;

    for (i, series) in panel.series.iter().enumerate() {
        let x = i as f64;
        let s = &series.stats;
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(left, s.q1), (right, s.q3)],
                BLUE.mix(0.25).filled(),
            )))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(left, s.q1), (right, s.q3)],
                BLUE.stroke_width(1),
            )))
            .map_err(plot_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(left, s.median), (right, s.median)],
                BLACK.stroke_width(2),
            )))
            .map_err(plot_err)?;

        let cap = BOX_HALF_WIDTH / 2.0;
        for (from, to) in [(s.q1, s.whisker_low), (s.q3, s.whisker_high)] {
            chart
                .draw_series([
                    PathElement::new(vec![(x, from), (x, to)], BLACK),
                    PathElement::new(vec![(x - cap, to), (x + cap, to)], BLACK),
                ])
                .map_err(plot_err)?;
        }

        chart
            .draw_series(s.outliers.iter().map(|v| Circle::new((x, *v), 4, RED)))
            .map_err(plot_err)?;

        let spread = BOX_HALF_WIDTH * 0.8;
        let n_points = series.points.len();
        chart
            .draw_series(series.points.iter().enumerate().map(|(j, v)| {
                let offset = if n_points > 1 {
                    -spread + 2.0 * spread * j as f64 / (n_points - 1) as f64
                } else {
                    0.0
                };
                Circle::new((x + offset, *v), 2, BLACK.mix(0.6).filled())
            }))
            .map_err(plot_err)?;
    }
    Ok(())
}
