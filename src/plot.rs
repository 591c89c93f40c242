//! Cost-curve charts.

use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SequencerError};
use crate::trainer::TrainHistory;

const CHART_SIZE: (u32, u32) = (800, 800);

fn plot_err<E: std::fmt::Display>(what: &str) -> impl Fn(E) -> SequencerError + '_ {
    move |e| SequencerError::Plot(format!("{what}: {e}"))
}

/// Axis range covering `values`, widened when all values coincide.
fn axis_range(values: impl Iterator<Item = f64> + Clone) -> std::ops::Range<f64> {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if (max - min).abs() < 1e-12 {
        return (min - 1.0)..(max + 1.0);
    }
    min..max
}

/// Scatter chart of (epoch, value) points with axes "epochs" / "cost".
pub fn render_cost_chart(path: &Path, title: &str, points: &[(f64, f64)]) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err("fill"))?;

    let x_range = axis_range(points.iter().map(|p| p.0));
    let y_range = axis_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err("build"))?;

    chart
        .configure_mesh()
        .x_desc("epochs")
        .y_desc("cost")
        .draw()
        .map_err(plot_err("mesh"))?;

    chart
        .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 2, BLUE.filled())))
        .map_err(plot_err("series"))?;

    root.present().map_err(plot_err("present"))?;
    Ok(())
}

/// Write `cost_abs.svg` and `cost_phase.svg` into `dir`.
pub fn render_history(history: &TrainHistory, dir: &Path) -> Result<Vec<PathBuf>> {
    let charts = [
        ("cost abs vs epochs", "cost_abs.svg", history.magnitude_points()),
        ("cost phase vs epochs", "cost_phase.svg", history.phase_points()),
    ];
    let mut written = Vec::with_capacity(charts.len());
    for (title, name, points) in charts {
        let path = dir.join(name);
        render_cost_chart(&path, title, &points)?;
        written.push(path);
    }
    Ok(written)
}
