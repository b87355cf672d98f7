//! Draw per-iteration loss curves of one pyramid level into a PNG file.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::loader::LossMatrix;

// Pixel sizes of matplotlib's 16pt title and y label and its default 10pt
// x label on a 100 dpi figure.
const TITLE_FONT_SIZE: u32 = 22;
const Y_DESC_FONT_SIZE: u32 = 22;
const X_DESC_FONT_SIZE: u32 = 14;
/// Gap between the x label baseline and the bottom edge of the figure.
const X_DESC_BOTTOM_GAP: i32 = 4;
const LINE_WIDTH: u32 = 1;

/// Errors raised while rendering a loss plot.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Loss matrix has no rows or no iterations")]
    EmptyMatrix,

    #[error("None of the sampled losses has a finite logarithm")]
    NoFiniteValues,

    #[error("Failed to draw plot: {0}")]
    Draw(String),
}

/// One plotted run: `(iteration, ln(loss))` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Row of the run in the loss matrix.
    pub row_index: usize,
    pub points: Vec<(i32, f64)>,
}

/// Everything needed to draw the figure, independent of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LossPlot {
    pub iterations: usize,
    pub curves: Vec<Curve>,
    pub x_ticks: Vec<i32>,
    pub y_range: Range<f64>,
}

impl LossPlot {
    /// Sample the matrix rows and take the natural log of every loss.
    pub fn from_matrix(matrix: &LossMatrix, config: &PlotConfig) -> Result<Self, RenderError> {
        if matrix.is_empty() {
            return Err(RenderError::EmptyMatrix);
        }

        let (_, iterations) = matrix.shape();
        let curves: Vec<Curve> = sample_rows(matrix, config.row_stride)
            .map(|(row_index, row)| Curve {
                row_index,
                points: log_series(row),
            })
            .collect();
        let y_range = value_range(&curves).ok_or(RenderError::NoFiniteValues)?;

        Ok(Self {
            iterations,
            curves,
            x_ticks: x_tick_positions(iterations, config.x_tick_step),
            y_range,
        })
    }
}

/// Rows `0, stride, 2 * stride, ...` of the matrix with their indices.
pub fn sample_rows(matrix: &LossMatrix, stride: usize) -> impl Iterator<Item = (usize, &[f64])> {
    (0..matrix.row_count())
        .step_by(stride.max(1))
        .filter_map(move |index| matrix.row(index).map(|row| (index, row)))
}

/// Natural log of each loss against its iteration index.
pub fn log_series(row: &[f64]) -> Vec<(i32, f64)> {
    row.iter().enumerate().map(|(i, loss)| (i as i32, loss.ln())).collect()
}

/// Tick positions `0, step, 2 * step, ...` below `iterations`.
pub fn x_tick_positions(iterations: usize, step: usize) -> Vec<i32> {
    (0..iterations).step_by(step.max(1)).map(|i| i as i32).collect()
}

/// Padded range over all finite values; `None` if there are none.
fn value_range(curves: &[Curve]) -> Option<Range<f64>> {
    let (min, max) = curves
        .iter()
        .flat_map(|curve| curve.points.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;

    let span = max - min;
    let padding = if span > 0.0 { span * 0.05 } else { 0.5 };
    Some(min - padding..max + padding)
}

/// Split a curve at non-finite values so each piece can be drawn as one line.
fn finite_segments(points: &[(i32, f64)]) -> Vec<Vec<(i32, f64)>> {
    points
        .split(|(_, y)| !y.is_finite())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_vec())
        .collect()
}

fn draw_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Render the loss curves of `matrix` and save them to `config.output_path`.
///
/// # Returns
///
/// Number of curves drawn.
pub fn render_loss_plot(matrix: &LossMatrix, config: &PlotConfig) -> Result<usize, RenderError> {
    let plot = LossPlot::from_matrix(matrix, config)?;
    log::debug!(
        "Drawing {} of {} runs over {} iterations",
        plot.curves.len(),
        matrix.row_count(),
        plot.iterations
    );

    let root = BitMapBackend::new(&config.output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let title_height = (config.height as f64 * config.title_margin).round() as i32;
    let (title_area, chart_area) = root.split_vertically(title_height);

    if title_height > 0 {
        let (title_width, _) = title_area.dim_in_pixel();
        let title_style = TextStyle::from(("sans-serif", TITLE_FONT_SIZE).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        title_area
            .draw_text(&config.title, &title_style, (title_width as i32 / 2, title_height / 2))
            .map_err(draw_error)?;
    }

    let last_iteration = plot.iterations.saturating_sub(1).max(1) as i32;
    let mut chart = ChartBuilder::on(&chart_area)
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..last_iteration).with_key_points(plot.x_ticks.clone()),
            plot.y_range.clone(),
        )
        .map_err(draw_error)?;

    // The mesh draws one description style for both axes, so the smaller x label is placed by hand.
    chart
        .configure_mesh()
        .y_desc(config.y_label.as_str())
        .x_label_formatter(&|x| x.to_string())
        .axis_desc_style(("sans-serif", Y_DESC_FONT_SIZE))
        .draw()
        .map_err(draw_error)?;

    let (plot_left, _) = chart.plotting_area().get_base_pixel();
    let (plot_width, _) = chart.plotting_area().dim_in_pixel();
    let x_desc_style = TextStyle::from(("sans-serif", X_DESC_FONT_SIZE).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
    root.draw_text(
        &config.x_label,
        &x_desc_style,
        (plot_left + plot_width as i32 / 2, config.height as i32 - X_DESC_BOTTOM_GAP),
    )
    .map_err(draw_error)?;

    for (series_index, curve) in plot.curves.iter().enumerate() {
        log::trace!("Run {} drawn as series {}", curve.row_index, series_index);
        let style = Palette99::pick(series_index).stroke_width(LINE_WIDTH);
        for segment in finite_segments(&curve.points) {
            chart.draw_series(LineSeries::new(segment, style)).map_err(draw_error)?;
        }
    }

    root.present().map_err(draw_error)?;
    Ok(plot.curves.len())
}
