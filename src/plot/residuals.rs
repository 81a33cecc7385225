use std::path::Path;

use plotters::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{FONT, PlotError, PlotStyle, render_err, render_to_file};
use crate::color::accent;

pub const TITLE: &str = "Residuals";

/// One held-out observation after jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualPoint {
    pub truth: f64,
    pub predicted: f64,
}

/// Add independent `N(0, sigma)` noise to every truth and every prediction.
///
/// Jitter only separates overlapping markers (integer-valued targets stack
/// otherwise); scores are computed before this step.
pub fn jittered_residuals<R: Rng + ?Sized>(
    truth: &[f64],
    predicted: &[f64],
    sigma: f64,
    rng: &mut R,
) -> Result<Vec<ResidualPoint>, PlotError> {
    debug_assert_eq!(truth.len(), predicted.len());
    let noise = Normal::new(0.0, sigma)?;
    let predicted: Vec<f64> = predicted.iter().map(|p| p + noise.sample(rng)).collect();
    Ok(truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| ResidualPoint {
            truth: t + noise.sample(rng),
            predicted: p,
        })
        .collect())
}

/// Shared, padded axis range covering both coordinates of every point.
fn square_range(points: &[ResidualPoint]) -> (f64, f64) {
    let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.truth).min(p.predicted), hi.max(p.truth).max(p.predicted))
    });
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad, hi + pad)
}

/// Scatter of predicted (x) against true (y) on equal axes.
pub fn render(
    points: &[ResidualPoint],
    target_name: &str,
    style: &PlotStyle,
    path: &Path,
) -> Result<(), PlotError> {
    if points.is_empty() {
        return Err(PlotError::NoData("no held-out predictions"));
    }
    if points.iter().any(|p| !p.truth.is_finite() || !p.predicted.is_finite()) {
        return Err(PlotError::Render("non-finite residual".to_string()));
    }

    let (lo, hi) = square_range(points);
    let tick_px = style.tick_px();
    let axis_px = style.axis_px();
    let label_area = (tick_px * 3.0 + axis_px * 1.6) as u32;
    let marker = accent();
    let x_desc = format!("Predicted {target_name}");
    let y_desc = format!("True {target_name}");

    render_to_file(style, path, |root| {
        let body = root
            .titled(TITLE, (FONT, style.title_px()))
            .map_err(render_err)?;

        // Same range on both axes plus equal label areas on a square region
        // keeps one unit the same length on x and y.
        let (w, h) = body.dim_in_pixel();
        let side = w.min(h);
        let body = body.shrink(((w - side) / 2, 0), (side, side));

        let mut chart = ChartBuilder::on(&body)
            .margin(tick_px as u32)
            .x_label_area_size(label_area)
            .y_label_area_size(label_area)
            .build_cartesian_2d(lo..hi, lo..hi)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc(x_desc.as_str())
            .y_desc(y_desc.as_str())
            .axis_desc_style((FONT, axis_px))
            .label_style((FONT, tick_px))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|p| Circle::new((p.predicted, p.truth), 4, marker.mix(0.7).filled())),
            )
            .map_err(render_err)?;

        Ok(())
    })
}
