use std::path::Path;

use plotters::prelude::*;

use super::{FONT, PlotError, PlotStyle, render_err, render_to_file};
use crate::color::generate_palette;

pub const TITLE: &str = "Random Forest Feature Importance";

/// One bar of the importance chart.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair names with weights and sort descending by weight.
/// The sort is stable: equal weights keep their column order.
pub fn importance_table(names: &[String], weights: &[f64]) -> Vec<FeatureImportance> {
    debug_assert_eq!(names.len(), weights.len());
    let mut table: Vec<FeatureImportance> = names
        .iter()
        .zip(weights)
        .map(|(name, &w)| FeatureImportance {
            feature: name.clone(),
            importance: w,
        })
        .collect();
    table.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    table
}

/// Delegates to `WithKeyPoints`, which lacks the `ValueFormatter` impl that
/// `configure_mesh` requires; labels come from `y_label_formatter` anyway.
struct SlotAxis(plotters::coord::combinators::WithKeyPoints<plotters::coord::types::RangedCoordf64>);

impl Ranged for SlotAxis {
    type ValueType = f64;
    type FormatOption = plotters::coord::ranged1d::DefaultFormatting;

    fn range(&self) -> std::ops::Range<f64> {
        self.0.range()
    }

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: plotters::coord::ranged1d::KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> std::ops::Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

/// Horizontal bar chart, largest weight at the top.
pub fn render(table: &[FeatureImportance], style: &PlotStyle, path: &Path) -> Result<(), PlotError> {
    let n = table.len();
    if n == 0 {
        return Err(PlotError::NoData("feature importance table is empty"));
    }

    let max = table.iter().map(|r| r.importance).fold(0.0, f64::max);
    let x_max = if max > 0.0 { max * 1.05 } else { 1.0 };
    let colours = generate_palette(n);

    let tick_px = style.tick_px();
    let axis_px = style.axis_px();
    let longest = table.iter().map(|r| r.feature.chars().count()).max().unwrap_or(0);
    // Room for the longest feature name plus the rotated axis title.
    let y_area = (longest as f64 * tick_px * 0.55 + axis_px * 1.8) as u32;
    let x_area = (tick_px * 1.6 + axis_px * 1.6) as u32;

    // Slot `s` spans `s..s + 1` and holds rank `n - 1 - s`, so rank 0 is on top.
    let slot_centres: Vec<f64> = (0..n).map(|slot| slot as f64 + 0.5).collect();
    let label_for = |v: &f64| {
        let slot = v.floor() as usize;
        n.checked_sub(slot + 1)
            .and_then(|rank| table.get(rank))
            .map(|r| r.feature.clone())
            .unwrap_or_default()
    };

    render_to_file(style, path, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(TITLE, (FONT, style.title_px()))
            .margin(tick_px as u32)
            .x_label_area_size(x_area)
            .y_label_area_size(y_area)
            .build_cartesian_2d(0.0..x_max, SlotAxis((0.0..n as f64).with_key_points(slot_centres)))
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&label_for)
            .x_labels(6)
            .x_label_formatter(&|v| format!("{v:.2}"))
            .x_desc("Importance")
            .y_desc("Feature")
            .axis_desc_style((FONT, axis_px))
            .label_style((FONT, tick_px))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(table.iter().enumerate().map(|(rank, row)| {
                let slot = (n - 1 - rank) as f64;
                Rectangle::new(
                    [(0.0, slot + 0.1), (row.importance, slot + 0.9)],
                    colours[rank].filled(),
                )
            }))
            .map_err(render_err)?;

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn table_is_sorted_descending() {
        let table = importance_table(&names(&["a", "b", "c"]), &[0.2, 0.5, 0.3]);
        let order: Vec<&str> = table.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert!(table.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn ties_keep_column_order() {
        let table = importance_table(&names(&["x", "y", "z"]), &[0.25, 0.5, 0.25]);
        let order: Vec<&str> = table.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, ["y", "x", "z"]);
    }

    #[test]
    fn empty_table_is_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(&[], &PlotStyle::default(), &dir.path().join("fi.png")).unwrap_err();
        assert!(matches!(err, PlotError::NoData(_)));
    }

    #[test]
    fn chart_is_written_as_png_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature_importance.png");
        std::fs::write(&path, b"old").unwrap();

        let table = importance_table(
            &names(&["alcohol", "volatile acidity", "sulphates", "pH"]),
            &[0.55, 0.25, 0.15, 0.05],
        );
        render(&table, &PlotStyle::default(), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (768, 576));
        assert!(img.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn single_feature_fills_the_whole_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.png");
        let table = importance_table(&names(&["alcohol"]), &[1.0]);
        render(&table, &PlotStyle::default(), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        let bar = generate_palette(1)[0];
        let rows: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 == [bar.0, bar.1, bar.2])
            .map(|(_, y, _)| y)
            .collect();
        let (top, bottom) = (*rows.iter().min().unwrap(), *rows.iter().max().unwrap());
        let height = img.height();
        assert!(top < height / 3, "bar starts at row {top}");
        assert!(bottom > 2 * height / 3, "bar ends at row {bottom}");
    }
}
