/// Off-screen chart rendering.
///
/// Charts are drawn with plotters into an in-memory RGB buffer, the drawing
/// context is dropped, then the buffer is encoded by `image` according to the
/// output file extension.

pub mod importance;
pub mod residuals;

use std::fmt::Display;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub(crate) const FONT: &str = "sans-serif";

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("nothing to plot: {0}")]
    NoData(&'static str),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("canvas of {width}x{height} pixels is too small")]
    Canvas { width: u32, height: u32 },

    #[error("invalid jitter: {0}")]
    Jitter(#[from] rand_distr::NormalError),

    #[error("encoding {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub(crate) fn render_err<E: Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

// ---------------------------------------------------------------------------
// Figure geometry and typography
// ---------------------------------------------------------------------------

/// Figure size in inches, resolution, and font sizes in points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,
    pub title_pt: f64,
    pub axis_pt: f64,
    pub tick_pt: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width_in: 6.4,
            height_in: 4.8,
            dpi: 120.0,
            title_pt: 22.0,
            axis_pt: 18.0,
            tick_pt: 11.0,
        }
    }
}

impl PlotStyle {
    /// Canvas size in pixels.
    pub fn pixels(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    /// Convert a point size to pixels at this resolution.
    pub fn font_px(&self, pt: f64) -> f64 {
        pt * self.dpi / 72.0
    }

    pub fn title_px(&self) -> f64 {
        self.font_px(self.title_pt)
    }

    pub fn axis_px(&self) -> f64 {
        self.font_px(self.axis_pt)
    }

    pub fn tick_px(&self) -> f64 {
        self.font_px(self.tick_pt)
    }
}

// ---------------------------------------------------------------------------
// Buffer → file
// ---------------------------------------------------------------------------

/// Draw on a white canvas of `style.pixels()` and write it to `path`,
/// replacing any existing file.
pub(crate) fn render_to_file<F>(style: &PlotStyle, path: &Path, draw: F) -> Result<(), PlotError>
where
    F: for<'b> FnOnce(&DrawingArea<BitMapBackend<'b>, Shift>) -> Result<(), PlotError>,
{
    let (width, height) = style.pixels();
    if width < 64 || height < 64 {
        return Err(PlotError::Canvas { width, height });
    }

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        draw(&root)?;
        root.present().map_err(render_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or(PlotError::Canvas { width, height })?;
    image.save(path).map_err(|source| PlotError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("wrote {width}x{height} image to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_figure_is_768_by_576_at_120_dpi() {
        let style = PlotStyle::default();
        assert_eq!(style.pixels(), (768, 576));
        assert_eq!(style.font_px(18.0), 30.0);
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let style = PlotStyle {
            dpi: 5.0,
            ..PlotStyle::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = render_to_file(&style, &dir.path().join("x.png"), |_| Ok(())).unwrap_err();
        assert!(matches!(err, PlotError::Canvas { .. }));
    }

    #[test]
    fn blank_canvas_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        render_to_file(&PlotStyle::default(), &path, |_| Ok(())).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (768, 576));
        assert_eq!(img.get_pixel(10, 10).0, [255, 255, 255]);
    }
}
