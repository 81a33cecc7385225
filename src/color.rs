use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            from_hsl(hue, 0.65, 0.55)
        })
        .collect()
}

/// Single accent colour used for scatter markers.
pub fn accent() -> RGBColor {
    from_hsl(210.0, 0.60, 0.45)
}

fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> RGBColor {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    RGBColor(rgb.red, rgb.green, rgb.blue)
}
