use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Categorical palette (donut slices)
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diverging scale (country tiles)
// ---------------------------------------------------------------------------

const RED: (u8, u8, u8) = (0xd7, 0x30, 0x27);
const YELLOW: (u8, u8, u8) = (0xff, 0xff, 0xbf);
const GREEN: (u8, u8, u8) = (0x1a, 0x98, 0x50);

fn linear(c: (u8, u8, u8)) -> LinSrgb {
    Srgb::new(c.0, c.1, c.2).into_format::<f32>().into_linear()
}

/// Red → yellow → green for `t` in `0..=1`; out-of-range values are clamped.
pub fn red_yellow_green(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let mixed = if t < 0.5 {
        linear(RED).mix(linear(YELLOW), t * 2.0)
    } else {
        linear(YELLOW).mix(linear(GREEN), (t - 0.5) * 2.0)
    };
    to_color32(Srgb::from_linear(mixed))
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}
