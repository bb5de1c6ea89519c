//! Brush and background style shared by every draw operation.

use peniko::Color;
use tiny_skia::{LineCap, LineJoin, Paint, Stroke};

/// Default stroke color (black).
pub const DEFAULT_STROKE_COLOR: Color = Color::from_rgba8(0, 0, 0, 255);

/// Default background color (white).
pub const DEFAULT_BACKGROUND_COLOR: Color = Color::from_rgba8(255, 255, 255, 255);

/// Default brush width in logical pixels.
pub const DEFAULT_LINE_WIDTH: f64 = 5.0;

/// Upper bound for brush widths in logical pixels.
pub const DEFAULT_MAX_LINE_WIDTH: f64 = 100.0;

/// Current drawing style.
///
/// Always holds valid values so the first stroke renders before any control
/// has been touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleState {
    /// Color used for new line segments.
    pub stroke_color: Color,
    /// Fill shown behind all strokes.
    pub background_color: Color,
    /// Brush width in logical pixels.
    pub line_width: f64,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            stroke_color: DEFAULT_STROKE_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl StyleState {
    /// Paint for the current stroke color.
    pub fn stroke_paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(to_skia_color(self.stroke_color));
        paint.anti_alias = true;
        paint
    }

    /// Stroke settings with round joins and caps.
    pub fn stroke(&self) -> Stroke {
        Stroke {
            width: self.line_width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        }
    }
}

/// Coerce a width control value into a usable brush width.
///
/// Anything that is not a finite positive number yields `default`; values
/// above `max` are clamped.
pub fn parse_line_width(input: &str, default: f64, max: f64) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(width) if width.is_finite() && width > 0.0 => width.min(max),
        _ => {
            log::debug!("Ignoring line width {:?}, using {}", input, default);
            default
        }
    }
}

/// Parse a CSS hex color like "#ff0000" or "#f00".
pub fn parse_color(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::from_rgba8(r, g, b, 255))
        }
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
            Some(Color::from_rgba8(digit(0)?, digit(1)?, digit(2)?, 255))
        }
        _ => None,
    }
}

/// Format a color as "#rrggbb" for control inputs.
pub fn color_to_hex(color: Color) -> String {
    let c = color.to_rgba8();
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}

pub(crate) fn to_skia_color(color: Color) -> tiny_skia::Color {
    let c = color.to_rgba8();
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}
