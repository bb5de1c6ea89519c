//! Display size computation for the drawing surface.

use kurbo::Size;

/// Minimum logical width of the surface.
pub const DEFAULT_MIN_WIDTH: f64 = 240.0;

/// Base (and maximum) logical size; its ratio fixes the surface aspect.
pub const DEFAULT_BASE_SIZE: Size = Size::new(800.0, 350.0);

/// Measurements of the element that hosts the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    /// Container width in logical pixels, padding included.
    pub width: f64,
    /// Sum of left and right padding.
    pub horizontal_padding: f64,
    /// Device pixel ratio of the display showing the container.
    pub device_pixel_ratio: f64,
}

impl ContainerMetrics {
    pub fn new(width: f64, horizontal_padding: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            horizontal_padding,
            device_pixel_ratio,
        }
    }

    /// Device pixel ratio, falling back to 1 for unusable values.
    pub fn sanitized_ratio(&self) -> f64 {
        sanitize_ratio(self.device_pixel_ratio)
    }
}

/// Limits used when fitting the surface into its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRules {
    pub min_width: f64,
    /// Largest logical size; its width/height ratio is kept at every size.
    pub base_size: Size,
}

impl Default for SizingRules {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            base_size: DEFAULT_BASE_SIZE,
        }
    }
}

/// Logical and physical size of the surface for one layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    /// Size in logical (CSS) pixels.
    pub logical: Size,
    /// Backing store width in device pixels.
    pub physical_width: u32,
    /// Backing store height in device pixels.
    pub physical_height: u32,
    /// Ratio between the two.
    pub device_pixel_ratio: f64,
}

/// Properties of a host element that must change to show a display size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementUpdate {
    /// The backing store (device pixel) dimensions differ.
    pub backing_store: bool,
    /// The styled (logical) dimensions differ.
    pub css_size: bool,
}

impl ElementUpdate {
    pub fn is_empty(&self) -> bool {
        !self.backing_store && !self.css_size
    }
}

impl DisplaySize {
    /// Compare against the size last applied to an element.
    ///
    /// Zooming scales the logical size and the pixel ratio in opposite
    /// directions, so either side can change while the other stays put.
    pub fn element_update(&self, applied: Option<&DisplaySize>) -> ElementUpdate {
        match applied {
            None => ElementUpdate {
                backing_store: true,
                css_size: true,
            },
            Some(prev) => ElementUpdate {
                backing_store: prev.physical_width != self.physical_width
                    || prev.physical_height != self.physical_height,
                css_size: prev.logical != self.logical,
            },
        }
    }
}

impl SizingRules {
    /// Compute the display size for a container.
    pub fn display_size(&self, container: &ContainerMetrics) -> DisplaySize {
        let available = container.width - container.horizontal_padding;
        let available = if available.is_finite() { available } else { self.min_width };
        let width = available
            .min(self.base_size.width)
            .max(self.min_width)
            .floor();
        let height = (width * self.base_size.height / self.base_size.width).round().max(1.0);

        let ratio = container.sanitized_ratio();
        DisplaySize {
            logical: Size::new(width, height),
            physical_width: physical_extent(width, ratio),
            physical_height: physical_extent(height, ratio),
            device_pixel_ratio: ratio,
        }
    }
}

pub(crate) fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
}

fn physical_extent(logical: f64, ratio: f64) -> u32 {
    (logical * ratio).round().max(1.0) as u32
}
