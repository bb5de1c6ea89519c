//! The raster drawing surface.
//!
//! Ink is kept in a transparent pixmap at physical (device pixel) resolution
//! and every draw call is expressed in logical units through a transform
//! scaled by the device pixel ratio. The visible image is the background fill
//! with the ink composited on top.

use crate::error::{SketchError, SketchResult};
use crate::sizing::DisplaySize;
use crate::snapshot::{self, SnapshotResult};
use crate::style::{StyleState, to_skia_color};
use kurbo::{Point, Size};
use peniko::Color;
use tiny_skia::{
    ColorU8, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Per-surface drawing state, reset whenever the backing store is replaced.
#[derive(Debug, Clone)]
struct DrawContext {
    transform: Transform,
    paint: Paint<'static>,
    stroke: Stroke,
    background: Color,
}

impl DrawContext {
    fn reset(ratio: f64) -> Self {
        let base = StyleState::default();
        Self {
            transform: Transform::identity().pre_scale(ratio as f32, ratio as f32),
            paint: base.stroke_paint(),
            stroke: base.stroke(),
            background: base.background_color,
        }
    }
}

/// A resizable raster surface.
pub struct Surface {
    ink: Pixmap,
    display: DisplaySize,
    context: DrawContext,
    /// Whether anything has been drawn since creation or the last clear.
    has_content: bool,
}

impl Surface {
    /// Create a blank surface for the given display size.
    pub fn new(display: DisplaySize) -> SketchResult<Self> {
        Ok(Self {
            ink: allocate(&display)?,
            context: DrawContext::reset(display.device_pixel_ratio),
            display,
            has_content: false,
        })
    }

    /// Replace the backing store. Content is discarded and the draw context
    /// is reset; callers reapply style and restore content themselves.
    pub fn resize(&mut self, display: DisplaySize) -> SketchResult<()> {
        self.ink = allocate(&display)?;
        self.context = DrawContext::reset(display.device_pixel_ratio);
        self.display = display;
        self.has_content = false;
        Ok(())
    }

    /// Apply style state to the draw context.
    pub fn apply_style(&mut self, style: &StyleState) {
        self.context.paint = style.stroke_paint();
        self.context.stroke = style.stroke();
        self.context.background = style.background_color;
    }

    /// Draw a straight segment between two logical points.
    pub fn draw_segment(&mut self, from: Point, to: Point) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.x as f32, from.y as f32);
        pb.line_to(to.x as f32, to.y as f32);
        let Some(path) = pb.finish() else {
            log::debug!("Skipping degenerate segment {:?} -> {:?}", from, to);
            return;
        };

        self.ink.stroke_path(
            &path,
            &self.context.paint,
            &self.context.stroke,
            self.context.transform,
            None,
        );
        self.has_content = true;
    }

    /// Erase all ink, leaving only the background fill visible.
    pub fn clear(&mut self) {
        self.ink.fill(tiny_skia::Color::TRANSPARENT);
        self.has_content = false;
    }

    /// Replace the ink with images stretched over the logical bounds,
    /// bottom layer first.
    pub fn replace_with_images(&mut self, images: &[Pixmap]) {
        if images.is_empty() {
            return;
        }
        self.ink = self.stretched_stack(images);
        self.has_content = true;
    }

    /// Draw images stretched over the logical bounds beneath the current ink.
    pub fn underlay_images(&mut self, images: &[Pixmap]) {
        if images.is_empty() {
            return;
        }
        let mut base = self.stretched_stack(images);
        if self.has_content {
            base.draw_pixmap(
                0,
                0,
                self.ink.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        self.ink = base;
        self.has_content = true;
    }

    /// Composite images, each stretched to the ink size, into a fresh pixmap.
    fn stretched_stack(&self, images: &[Pixmap]) -> Pixmap {
        let (width, height) = (self.ink.width(), self.ink.height());
        let mut out = self.ink.clone();
        out.fill(tiny_skia::Color::TRANSPARENT);

        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        for (i, image) in images.iter().enumerate() {
            if i == 0 && image.width() == width && image.height() == height {
                out.data_mut().copy_from_slice(image.data());
                continue;
            }
            let sx = width as f32 / image.width() as f32;
            let sy = height as f32 / image.height() as f32;
            out.draw_pixmap(0, 0, image.as_ref(), &paint, Transform::from_scale(sx, sy), None);
        }
        out
    }

    /// Encode the ink as a PNG data URL, or `None` when nothing was drawn.
    pub fn capture_ink(&self) -> SnapshotResult<Option<String>> {
        if !self.has_content {
            return Ok(None);
        }
        let png = snapshot::encode_pixmap(&self.ink)?;
        Ok(Some(snapshot::to_data_url(&png)))
    }

    /// The visible raster: background fill with ink on top.
    pub fn composite(&self) -> Pixmap {
        let mut out = self.ink.clone();
        out.fill(to_skia_color(self.context.background));
        out.draw_pixmap(
            0,
            0,
            self.ink.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        out
    }

    /// Straight-alpha RGBA bytes of the visible raster.
    pub fn composite_rgba(&self) -> Vec<u8> {
        snapshot::pixmap_to_rgba(&self.composite())
    }

    /// Visible color at a logical position.
    pub fn pixel_at(&self, point: Point) -> Option<ColorU8> {
        let ratio = self.display.device_pixel_ratio;
        let x = (point.x * ratio).floor();
        let y = (point.y * ratio).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.composite()
            .pixel(x as u32, y as u32)
            .map(|px| px.demultiply())
    }

    /// Whether anything has been drawn since creation or the last clear.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    /// Size in logical pixels.
    pub fn logical_size(&self) -> Size {
        self.display.logical
    }

    /// Backing store size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (self.display.physical_width, self.display.physical_height)
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.display.device_pixel_ratio
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    /// Background currently applied to the draw context.
    pub fn background(&self) -> Color {
        self.context.background
    }

    /// Transparent ink pixmap.
    pub fn ink(&self) -> &Pixmap {
        &self.ink
    }
}

fn allocate(display: &DisplaySize) -> SketchResult<Pixmap> {
    Pixmap::new(display.physical_width, display.physical_height)
        .ok_or(SketchError::Allocation(display.physical_width, display.physical_height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::{ContainerMetrics, SizingRules};

    fn display(width: f64, ratio: f64) -> DisplaySize {
        SizingRules::default().display_size(&ContainerMetrics::new(width, 0.0, ratio))
    }

    fn is_white(px: ColorU8) -> bool {
        px.red() == 255 && px.green() == 255 && px.blue() == 255 && px.alpha() == 255
    }

    fn is_dark(px: ColorU8) -> bool {
        px.red() < 64 && px.green() < 64 && px.blue() < 64
    }

    #[test]
    fn test_new_surface_shows_background() {
        let surface = Surface::new(display(400.0, 1.0)).unwrap();
        assert!(!surface.has_content());
        assert!(is_white(surface.pixel_at(Point::new(10.0, 10.0)).unwrap()));
    }

    #[test]
    fn test_segment_is_drawn_in_logical_units() {
        let mut surface = Surface::new(display(400.0, 2.0)).unwrap();
        surface.apply_style(&StyleState::default());
        surface.draw_segment(Point::new(20.0, 50.0), Point::new(120.0, 50.0));

        assert!(surface.has_content());
        assert_eq!(surface.physical_size(), (800, 350));
        assert!(is_dark(surface.pixel_at(Point::new(70.0, 50.0)).unwrap()));
        assert!(is_white(surface.pixel_at(Point::new(70.0, 80.0)).unwrap()));
        assert!(is_white(surface.pixel_at(Point::new(160.0, 50.0)).unwrap()));
    }

    #[test]
    fn test_clear_removes_ink() {
        let mut surface = Surface::new(display(400.0, 1.0)).unwrap();
        surface.draw_segment(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        surface.clear();
        assert!(!surface.has_content());
        assert!(surface.ink().pixels().iter().all(|px| px.alpha() == 0));
    }

    #[test]
    fn test_resize_resets_context() {
        let mut surface = Surface::new(display(400.0, 1.0)).unwrap();
        let style = StyleState {
            background_color: Color::from_rgba8(255, 0, 0, 255),
            ..StyleState::default()
        };
        surface.apply_style(&style);
        surface.draw_segment(Point::new(0.0, 0.0), Point::new(100.0, 100.0));

        surface.resize(display(600.0, 1.0)).unwrap();
        assert_eq!(surface.logical_size(), Size::new(600.0, 263.0));
        assert!(!surface.has_content());
        assert_eq!(surface.background(), StyleState::default().background_color);
    }

    #[test]
    fn test_capture_is_none_without_content() {
        let surface = Surface::new(display(400.0, 1.0)).unwrap();
        assert!(surface.capture_ink().unwrap().is_none());
    }

    #[test]
    fn test_stretched_image_scales_content() {
        let mut small = Surface::new(display(400.0, 1.0)).unwrap();
        small.apply_style(&StyleState {
            line_width: 10.0,
            ..StyleState::default()
        });
        small.draw_segment(Point::new(0.0, 100.0), Point::new(400.0, 100.0));
        let url = small.capture_ink().unwrap().unwrap();
        let image = snapshot::decode_data_url(&url).unwrap();

        let mut large = Surface::new(display(800.0, 1.0)).unwrap();
        large.replace_with_images(&[image]);
        // Line at y=100 of 175 maps to y=200 of 350.
        assert!(is_dark(large.pixel_at(Point::new(400.0, 200.0)).unwrap()));
        assert!(is_white(large.pixel_at(Point::new(400.0, 100.0)).unwrap()));
    }

    #[test]
    fn test_same_size_image_is_copied_exactly() {
        let mut surface = Surface::new(display(400.0, 1.0)).unwrap();
        surface.draw_segment(Point::new(10.0, 10.0), Point::new(300.0, 120.0));
        let before = surface.ink().clone();

        let url = surface.capture_ink().unwrap().unwrap();
        let image = snapshot::decode_data_url(&url).unwrap();
        surface.replace_with_images(&[image]);

        assert_eq!(surface.ink().data(), before.data());
    }

    #[test]
    fn test_underlay_keeps_existing_ink_on_top() {
        let mut old = Surface::new(display(400.0, 1.0)).unwrap();
        old.apply_style(&StyleState {
            line_width: 10.0,
            ..StyleState::default()
        });
        old.draw_segment(Point::new(0.0, 40.0), Point::new(400.0, 40.0));
        let image = snapshot::decode_data_url(&old.capture_ink().unwrap().unwrap()).unwrap();

        let mut surface = Surface::new(display(400.0, 1.0)).unwrap();
        surface.apply_style(&StyleState {
            stroke_color: Color::from_rgba8(255, 0, 0, 255),
            line_width: 10.0,
            ..StyleState::default()
        });
        surface.draw_segment(Point::new(0.0, 120.0), Point::new(400.0, 120.0));
        surface.draw_segment(Point::new(200.0, 0.0), Point::new(200.0, 175.0));
        surface.underlay_images(&[image]);

        assert!(is_dark(surface.pixel_at(Point::new(100.0, 40.0)).unwrap()));
        let red = surface.pixel_at(Point::new(100.0, 120.0)).unwrap();
        assert_eq!((red.red(), red.green(), red.blue()), (255, 0, 0));
        // Newer ink covers the restored line where they cross.
        let crossing = surface.pixel_at(Point::new(200.0, 40.0)).unwrap();
        assert_eq!((crossing.red(), crossing.green(), crossing.blue()), (255, 0, 0));
    }

    #[test]
    fn test_replace_discards_existing_ink() {
        let blank = Surface::new(display(400.0, 1.0)).unwrap();
        let empty = blank.ink().clone();

        let mut surface = Surface::new(display(400.0, 1.0)).unwrap();
        surface.draw_segment(Point::new(0.0, 40.0), Point::new(400.0, 40.0));
        surface.replace_with_images(&[empty]);
        assert!(is_white(surface.pixel_at(Point::new(100.0, 40.0)).unwrap()));
    }
}
