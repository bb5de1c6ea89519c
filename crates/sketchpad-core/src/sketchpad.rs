//! Application state tying the surface, stroke capture and persistence
//! together.

use crate::config::SketchConfig;
use crate::decode::{Completion, DecodeJob, DecodeOutcome, DecodePurpose, DecodeTracker};
use crate::error::{SketchError, SketchResult};
use crate::notice::Notice;
use crate::sizing::{ContainerMetrics, SizingRules};
use crate::snapshot;
use crate::storage::SnapshotStore;
use crate::stroke::{PointerButton, PointerCapture, PointerId, PointerInput, StrokeSession};
use crate::style::{self, StyleState};
use crate::surface::Surface;
use kurbo::Point;
use tiny_skia::ColorU8;

/// An encoded image ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// A freehand drawing surface with its style, stroke session and storage.
pub struct Sketchpad<S: SnapshotStore> {
    config: SketchConfig,
    rules: SizingRules,
    style: StyleState,
    surface: Surface,
    session: StrokeSession,
    decoder: DecodeTracker,
    store: S,
    notices: Vec<Notice>,
}

impl<S: SnapshotStore> Sketchpad<S> {
    /// Create a sketchpad sized for `container`.
    pub fn new(config: SketchConfig, store: S, container: ContainerMetrics) -> SketchResult<Self> {
        config.validate()?;
        let rules = config.sizing_rules();
        let style = config.initial_style();
        let display = rules.display_size(&container);

        let mut surface = Surface::new(display)?;
        surface.apply_style(&style);

        log::info!(
            "Sketchpad initialized - {}x{} logical, {}x{} physical",
            display.logical.width,
            display.logical.height,
            display.physical_width,
            display.physical_height
        );

        Ok(Self {
            config,
            rules,
            style,
            surface,
            session: StrokeSession::new(),
            decoder: DecodeTracker::new(),
            store,
            notices: Vec::new(),
        })
    }

    // --- Sizing ---

    /// Fit the surface to `container` and schedule the restore of its
    /// previous content, scaled to the new size.
    pub fn resize_and_restore(&mut self, container: ContainerMetrics) -> SketchResult<()> {
        let snapshot = self.surface.capture_ink()?;
        let display = self.rules.display_size(&container);

        self.surface.resize(display)?;
        self.surface.apply_style(&self.style);

        let restore = self.decoder.issue_restore(snapshot);
        log::info!(
            "Resized to {}x{} (dpr {}), restore generation {:?}",
            display.logical.width,
            display.logical.height,
            display.device_pixel_ratio,
            restore
        );
        Ok(())
    }

    // --- Stroke capture ---

    /// Dispatch a pointer event. Returns true if a segment was drawn.
    pub fn handle_pointer(&mut self, input: PointerInput, capture: &mut dyn PointerCapture) -> bool {
        match self.session.handle(input, capture) {
            Some(segment) => {
                self.surface.draw_segment(segment.from, segment.to);
                true
            }
            None => false,
        }
    }

    pub fn pointer_down(
        &mut self,
        pointer_id: PointerId,
        position: Point,
        button: PointerButton,
        capture: &mut dyn PointerCapture,
    ) {
        self.session.pointer_down(pointer_id, position, button, capture);
    }

    pub fn pointer_move(&mut self, pointer_id: PointerId, position: Point) -> bool {
        self.handle_pointer(
            PointerInput::Move {
                pointer_id,
                position,
            },
            &mut crate::stroke::NoCapture,
        )
    }

    pub fn pointer_up(&mut self, pointer_id: PointerId, capture: &mut dyn PointerCapture) {
        self.session.pointer_end(pointer_id, capture);
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_drawing()
    }

    // --- Controls ---

    /// Set the color of subsequent segments.
    pub fn set_stroke_color(&mut self, color: &str) -> SketchResult<()> {
        let color =
            style::parse_color(color).ok_or_else(|| SketchError::InvalidColor(color.to_string()))?;
        self.style.stroke_color = color;
        self.surface.apply_style(&self.style);
        Ok(())
    }

    /// Set the background; existing strokes stay visible on top of it.
    pub fn set_background_color(&mut self, color: &str) -> SketchResult<()> {
        let color =
            style::parse_color(color).ok_or_else(|| SketchError::InvalidColor(color.to_string()))?;
        self.style.background_color = color;
        self.surface.apply_style(&self.style);
        log::debug!("Background set to {}", style::color_to_hex(color));
        Ok(())
    }

    /// Set the brush width from a control value, returning the width used.
    pub fn set_line_width(&mut self, width: &str) -> f64 {
        let width = style::parse_line_width(width, self.config.line_width, self.config.max_line_width);
        self.style.line_width = width;
        self.surface.apply_style(&self.style);
        width
    }

    /// Erase all strokes, leaving the background fill.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.decoder.invalidate();
        log::info!("Surface cleared");
    }

    // --- Persistence & export ---

    /// Persist the visible raster and return it as a PNG download.
    ///
    /// A storage failure is reported as a notice; the download is still
    /// returned.
    pub fn save(&mut self) -> SketchResult<SavedImage> {
        let png = snapshot::encode_pixmap(&self.surface.composite())?;
        let data_url = snapshot::to_data_url(&png);

        match self.store.set(&self.config.storage_key, &data_url) {
            Ok(()) => {
                log::info!("Saved drawing ({} bytes)", png.len());
                self.notices.push(Notice::Saved);
            }
            Err(e) => {
                log::error!("Failed to persist drawing: {}", e);
                self.notices.push(Notice::StorageFailed(e.to_string()));
            }
        }

        Ok(SavedImage {
            file_name: self.config.export_file_name.clone(),
            png,
        })
    }

    /// Load the persisted drawing. Returns false if nothing was saved.
    ///
    /// The image is drawn once its decode job completes.
    pub fn retrieve(&mut self) -> SketchResult<bool> {
        let saved = match self.store.get(&self.config.storage_key) {
            Ok(saved) => saved,
            Err(e) => {
                self.notices.push(Notice::StorageFailed(e.to_string()));
                return Err(e.into());
            }
        };
        match saved {
            Some(data_url) => {
                let generation = self.decoder.issue(DecodePurpose::Retrieve, vec![data_url]);
                log::info!("Retrieving saved drawing (generation {})", generation);
                Ok(true)
            }
            None => {
                log::info!("No saved drawing under {:?}", self.config.storage_key);
                self.notices.push(Notice::NoSavedDrawing);
                Ok(false)
            }
        }
    }

    /// Remove the persisted drawing.
    pub fn delete_saved(&mut self) -> SketchResult<()> {
        self.store.remove(&self.config.storage_key)?;
        Ok(())
    }

    // --- Decoding ---

    /// Decode jobs the host should run.
    pub fn take_decode_jobs(&mut self) -> Vec<DecodeJob> {
        self.decoder.take_jobs()
    }

    /// Apply a finished decode. Returns true if the raster changed.
    pub fn complete_decode(&mut self, outcome: DecodeOutcome) -> bool {
        let purpose = outcome.purpose;
        match self.decoder.complete(outcome) {
            Completion::Apply(layers) => {
                match purpose {
                    DecodePurpose::Restore => self.surface.underlay_images(&layers),
                    DecodePurpose::Retrieve => self.surface.replace_with_images(&layers),
                }
                log::debug!("{:?} decode applied", purpose);
                true
            }
            Completion::Failed(e) => {
                log::warn!("{:?} decode failed: {}", purpose, e);
                self.notices.push(Notice::DecodeFailed(e.to_string()));
                false
            }
            Completion::Stale => false,
        }
    }

    /// Run every pending decode in place. Returns true if the raster changed.
    pub fn run_pending_decodes(&mut self) -> bool {
        let mut changed = false;
        for job in self.take_decode_jobs() {
            changed |= self.complete_decode(job.run());
        }
        changed
    }

    // --- Accessors ---

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn style(&self) -> &StyleState {
        &self.style
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Visible color at a logical position.
    pub fn pixel_at(&self, point: Point) -> Option<ColorU8> {
        self.surface.pixel_at(point)
    }
}
