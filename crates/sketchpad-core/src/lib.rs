//! Sketchpad Core Library
//!
//! Platform-agnostic raster surface, stroke capture and persistence for the
//! Sketchpad freehand drawing surface.

pub mod config;
pub mod debounce;
pub mod decode;
pub mod error;
pub mod notice;
pub mod sizing;
pub mod sketchpad;
pub mod snapshot;
pub mod storage;
pub mod stroke;
pub mod style;
pub mod surface;

pub use config::{ConfigError, SketchConfig};
pub use debounce::Debouncer;
pub use decode::{DecodeJob, DecodeOutcome, DecodePurpose};
pub use error::{SketchError, SketchResult};
pub use notice::Notice;
pub use sizing::{ContainerMetrics, DisplaySize, ElementUpdate, SizingRules};
pub use sketchpad::{SavedImage, Sketchpad};
pub use storage::{MemoryStore, SnapshotStore, StorageError, StorageResult};
pub use stroke::{CaptureError, NoCapture, PointerButton, PointerCapture, PointerId, PointerInput};
pub use style::StyleState;
pub use surface::Surface;
