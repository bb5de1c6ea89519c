//! User-visible notices raised by sketchpad operations.

use std::fmt;

/// A message the shell should show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Retrieve found nothing under the storage key.
    NoSavedDrawing,
    /// The drawing was written to storage.
    Saved,
    /// An image could not be decoded; the surface is unchanged.
    DecodeFailed(String),
    /// Storage rejected a read or write.
    StorageFailed(String),
}

impl Notice {
    /// Whether the notice reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::DecodeFailed(_) | Notice::StorageFailed(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoSavedDrawing => write!(f, "No saved drawing found"),
            Notice::Saved => write!(f, "Drawing saved"),
            Notice::DecodeFailed(reason) => write!(f, "Could not load the drawing: {}", reason),
            Notice::StorageFailed(reason) => write!(f, "Could not access storage: {}", reason),
        }
    }
}
