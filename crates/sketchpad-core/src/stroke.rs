//! Pointer stroke capture.
//!
//! Converts pointer down/move/up sequences into line segments. Pointer
//! capture keeps a stroke alive when the pointer leaves the surface mid-drag.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the host assigns to a pointer (mouse, pen or finger).
pub type PointerId = i32;

/// Pointer buttons that can start a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other,
}

/// A pointer event in the surface's own logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerInput {
    Down {
        pointer_id: PointerId,
        position: Point,
        button: PointerButton,
    },
    Move {
        pointer_id: PointerId,
        position: Point,
    },
    Up {
        pointer_id: PointerId,
    },
    Cancel {
        pointer_id: PointerId,
    },
    /// Pointer left the surface.
    Out {
        pointer_id: PointerId,
    },
}

/// Failure to acquire or release pointer capture.
#[derive(Debug, Error)]
#[error("Pointer capture failed for pointer {pointer_id}: {reason}")]
pub struct CaptureError {
    pub pointer_id: PointerId,
    pub reason: String,
}

/// Host-side pointer capture.
pub trait PointerCapture {
    /// Route all further events of `pointer_id` to the surface.
    fn set_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError>;

    /// Undo a previous [`PointerCapture::set_capture`].
    fn release_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError>;

    /// Whether the surface currently holds capture for `pointer_id`.
    fn has_capture(&self, pointer_id: PointerId) -> bool;
}

/// Capture target for hosts that deliver all pointer events anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn set_capture(&mut self, _pointer_id: PointerId) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release_capture(&mut self, _pointer_id: PointerId) -> Result<(), CaptureError> {
        Ok(())
    }

    fn has_capture(&self, _pointer_id: PointerId) -> bool {
        false
    }
}

/// A line segment the surface should draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Stroke session state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StrokeSession {
    #[default]
    Idle,
    Drawing {
        pointer_id: PointerId,
        last_point: Point,
    },
}

impl StrokeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, StrokeSession::Drawing { .. })
    }

    /// Dispatch a pointer event, returning the segment to draw, if any.
    pub fn handle(
        &mut self,
        input: PointerInput,
        capture: &mut dyn PointerCapture,
    ) -> Option<Segment> {
        match input {
            PointerInput::Down {
                pointer_id,
                position,
                button,
            } => {
                self.pointer_down(pointer_id, position, button, capture);
                None
            }
            PointerInput::Move {
                pointer_id,
                position,
            } => self.pointer_move(pointer_id, position),
            PointerInput::Up { pointer_id }
            | PointerInput::Cancel { pointer_id }
            | PointerInput::Out { pointer_id } => {
                self.pointer_end(pointer_id, capture);
                None
            }
        }
    }

    /// Idle -> Drawing.
    pub fn pointer_down(
        &mut self,
        pointer_id: PointerId,
        position: Point,
        button: PointerButton,
        capture: &mut dyn PointerCapture,
    ) {
        if self.is_drawing() || button != PointerButton::Primary {
            return;
        }

        *self = StrokeSession::Drawing {
            pointer_id,
            last_point: position,
        };
        if let Err(e) = capture.set_capture(pointer_id) {
            log::debug!("{}", e);
        }
    }

    /// Drawing -> Drawing, yielding the segment from the last point.
    pub fn pointer_move(&mut self, pointer_id: PointerId, position: Point) -> Option<Segment> {
        match self {
            StrokeSession::Drawing {
                pointer_id: active,
                last_point,
            } if *active == pointer_id => {
                let segment = Segment {
                    from: *last_point,
                    to: position,
                };
                *last_point = position;
                Some(segment)
            }
            _ => None,
        }
    }

    /// Drawing -> Idle on up, cancel or out.
    pub fn pointer_end(&mut self, pointer_id: PointerId, capture: &mut dyn PointerCapture) {
        match *self {
            StrokeSession::Drawing {
                pointer_id: active, ..
            } if active == pointer_id => {
                *self = StrokeSession::Idle;
                if capture.has_capture(pointer_id) {
                    if let Err(e) = capture.release_capture(pointer_id) {
                        log::debug!("{}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeCapture {
        held: HashSet<PointerId>,
        fail: bool,
        releases: usize,
    }

    impl PointerCapture for FakeCapture {
        fn set_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
            if self.fail {
                return Err(CaptureError {
                    pointer_id,
                    reason: "pointer already released".to_string(),
                });
            }
            self.held.insert(pointer_id);
            Ok(())
        }

        fn release_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
            self.releases += 1;
            self.held.remove(&pointer_id);
            Ok(())
        }

        fn has_capture(&self, pointer_id: PointerId) -> bool {
            self.held.contains(&pointer_id)
        }
    }

    fn down(x: f64, y: f64) -> PointerInput {
        PointerInput::Down {
            pointer_id: 1,
            position: Point::new(x, y),
            button: PointerButton::Primary,
        }
    }

    fn mv(x: f64, y: f64) -> PointerInput {
        PointerInput::Move {
            pointer_id: 1,
            position: Point::new(x, y),
        }
    }

    #[test]
    fn test_segments_follow_moves() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture::default();

        assert_eq!(session.handle(down(0.0, 0.0), &mut capture), None);
        assert!(capture.has_capture(1));

        let first = session.handle(mv(10.0, 0.0), &mut capture).unwrap();
        let second = session.handle(mv(10.0, 10.0), &mut capture).unwrap();
        assert_eq!(first.from, Point::new(0.0, 0.0));
        assert_eq!(first.to, Point::new(10.0, 0.0));
        assert_eq!(second.from, first.to);
        assert_eq!(second.to, Point::new(10.0, 10.0));

        session.handle(PointerInput::Up { pointer_id: 1 }, &mut capture);
        assert!(!session.is_drawing());
        assert!(!capture.has_capture(1));
    }

    #[test]
    fn test_move_while_idle_is_ignored() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture::default();
        assert_eq!(session.handle(mv(5.0, 5.0), &mut capture), None);
        assert_eq!(session, StrokeSession::Idle);
    }

    #[test]
    fn test_down_up_draws_nothing() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture::default();
        assert_eq!(session.handle(down(5.0, 5.0), &mut capture), None);
        assert_eq!(session.handle(PointerInput::Up { pointer_id: 1 }, &mut capture), None);
        assert_eq!(session, StrokeSession::Idle);
    }

    #[test]
    fn test_cancel_and_out_end_stroke() {
        let mut capture = FakeCapture::default();
        for end in [
            PointerInput::Cancel { pointer_id: 1 },
            PointerInput::Out { pointer_id: 1 },
        ] {
            let mut session = StrokeSession::new();
            session.handle(down(0.0, 0.0), &mut capture);
            session.handle(end, &mut capture);
            assert!(!session.is_drawing());
            assert_eq!(session.handle(mv(3.0, 3.0), &mut capture), None);
        }
    }

    #[test]
    fn test_capture_failure_is_not_fatal() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture {
            fail: true,
            ..FakeCapture::default()
        };
        session.handle(down(0.0, 0.0), &mut capture);
        assert!(session.is_drawing());
        assert!(session.handle(mv(4.0, 4.0), &mut capture).is_some());

        session.handle(PointerInput::Up { pointer_id: 1 }, &mut capture);
        assert!(!session.is_drawing());
        // Never acquired, so never released.
        assert_eq!(capture.releases, 0);
    }

    #[test]
    fn test_other_pointers_are_ignored() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture::default();
        session.handle(down(0.0, 0.0), &mut capture);

        let other_down = PointerInput::Down {
            pointer_id: 2,
            position: Point::new(50.0, 50.0),
            button: PointerButton::Primary,
        };
        session.handle(other_down, &mut capture);
        let other_move = PointerInput::Move {
            pointer_id: 2,
            position: Point::new(60.0, 60.0),
        };
        assert_eq!(session.handle(other_move, &mut capture), None);
        session.handle(PointerInput::Up { pointer_id: 2 }, &mut capture);
        assert!(session.is_drawing());

        let segment = session.handle(mv(1.0, 1.0), &mut capture).unwrap();
        assert_eq!(segment.from, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_secondary_button_does_not_draw() {
        let mut session = StrokeSession::new();
        let mut capture = FakeCapture::default();
        let right = PointerInput::Down {
            pointer_id: 1,
            position: Point::ZERO,
            button: PointerButton::Secondary,
        };
        session.handle(right, &mut capture);
        assert!(!session.is_drawing());
        assert!(!capture.has_capture(1));
    }
}
