use crate::shared::frame::Frame;

/// Unvalidated detector output in pixel coordinates.
///
/// Boxes may be partially or fully outside the frame, and `width`/`height`
/// may be smaller than any usable crop; the `DetectionAssembler` clips and
/// validates them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawFace {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub score: f64,
}

impl RawFace {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            score: 1.0,
        }
    }
}

/// Domain interface for face detection on a single RGB frame.
///
/// Zero or more faces, in no particular order. Inference sessions are
/// stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawFace>, Box<dyn std::error::Error>>;
}
