use crate::shared::constants::DEFAULT_FPS;

/// Picks one frame per second of source video for detection and tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSampler {
    interval: usize,
}

impl FrameSampler {
    /// Unknown, zero, negative or non-finite rates fall back to
    /// [`DEFAULT_FPS`]. The interval is never less than one frame.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            DEFAULT_FPS
        };
        Self {
            interval: (fps.round() as usize).max(1),
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn should_process(&self, index: usize) -> bool {
        index % self.interval == 0
    }
}
