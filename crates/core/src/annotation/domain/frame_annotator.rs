use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;
use crate::tracking::domain::track_manager::TrackSnapshot;

/// Domain interface for drawing one sampled frame's results onto it.
///
/// Implementations modify the frame in-place.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
        tracks: &[TrackSnapshot],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
