use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sink for annotated frames. Output resolution and frame rate come from
/// the metadata passed to `open`.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered output. Calling it twice is harmless.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
