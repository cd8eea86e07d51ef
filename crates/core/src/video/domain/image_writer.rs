use std::path::Path;

use crate::shared::frame::Frame;

/// Saves a still image, used for per-face thumbnails.
pub trait ImageWriter: Send {
    /// `max_side` bounds the longer edge; smaller images are written as-is.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_side: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
