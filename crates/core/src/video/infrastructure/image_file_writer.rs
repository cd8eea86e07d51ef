use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes frames as image files with the `image` crate; the format follows
/// the path's extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_side: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected RGB frame, got {} channels", frame.channels()).into());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;

        let img = match max_side {
            Some(limit) if img.width().max(img.height()) > limit => {
                image::DynamicImage::ImageRgb8(img).thumbnail(limit, limit).to_rgb8()
            }
            _ => img,
        };
        img.save(path)?;
        Ok(())
    }
}
