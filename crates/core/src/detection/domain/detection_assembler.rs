use serde::{Deserialize, Serialize};

use crate::embedding::domain::face_embedder::FaceEmbedder;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{DETECTION_CONFIDENCE, DETECTION_LABEL, MIN_CROP_SIDE};
use crate::shared::frame::Frame;

use super::detection::Detection;
use super::face_detector::RawFace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Minimum crop side in pixels; raw boxes are grown to at least this
    /// size before clipping, and clipped crops below it are dropped.
    pub min_crop_side: i32,
    /// Confidence attached to every emitted detection.
    pub confidence: f64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            min_crop_side: MIN_CROP_SIDE,
            confidence: DETECTION_CONFIDENCE,
        }
    }
}

/// Turns raw detector boxes into `Detection`s with embeddings.
///
/// Never fails as a whole: candidates whose crop is unusable or whose
/// embedding cannot be computed are logged and skipped.
pub struct DetectionAssembler {
    config: AssemblerConfig,
}

impl DetectionAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// Grows a raw box to the minimum side, then clips its far corner to
    /// `(width - 1, height - 1)`. Returns `None` when the clipped box is
    /// degenerate or has a side below the minimum.
    pub fn clip_box(&self, raw: &RawFace, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let min_side = self.config.min_crop_side;
        let x1 = raw.x.max(0);
        let y1 = raw.y.max(0);
        let x2 = x1
            .saturating_add(raw.width.max(min_side))
            .min(frame_width as i32 - 1);
        let y2 = y1
            .saturating_add(raw.height.max(min_side))
            .min(frame_height as i32 - 1);

        let bbox = BoundingBox::new(x1, y1, x2, y2)?;
        if bbox.width() < min_side || bbox.height() < min_side {
            return None;
        }
        Some(bbox)
    }

    pub fn assemble(
        &self,
        frame: &Frame,
        raw_faces: &[RawFace],
        embedder: &mut dyn FaceEmbedder,
    ) -> Vec<Detection> {
        let mut detections = Vec::with_capacity(raw_faces.len());
        for raw in raw_faces {
            let Some(bbox) = self.clip_box(raw, frame.width(), frame.height()) else {
                log::debug!("Frame {}: dropped out-of-bounds face {raw:?}", frame.index());
                continue;
            };
            let Some(crop) = frame.crop(&bbox) else {
                log::debug!("Frame {}: empty crop for {bbox:?}", frame.index());
                continue;
            };
            match embedder.embed(&crop) {
                Ok(embedding) => detections.push(Detection {
                    bbox,
                    confidence: self.config.confidence,
                    embedding,
                    label: DETECTION_LABEL,
                }),
                Err(e) => {
                    log::debug!("Frame {}: embedding failed for {bbox:?}: {e}", frame.index());
                }
            }
        }
        detections
    }
}

impl Default for DetectionAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}
