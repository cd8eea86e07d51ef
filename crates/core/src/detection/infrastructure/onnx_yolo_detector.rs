/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, and NMS. Output boxes are
/// mapped back to frame coordinates but not clipped; clipping belongs to
/// the `DetectionAssembler`.
use std::path::Path;

use crate::detection::domain::face_detector::{FaceDetector, RawFace};
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;
use super::math::{nms, ScoredBox};

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model. The input resolution is read from the
    /// model's NCHW input shape, falling back to 640 for dynamic shapes.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!(
            "Loaded face detector {} (input {input_size}px)",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawFace>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = decode(data, shape[1], shape[2], self.confidence, &letterbox);
        Ok(nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(to_raw_face)
            .collect())
    }
}

/// Scale and padding applied by [`letterbox`], needed to undo it.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Parses `[1, features, detections]` or `[1, detections, features]`
/// output; each row starts with `cx, cy, w, h, conf` (pose keypoints, if
/// present, are ignored).
fn decode(
    data: &[f32],
    dim1: usize,
    dim2: usize,
    confidence: f64,
    letterbox: &Letterbox,
) -> Vec<ScoredBox> {
    let transposed = dim1 < dim2;
    let (num_dets, num_feats) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
    if num_feats < 5 {
        return Vec::new();
    }
    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    (0..num_dets)
        .filter(|&i| value(i, 4) >= confidence)
        .map(|i| {
            let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
            let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
            ScoredBox {
                ltrb: [x1, y1, x2, y2],
                score: value(i, 4),
            }
        })
        .collect()
}

fn to_raw_face(b: ScoredBox) -> RawFace {
    let [x1, y1, x2, y2] = b.ltrb;
    RawFace {
        x: x1.round() as i32,
        y: y1.round() as i32,
        width: (x2 - x1).round() as i32,
        height: (y2 - y1).round() as i32,
        score: b.score,
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`, normalized
/// NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((lb.scale - 3.2).abs() < 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - PAD_VALUE).abs() < 0.01);
    }

    #[test]
    fn test_decode_row_major_layout() {
        // Two detections x 5 features: only the first clears the threshold.
        let data = [50.0, 60.0, 20.0, 40.0, 0.9, 10.0, 10.0, 4.0, 4.0, 0.1];
        let boxes = decode(&data, 2, 5, 0.5, &identity());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].ltrb, [40.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_decode_transposed_layout() {
        // 5 features x 6 detections, feature-major.
        let mut data = vec![0.0f32; 5 * 6];
        let det = 3;
        data[det] = 100.0;
        data[6 + det] = 100.0;
        data[12 + det] = 10.0;
        data[18 + det] = 10.0;
        data[24 + det] = 0.8;
        let boxes = decode(&data, 5, 6, 0.5, &identity());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].ltrb, [95.0, 95.0, 105.0, 105.0]);
    }

    #[test]
    fn test_decode_undoes_letterbox() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 100,
        };
        let data = [100.0, 200.0, 40.0, 40.0, 0.9];
        let boxes = decode(&data, 1, 5, 0.5, &lb);
        assert_eq!(boxes[0].ltrb, [40.0, 40.0, 60.0, 60.0]);
    }

    #[test]
    fn test_to_raw_face_keeps_unclipped_geometry() {
        let face = to_raw_face(ScoredBox {
            ltrb: [-12.4, 5.0, 30.0, 45.6],
            score: 0.7,
        });
        assert_eq!((face.x, face.y, face.width, face.height), (-12, 5, 42, 41));
        assert_eq!(face.score, 0.7);
    }
}
