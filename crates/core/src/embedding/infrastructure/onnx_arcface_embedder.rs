//! ArcFace face embedder using ONNX Runtime via `ort`.
//!
//! Resizes each crop to the model's 112x112 input, normalizes to [-1, 1],
//! and returns the L2-normalized output vector (512-d for `w600k_r50`).
use std::path::Path;

use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::embedding::domain::embedding::Embedding;
use crate::embedding::domain::face_embedder::{EmbeddingError, FaceEmbedder};
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcFaceEmbedder {
    session: ort::session::Session,
}

impl OnnxArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::debug!("Loaded embedding model {}", model_path.display());
        Ok(Self { session })
    }

    fn infer(&mut self, tensor: ndarray::Array4<f32>) -> Result<Vec<f32>, ort::Error> {
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let array = outputs[0].try_extract_array::<f32>()?;
        Ok(array.iter().copied().collect())
    }
}

impl FaceEmbedder for OnnxArcFaceEmbedder {
    fn embed(&mut self, crop: &Frame) -> Result<Embedding, EmbeddingError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(EmbeddingError::CropTooSmall {
                width: crop.width(),
                height: crop.height(),
            });
        }
        if crop.channels() != 3 {
            return Err(EmbeddingError::InvalidCrop(format!(
                "expected 3 channels, got {}",
                crop.channels()
            )));
        }

        let tensor = preprocess(crop);
        let raw = self
            .infer(tensor)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        Embedding::new(raw).ok_or(EmbeddingError::EmptyOutput)
    }
}

/// Nearest-neighbour resize to 112x112, normalize, NCHW layout.
fn preprocess(crop: &Frame) -> ndarray::Array4<f32> {
    let src = crop.as_ndarray();
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}
