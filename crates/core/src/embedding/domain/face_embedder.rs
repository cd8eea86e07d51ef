use thiserror::Error;

use crate::shared::frame::Frame;

use super::embedding::Embedding;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("face crop {width}x{height} is below the minimum size")]
    CropTooSmall { width: u32, height: u32 },
    #[error("invalid face crop: {0}")]
    InvalidCrop(String),
    #[error("embedding inference failed: {0}")]
    Inference(String),
    #[error("embedding model produced no usable vector")]
    EmptyOutput,
}

/// Domain interface for turning a face crop into an identity embedding.
///
/// Implementations must not modify the crop. Inference sessions are
/// stateful, hence `&mut self`.
pub trait FaceEmbedder: Send {
    fn embed(&mut self, crop: &Frame) -> Result<Embedding, EmbeddingError>;
}
