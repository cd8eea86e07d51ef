use crate::embedding::domain::embedding::Embedding;
use crate::shared::bounding_box::BoundingBox;

/// A validated face on one sampled frame, ready for association.
///
/// Lives for a single tracker update.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub embedding: Embedding,
    pub label: &'static str,
}
