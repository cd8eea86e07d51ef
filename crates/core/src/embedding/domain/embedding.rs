/// L2-normalized appearance vector summarizing a face crop's identity.
///
/// Normalization happens once at construction so cosine distance reduces
/// to a dot product.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding {
    values: Vec<f32>,
}

/// Largest possible cosine distance (opposite vectors).
pub const MAX_COSINE_DISTANCE: f64 = 2.0;

impl Embedding {
    /// Returns `None` for empty vectors or vectors with non-finite entries.
    pub fn new(mut values: Vec<f32>) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        l2_normalize(&mut values);
        Some(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// `1 - cos(a, b)`, in `[0, 2]`. Mismatched dimensions are maximally
    /// distant.
    pub fn cosine_distance(&self, other: &Embedding) -> f64 {
        if self.dim() != other.dim() {
            return MAX_COSINE_DISTANCE;
        }
        let dot: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| *a as f64 * *b as f64)
            .sum();
        (1.0 - dot).clamp(0.0, MAX_COSINE_DISTANCE)
    }

    /// Exponential moving average toward `latest`, renormalized.
    ///
    /// `alpha = 1.0` replaces the stored appearance outright.
    pub fn blend(&self, latest: &Embedding, alpha: f64) -> Embedding {
        if self.dim() != latest.dim() {
            return latest.clone();
        }
        let alpha = alpha.clamp(0.0, 1.0) as f32;
        let mixed: Vec<f32> = self
            .values
            .iter()
            .zip(&latest.values)
            .map(|(old, new)| alpha * new + (1.0 - alpha) * old)
            .collect();
        Embedding::new(mixed).unwrap_or_else(|| latest.clone())
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
