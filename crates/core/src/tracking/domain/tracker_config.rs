use serde::{Deserialize, Serialize};

use super::kalman_filter::CHI2_INV_95_4DOF;
use crate::shared::constants::{TRACKER_MAX_AGE, TRACKER_N_INIT};

/// Tuning knobs for [`TrackManager`](super::track_manager::TrackManager).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive missed sampled frames before a track is deleted.
    pub max_age: u32,
    /// Hits required before a track is confirmed.
    pub n_init: u32,
    /// Appearance gate on cosine distance.
    pub max_cosine_distance: f64,
    /// Motion gate on squared Mahalanobis distance.
    pub gating_threshold: f64,
    /// Gate on `1 - IoU` for the overlap fallback stage.
    pub max_iou_distance: f64,
    /// Weight of the newest embedding in the stored appearance.
    pub embedding_alpha: f64,
    /// Delete tentative tracks on their first miss.
    pub prune_tentative_on_miss: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: TRACKER_MAX_AGE,
            n_init: TRACKER_N_INIT,
            max_cosine_distance: 0.4,
            gating_threshold: CHI2_INV_95_4DOF,
            max_iou_distance: 0.7,
            embedding_alpha: 0.6,
            prune_tentative_on_miss: false,
        }
    }
}

impl TrackerConfig {
    /// Returns a description of the first invalid field, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_init == 0 {
            return Err("n_init must be at least 1".into());
        }
        if !(self.max_cosine_distance.is_finite()
            && (0.0..=2.0).contains(&self.max_cosine_distance))
        {
            return Err(format!(
                "max_cosine_distance must be within [0, 2], got {}",
                self.max_cosine_distance
            ));
        }
        if !(self.gating_threshold.is_finite() && self.gating_threshold > 0.0) {
            return Err(format!(
                "gating_threshold must be positive, got {}",
                self.gating_threshold
            ));
        }
        if !(self.max_iou_distance.is_finite() && (0.0..=1.0).contains(&self.max_iou_distance)) {
            return Err(format!(
                "max_iou_distance must be within [0, 1], got {}",
                self.max_iou_distance
            ));
        }
        if !(self.embedding_alpha.is_finite()
            && self.embedding_alpha > 0.0
            && self.embedding_alpha <= 1.0)
        {
            return Err(format!(
                "embedding_alpha must be within (0, 1], got {}",
                self.embedding_alpha
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert_eq!(config.max_age, 30);
        assert_eq!(config.n_init, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_n_init_rejected() {
        let config = TrackerConfig {
            n_init: 0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let config = TrackerConfig {
            max_cosine_distance: f64::NAN,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: TrackerConfig = serde_json::from_str(r#"{"n_init": 3}"#).unwrap();
        assert_eq!(config.n_init, 3);
        assert_eq!(config.max_age, 30);
    }
}
