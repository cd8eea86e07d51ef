use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::infrastructure::box_annotator::AnnotationStyle;
use crate::detection::domain::detection_assembler::AssemblerConfig;
use crate::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use crate::tracking::domain::tracker_config::TrackerConfig;

/// Largest edge of a saved face thumbnail.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Which source frames reach the output video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Only sampled frames are written, each held for one sampling
    /// interval, so play duration matches the input.
    #[default]
    Hold,
    /// Every source frame is written once; sampled frames are annotated.
    Passthrough,
}

/// Everything tunable about a counting run, loadable from a JSON file.
/// Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub detector_confidence: f64,
    pub tracker: TrackerConfig,
    pub assembler: AssemblerConfig,
    pub output_mode: OutputMode,
    pub annotation: AnnotationStyle,
    pub thumbnail_size: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            detector_confidence: DEFAULT_CONFIDENCE,
            tracker: TrackerConfig::default(),
            assembler: AssemblerConfig::default(),
            output_mode: OutputMode::default(),
            annotation: AnnotationStyle::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

impl PipelineSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.detector_confidence.is_finite()
            && (0.0..=1.0).contains(&self.detector_confidence))
        {
            return Err(SettingsError::Invalid(format!(
                "detector_confidence must be within [0, 1], got {}",
                self.detector_confidence
            )));
        }
        if !(self.assembler.confidence.is_finite()
            && (0.0..=1.0).contains(&self.assembler.confidence))
        {
            return Err(SettingsError::Invalid(format!(
                "assembler.confidence must be within [0, 1], got {}",
                self.assembler.confidence
            )));
        }
        if self.assembler.min_crop_side < 1 {
            return Err(SettingsError::Invalid(format!(
                "assembler.min_crop_side must be positive, got {}",
                self.assembler.min_crop_side
            )));
        }
        if self.thumbnail_size == 0 {
            return Err(SettingsError::Invalid("thumbnail_size must be positive".into()));
        }
        let label_height = self.annotation.label_height;
        if !(label_height.is_finite() && label_height > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "annotation.label_height must be positive, got {label_height}"
            )));
        }
        self.tracker
            .validate()
            .map_err(|msg| SettingsError::Invalid(format!("tracker: {msg}")))
    }
}
