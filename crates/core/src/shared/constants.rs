pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Frame rate assumed when the container does not report one.
pub const DEFAULT_FPS: f64 = 25.0;

/// Sampled frames a track may go unmatched before it is deleted
/// (~30 s of video at one sample per second).
pub const TRACKER_MAX_AGE: u32 = 30;

/// Hits required before a track is confirmed.
pub const TRACKER_N_INIT: u32 = 1;

/// Smallest accepted face crop side, in pixels.
pub const MIN_CROP_SIDE: i32 = 10;

/// Confidence attached to every assembled detection; the detector's own
/// score is not propagated.
pub const DETECTION_CONFIDENCE: f64 = 0.99;

pub const DETECTION_LABEL: &str = "face";
