/// Output field of the segmentation workflow that carries the rendered mask overlay.
pub const MASK_FIELD: &str = "mask_visualization";

pub const DEFAULT_WORKSPACE: &str = "lerobotvt-jk4j0";
pub const DEFAULT_WORKFLOW_ID: &str = "background-removal";
pub const DEFAULT_API_URL: &str = "https://serverless.roboflow.com";

pub const API_KEY_ENV: &str = "ROBOFLOW_API_KEY";
pub const INPUT_DIR_ENV: &str = "INPUT_VIDEO_PATH";
pub const OUTPUT_DIR_ENV: &str = "OUTPUT_VIDEO_PATH";

pub const DEFAULT_MAX_FPS: f64 = 30.0;
pub const DEFAULT_INPUT_FILE: &str = "video1.mp4";
pub const OUTPUT_SUFFIX: &str = "_with_mask";
pub const OUTPUT_EXTENSION: &str = "mp4";

// Encoding profile used by the LeRobot training pipeline.
pub const DEFAULT_CODEC: &str = "libsvtav1";
pub const DEFAULT_OUTPUT_FPS: u32 = 30;
pub const DEFAULT_CRF: u32 = 30;
pub const DEFAULT_KEYFRAME_INTERVAL: u32 = 2;
pub const DEFAULT_PRESET: u32 = 12;

/// Marker printed in place of a diagnostic field that could not be read.
pub const UNKNOWN: &str = "unknown";

/// Max distance between a requested and a decoded timestamp (LeRobot default).
pub const TIMESTAMP_TOLERANCE_S: f64 = 1e-4;

pub const DEFAULT_DATASET_REPO: &str = "eliasab16/xvlm_insert_tip_into_mounted_device";
