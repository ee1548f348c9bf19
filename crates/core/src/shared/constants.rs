pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Directory name used under the platform cache/config/data roots.
pub const APP_DIR_NAME: &str = "FaceGate";

pub const DEFAULT_DATABASE_NAME: &str = "identities.db";

pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Consumer command-poll wait; also paces the display loop (~33 fps).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30;
