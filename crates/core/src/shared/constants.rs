pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Overlay stroke color (RGB).
pub const DEFAULT_STROKE_COLOR: [u8; 3] = [0, 255, 0];

/// Overlay stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: u32 = 3;

/// Pacing used when a source does not report its frame rate.
pub const FALLBACK_SOURCE_FPS: f64 = 30.0;

/// Presentation polling rate.
pub const DEFAULT_DISPLAY_FPS: f64 = 30.0;
