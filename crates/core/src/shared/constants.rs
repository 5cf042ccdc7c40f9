pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Length of an ArcFace identity embedding.
pub const EMBEDDING_DIM: usize = 512;

/// Detections at or above this score take part in the first association pass
/// and may start new tracks.
pub const TRACK_THRESH: f64 = 0.5;

/// Maximum IoU distance (`1 - IoU`) accepted when associating a detection
/// with an existing track.
pub const MATCH_THRESH: f64 = 0.8;

/// Frames a track may go unmatched before removal, at the reference rate.
pub const TRACK_BUFFER: u32 = 30;

/// Frame rate the track buffer is expressed against.
pub const REFERENCE_FRAME_RATE: f64 = 30.0;

/// Side of the square crop ArcFace expects; also the quality size baseline.
pub const REFERENCE_FACE_SIZE: u32 = 112;

/// Number of best-quality samples fused into a track signature.
pub const TOP_K_SAMPLES: usize = 5;

/// Cosine distance strictly below which a query counts as a match.
pub const MATCH_DISTANCE_THRESHOLD: f64 = 0.35;

/// Norms at or below this are left unnormalized.
pub const NORM_EPSILON: f64 = 1e-6;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
