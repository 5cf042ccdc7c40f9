use crate::detection::domain::face_record::FaceRecord;
use crate::shared::frame::Frame;

/// Domain interface for face detection and embedding.
///
/// Implementations must not keep per-call bookkeeping: one instance may be
/// shared by every video-processing run. Adapters that wrap non-reentrant
/// inference sessions serialize calls internally. An empty result is a
/// valid answer.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>>;
}
