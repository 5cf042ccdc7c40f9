use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

/// Domain interface for ranking face samples. Higher is better; there is
/// no fixed upper bound. Degenerate input scores 0.0.
pub trait QualityScorer: Send + Sync {
    fn score(&self, crop: &Frame, landmarks: Option<&FaceLandmarks>) -> f64;
}
