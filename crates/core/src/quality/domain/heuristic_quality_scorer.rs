use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::quality::domain::laplacian::laplacian_variance;
use crate::quality::domain::quality_scorer::QualityScorer;
use crate::shared::constants::REFERENCE_FACE_SIZE;
use crate::shared::frame::Frame;

const SHARPNESS_WEIGHT: f64 = 0.4;
const SIZE_WEIGHT: f64 = 0.1;
const POSE_WEIGHT: f64 = 0.5;
/// Lifts pose (≈ [0, 1]) to the magnitude of typical Laplacian variances.
const POSE_SCALE: f64 = 500.0;

/// Sharpness, size and frontality blended into one ranking score.
///
/// Formula: `0.4·var(∇²gray) + 0.1·area/112² + 0.5·pose·500`
///
/// The weights are an empirical tuning that downstream match thresholds
/// were calibrated against; keep them as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicQualityScorer;

impl HeuristicQualityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn size_score(crop: &Frame) -> f64 {
        let reference = (REFERENCE_FACE_SIZE * REFERENCE_FACE_SIZE) as f64;
        (crop.width() as f64 * crop.height() as f64) / reference
    }
}

impl QualityScorer for HeuristicQualityScorer {
    fn score(&self, crop: &Frame, landmarks: Option<&FaceLandmarks>) -> f64 {
        let Some(landmarks) = landmarks else {
            return 0.0;
        };
        if crop.is_empty() {
            return 0.0;
        }

        let sharpness = laplacian_variance(&crop.grayscale());
        SHARPNESS_WEIGHT * sharpness
            + SIZE_WEIGHT * Self::size_score(crop)
            + POSE_WEIGHT * landmarks.pose_score() * POSE_SCALE
    }
}
