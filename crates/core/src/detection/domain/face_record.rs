use crate::detection::domain::embedding::Embedding;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bbox::BoundingBox;

/// One face found by a detector in one frame.
///
/// Lives only for the frame it was produced in; the tracker consumes
/// `bbox` and `score`, and the rich attributes are re-attached to tracks
/// afterwards by geometric matching.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRecord {
    pub bbox: BoundingBox,
    /// Detection confidence in `[0, 1]`.
    pub score: f64,
    pub landmarks: Option<FaceLandmarks>,
    pub embedding: Option<Embedding>,
}

impl FaceRecord {
    pub fn new(bbox: BoundingBox, score: f64) -> Self {
        Self {
            bbox,
            score,
            landmarks: None,
            embedding: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }
}
