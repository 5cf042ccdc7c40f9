use crate::detection::domain::face_record::FaceRecord;
use crate::shared::bbox::BoundingBox;
use crate::tracking::domain::track_state::TrackState;

/// What the tracker consumes from a detection: geometry and confidence only.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f64,
}

impl From<&FaceRecord> for Detection {
    fn from(record: &FaceRecord) -> Self {
        Self {
            bbox: record.bbox,
            score: record.score,
        }
    }
}

/// A track's box for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedBox {
    pub track_id: u32,
    pub bbox: BoundingBox,
    pub state: TrackState,
}

impl TrackedBox {
    /// Matched this frame (as opposed to coasting on its motion model).
    pub fn is_tracked(&self) -> bool {
        self.state == TrackState::Tracked
    }
}

/// Domain interface for multi-object association across frames.
///
/// Implementations carry cross-frame state (track table, id counter, motion
/// history); one instance must serve exactly one video. `update` is called
/// once per analyzed frame, in frame order, and returns the confirmed tracks
/// that are `Tracked` or `Lost` but still inside the buffer window.
pub trait FaceTracker: Send {
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedBox>;
}
