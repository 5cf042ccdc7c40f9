//! Re-attaches detector attributes to tracker output.
//!
//! The tracker only consumes `bbox` and `score`, so each tracked box is
//! matched back to the frame's raw detections by maximum IoU to recover
//! landmarks and embedding.

use crate::detection::domain::face_record::FaceRecord;
use crate::shared::bbox::BoundingBox;
use crate::tracking::domain::face_tracker::TrackedBox;

/// A tracked box paired with the raw detection it overlaps most.
#[derive(Clone, Debug, PartialEq)]
pub struct RecoveredFace<'a> {
    pub track_id: u32,
    /// Tracked box clamped to the frame; never empty.
    pub crop_box: BoundingBox,
    pub record: &'a FaceRecord,
}

pub struct LandmarkRecoveryMatcher {
    frame_width: u32,
    frame_height: u32,
}

impl LandmarkRecoveryMatcher {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
        }
    }

    /// One entry per tracked box that survives clamping and overlaps a detection.
    ///
    /// Boxes whose clamped area is zero, or that overlap no detection at all,
    /// are skipped. Equal IoU resolves to the earlier detection.
    pub fn recover<'a>(
        &self,
        tracked: &[TrackedBox],
        records: &'a [FaceRecord],
    ) -> Vec<RecoveredFace<'a>> {
        tracked
            .iter()
            .filter_map(|t| {
                let crop_box = t.bbox.clamp_to(self.frame_width, self.frame_height);
                if crop_box.is_empty() {
                    return None;
                }
                best_overlap(&crop_box, records).map(|record| RecoveredFace {
                    track_id: t.track_id,
                    crop_box,
                    record,
                })
            })
            .collect()
    }
}

fn best_overlap<'a>(bbox: &BoundingBox, records: &'a [FaceRecord]) -> Option<&'a FaceRecord> {
    let mut best: Option<&FaceRecord> = None;
    let mut best_iou = 0.0;
    for record in records {
        let iou = bbox.iou(&record.bbox);
        if iou > best_iou {
            best_iou = iou;
            best = Some(record);
        }
    }
    best
}
