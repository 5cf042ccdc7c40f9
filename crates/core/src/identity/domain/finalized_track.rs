use serde::{Deserialize, Serialize};

use crate::detection::domain::embedding::Embedding;

/// One face identity extracted from a video, ready for persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalizedTrack {
    pub track_id: u32,
    pub start_ts: f64,
    pub end_ts: f64,
    /// Fused, L2-normalized embedding of the track's best samples.
    pub signature: Embedding,
}
