use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::detection::domain::embedding::Embedding;
use crate::identity::domain::finalized_track::FinalizedTrack;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("signature store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("signature store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("signature has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("video id must not be empty")]
    InvalidVideoId,
    #[error("signature store lock poisoned")]
    Poisoned,
}

/// Closest stored signature to a query within one video.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestSignature {
    pub track_id: u32,
    pub start_ts: f64,
    pub end_ts: f64,
    /// Cosine distance, lower is more similar.
    pub distance: f64,
}

/// Summary row for one indexed video.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub tracks: usize,
}

/// Domain interface for persisted track signatures, scoped by video.
///
/// Implementations must be safe to share between an analysis run and
/// concurrent searches.
pub trait SignatureStore: Send + Sync {
    /// Replaces everything stored for `video_id` with `tracks`, atomically:
    /// on error the previous contents are left untouched.
    fn save_video(&self, video_id: &str, tracks: &[FinalizedTrack]) -> Result<(), StoreError>;

    /// `Ok(None)` when the video has no stored signatures.
    fn nearest(
        &self,
        video_id: &str,
        query: &Embedding,
    ) -> Result<Option<NearestSignature>, StoreError>;

    /// Indexed videos, sorted by id.
    fn videos(&self) -> Result<Vec<VideoSummary>, StoreError>;
}

/// Rejects tracks whose signature length differs from `expected`.
pub fn validate_tracks(
    video_id: &str,
    tracks: &[FinalizedTrack],
    expected: usize,
) -> Result<(), StoreError> {
    if video_id.trim().is_empty() {
        return Err(StoreError::InvalidVideoId);
    }
    match tracks.iter().find(|t| t.signature.len() != expected) {
        Some(bad) => Err(StoreError::DimensionMismatch {
            expected,
            actual: bad.signature.len(),
        }),
        None => Ok(()),
    }
}

/// Brute-force nearest neighbour by cosine distance.
///
/// The query is normalized first. Ties resolve to the earliest track in
/// `tracks`.
pub fn nearest_signature(
    tracks: &[FinalizedTrack],
    query: &Embedding,
    expected: usize,
) -> Result<Option<NearestSignature>, StoreError> {
    if query.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }
    let query = query.clone().normalized();

    let mut best: Option<NearestSignature> = None;
    for track in tracks {
        let distance = query.cosine_distance(&track.signature);
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(NearestSignature {
                track_id: track.track_id,
                start_ts: track.start_ts,
                end_ts: track.end_ts,
                distance,
            });
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn track(track_id: u32, start_ts: f64, signature: &[f32]) -> FinalizedTrack {
        FinalizedTrack {
            track_id,
            start_ts,
            end_ts: start_ts + 1.0,
            signature: Embedding::new(signature.to_vec()),
        }
    }

    #[test]
    fn test_nearest_picks_smallest_distance() {
        let tracks = vec![track(1, 0.0, &[1.0, 0.0]), track(2, 5.0, &[0.0, 1.0])];
        let hit = nearest_signature(&tracks, &Embedding::new(vec![0.1, 0.9]), 2)
            .unwrap()
            .unwrap();
        assert_eq!(hit.track_id, 2);
        assert_eq!(hit.start_ts, 5.0);
    }

    #[test]
    fn test_nearest_normalizes_query() {
        let tracks = vec![track(1, 0.0, &[1.0, 0.0])];
        let hit = nearest_signature(&tracks, &Embedding::new(vec![10.0, 0.0]), 2)
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit.distance, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nearest_tie_keeps_earliest() {
        let tracks = vec![track(4, 0.0, &[1.0, 0.0]), track(2, 3.0, &[1.0, 0.0])];
        let hit = nearest_signature(&tracks, &Embedding::new(vec![1.0, 0.0]), 2)
            .unwrap()
            .unwrap();
        assert_eq!(hit.track_id, 4);
    }

    #[test]
    fn test_nearest_empty_is_none() {
        assert!(nearest_signature(&[], &Embedding::new(vec![1.0]), 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_nearest_rejects_wrong_dimension() {
        let result = nearest_signature(&[], &Embedding::new(vec![1.0, 0.0]), 3);
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_validate_tracks() {
        let ok = vec![track(1, 0.0, &[1.0, 0.0])];
        assert!(validate_tracks("v", &ok, 2).is_ok());
        assert!(matches!(
            validate_tracks("v", &ok, 3),
            Err(StoreError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            validate_tracks("  ", &ok, 2),
            Err(StoreError::InvalidVideoId)
        ));
    }
}
