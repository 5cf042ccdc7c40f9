use serde::Serialize;

use crate::detection::domain::embedding::Embedding;
use crate::identity::domain::signature_store::SignatureStore;
use crate::shared::constants::MATCH_DISTANCE_THRESHOLD;

pub const REASON_NO_CONFIDENT_MATCH: &str = "No confident match";
pub const REASON_NO_FACE: &str = "No face detected";
pub const REASON_INTERNAL_ERROR: &str = "Internal search error";

/// Result of asking whether a face appears in a video.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Match {
        track_id: u32,
        timestamp: f64,
        distance: f64,
    },
    /// Nearest signature too far away, or the video has none.
    NoConfidentMatch { distance: Option<f64> },
    /// The query image produced no usable face.
    NoFaceDetected,
    /// The details are logged, never returned.
    InternalError,
}

impl SearchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, SearchOutcome::Match { .. })
    }
}

/// Wire form of a [`SearchOutcome`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&SearchOutcome> for SearchResponse {
    fn from(outcome: &SearchOutcome) -> Self {
        let miss = |reason: &str| SearchResponse {
            found: false,
            timestamp: None,
            distance: None,
            reason: Some(reason.to_string()),
        };
        match outcome {
            SearchOutcome::Match {
                timestamp,
                distance,
                ..
            } => SearchResponse {
                found: true,
                timestamp: Some(*timestamp),
                distance: Some(*distance),
                reason: None,
            },
            SearchOutcome::NoConfidentMatch { .. } => miss(REASON_NO_CONFIDENT_MATCH),
            SearchOutcome::NoFaceDetected => miss(REASON_NO_FACE),
            SearchOutcome::InternalError => miss(REASON_INTERNAL_ERROR),
        }
    }
}

/// Decides whether the closest stored signature is close enough to count.
#[derive(Clone, Debug)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self {
            threshold: MATCH_DISTANCE_THRESHOLD,
        }
    }
}

impl SimilarityMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A match requires distance strictly below the threshold.
    pub fn search(
        &self,
        store: &dyn SignatureStore,
        video_id: &str,
        query: &Embedding,
    ) -> SearchOutcome {
        match store.nearest(video_id, query) {
            Ok(Some(nearest)) if nearest.distance < self.threshold => SearchOutcome::Match {
                track_id: nearest.track_id,
                timestamp: nearest.start_ts,
                distance: nearest.distance,
            },
            Ok(nearest) => SearchOutcome::NoConfidentMatch {
                distance: nearest.map(|n| n.distance),
            },
            Err(e) => {
                log::error!("Search in video {video_id} failed: {e}");
                SearchOutcome::InternalError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::domain::finalized_track::FinalizedTrack;
    use crate::identity::domain::signature_store::{NearestSignature, StoreError, VideoSummary};
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Store that answers every query with a fixed distance.
    struct FixedStore(Result<Option<f64>, ()>);

    impl SignatureStore for FixedStore {
        fn save_video(&self, _: &str, _: &[FinalizedTrack]) -> Result<(), StoreError> {
            Ok(())
        }

        fn nearest(&self, _: &str, _: &Embedding) -> Result<Option<NearestSignature>, StoreError> {
            match self.0 {
                Ok(d) => Ok(d.map(|distance| NearestSignature {
                    track_id: 3,
                    start_ts: 1.5,
                    end_ts: 4.0,
                    distance,
                })),
                Err(()) => Err(StoreError::Poisoned),
            }
        }

        fn videos(&self) -> Result<Vec<VideoSummary>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn query() -> Embedding {
        Embedding::new(vec![1.0, 0.0])
    }

    #[test]
    fn test_match_reports_start_timestamp() {
        let outcome = SimilarityMatcher::new().search(&FixedStore(Ok(Some(0.1))), "v", &query());
        assert_eq!(
            outcome,
            SearchOutcome::Match {
                track_id: 3,
                timestamp: 1.5,
                distance: 0.1
            }
        );
    }

    #[rstest]
    #[case::at_threshold(0.35, false)]
    #[case::just_below(0.349_999, true)]
    #[case::above(0.8, false)]
    fn test_threshold_is_strict(#[case] distance: f64, #[case] found: bool) {
        let outcome =
            SimilarityMatcher::new().search(&FixedStore(Ok(Some(distance))), "v", &query());
        assert_eq!(outcome.is_match(), found);
    }

    #[test]
    fn test_empty_video_is_no_confident_match() {
        let outcome = SimilarityMatcher::new().search(&FixedStore(Ok(None)), "v", &query());
        assert_eq!(outcome, SearchOutcome::NoConfidentMatch { distance: None });
    }

    #[test]
    fn test_store_failure_is_internal_error() {
        let outcome = SimilarityMatcher::new().search(&FixedStore(Err(())), "v", &query());
        assert_eq!(outcome, SearchOutcome::InternalError);
    }

    #[test]
    fn test_response_for_match() {
        let outcome = SearchOutcome::Match {
            track_id: 1,
            timestamp: 2.5,
            distance: 0.125,
        };
        let json = serde_json::to_value(SearchResponse::from(&outcome)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"found": true, "timestamp": 2.5, "distance": 0.125})
        );
    }

    #[rstest]
    #[case(SearchOutcome::NoConfidentMatch { distance: Some(0.9) }, REASON_NO_CONFIDENT_MATCH)]
    #[case(SearchOutcome::NoFaceDetected, REASON_NO_FACE)]
    #[case(SearchOutcome::InternalError, REASON_INTERNAL_ERROR)]
    fn test_response_for_misses(#[case] outcome: SearchOutcome, #[case] reason: &str) {
        let response = SearchResponse::from(&outcome);
        assert!(!response.found);
        assert_eq!(response.reason.as_deref(), Some(reason));
        assert!(response.distance.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"found": false, "reason": reason}));
    }

    #[test]
    fn test_default_threshold() {
        assert_relative_eq!(SimilarityMatcher::new().threshold(), 0.35);
    }
}
