use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::signature_store::SignatureStore;
use crate::identity::domain::similarity_matcher::{SearchOutcome, SimilarityMatcher};
use crate::shared::frame::Frame;

/// Answers "does the person in this image appear in that video, and when?"
///
/// The query image goes through the same detector/embedder as analysis;
/// the first detected face is the query. Unlike analysis this use case is
/// reusable and never fails: every problem maps to a [`SearchOutcome`].
pub struct SearchFaceUseCase {
    detector: Arc<dyn FaceDetector>,
    store: Arc<dyn SignatureStore>,
    matcher: SimilarityMatcher,
}

impl SearchFaceUseCase {
    pub fn new(detector: Arc<dyn FaceDetector>, store: Arc<dyn SignatureStore>) -> Self {
        Self {
            detector,
            store,
            matcher: SimilarityMatcher::new(),
        }
    }

    pub fn execute(&self, video_id: &str, query: &Frame) -> SearchOutcome {
        let records = match self.detector.detect(query) {
            Ok(records) => records,
            Err(e) => {
                log::error!("Query face detection failed: {e}");
                return SearchOutcome::InternalError;
            }
        };

        let Some(embedding) = records.into_iter().next().and_then(|r| r.embedding) else {
            log::info!("No usable face in query image for video '{video_id}'");
            return SearchOutcome::NoFaceDetected;
        };

        let outcome = self.matcher.search(self.store.as_ref(), video_id, &embedding);
        log::debug!("Search in '{video_id}': {outcome:?}");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::detection::domain::embedding::Embedding;
    use crate::detection::domain::face_record::FaceRecord;
    use crate::identity::domain::similarity_matcher::SearchResponse;
    use crate::identity::infrastructure::in_memory_signature_store::InMemorySignatureStore;
    use crate::pipeline::analyze_video_use_case::test_support::*;
    use crate::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
    use crate::shared::bbox::BoundingBox;
    use approx::assert_relative_eq;

    /// Query-side detector returning a fixed answer regardless of the image.
    struct QueryDetector(Result<Vec<FaceRecord>, &'static str>);

    impl FaceDetector for QueryDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
            self.0.clone().map_err(Into::into)
        }
    }

    fn query_face(embedding: Option<Embedding>) -> FaceRecord {
        let record = FaceRecord::new(BoundingBox::new(10.0, 10.0, 40.0, 50.0), 0.95);
        match embedding {
            Some(e) => record.with_embedding(e),
            None => record,
        }
    }

    /// Store holding one analyzed video where identity 0 enters at frame 60.
    fn analyzed_store() -> Arc<InMemorySignatureStore> {
        let store = Arc::new(InMemorySignatureStore::new());
        let detector = ScriptedDetector::new(vec![ScriptedFace {
            frames: 60..150,
            bbox: BoundingBox::new(20.0, 12.0, 52.0, 52.0),
            embedding: identity(0),
        }]);
        AnalyzeVideoUseCase::new(
            Path::new("/tmp/synthetic.mp4"),
            Box::new(SyntheticReader::new(30.0, 300)),
            Arc::new(detector),
            store.clone(),
        )
        .execute("clip")
        .unwrap();
        store
    }

    fn search(store: Arc<InMemorySignatureStore>, detector: QueryDetector) -> SearchOutcome {
        SearchFaceUseCase::new(Arc::new(detector), store).execute("clip", &textured_frame(0))
    }

    #[test]
    fn test_same_person_found_when_first_tracked() {
        let outcome = search(
            analyzed_store(),
            QueryDetector(Ok(vec![query_face(Some(identity(0)))])),
        );
        match outcome {
            SearchOutcome::Match {
                timestamp,
                distance,
                ..
            } => {
                // Empty stretch is sampled every 16 frames: the face is first
                // seen unconfirmed at 64 and tracked from 80
                assert_relative_eq!(timestamp, 80.0 / 30.0, epsilon = 1e-9);
                assert!(distance < 1e-6);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_unrelated_person_not_found() {
        let outcome = search(
            analyzed_store(),
            QueryDetector(Ok(vec![query_face(Some(identity(7)))])),
        );
        assert_eq!(
            outcome,
            SearchOutcome::NoConfidentMatch {
                distance: Some(1.0)
            }
        );
        assert_eq!(
            SearchResponse::from(&outcome).reason.as_deref(),
            Some("No confident match")
        );
    }

    #[test]
    fn test_only_first_query_face_is_used() {
        let outcome = search(
            analyzed_store(),
            QueryDetector(Ok(vec![
                query_face(Some(identity(7))),
                query_face(Some(identity(0))),
            ])),
        );
        assert!(!outcome.is_match());
    }

    #[test]
    fn test_query_without_face() {
        let outcome = search(analyzed_store(), QueryDetector(Ok(vec![])));
        assert_eq!(outcome, SearchOutcome::NoFaceDetected);
    }

    #[test]
    fn test_query_face_without_embedding() {
        let outcome = search(analyzed_store(), QueryDetector(Ok(vec![query_face(None)])));
        assert_eq!(outcome, SearchOutcome::NoFaceDetected);
    }

    #[test]
    fn test_detector_error_is_internal() {
        let outcome = search(analyzed_store(), QueryDetector(Err("session crashed")));
        assert_eq!(outcome, SearchOutcome::InternalError);
    }

    #[test]
    fn test_unindexed_video_has_no_match() {
        let store = Arc::new(InMemorySignatureStore::new());
        let outcome = search(store, QueryDetector(Ok(vec![query_face(Some(identity(0)))])));
        assert_eq!(outcome, SearchOutcome::NoConfidentMatch { distance: None });
    }
}
