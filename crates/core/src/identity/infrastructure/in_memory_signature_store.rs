use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::detection::domain::embedding::Embedding;
use crate::identity::domain::finalized_track::FinalizedTrack;
use crate::identity::domain::signature_store::{
    nearest_signature, validate_tracks, NearestSignature, SignatureStore, StoreError, VideoSummary,
};
use crate::shared::constants::EMBEDDING_DIM;

/// Process-local signature store with exact brute-force search.
pub struct InMemorySignatureStore {
    videos: RwLock<BTreeMap<String, Vec<FinalizedTrack>>>,
    dimension: usize,
}

impl Default for InMemorySignatureStore {
    fn default() -> Self {
        Self::with_dimension(EMBEDDING_DIM)
    }
}

impl InMemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            videos: RwLock::new(BTreeMap::new()),
            dimension,
        }
    }

    pub fn tracks(&self, video_id: &str) -> Result<Vec<FinalizedTrack>, StoreError> {
        let videos = self.videos.read().map_err(|_| StoreError::Poisoned)?;
        Ok(videos.get(video_id).cloned().unwrap_or_default())
    }
}

impl SignatureStore for InMemorySignatureStore {
    fn save_video(&self, video_id: &str, tracks: &[FinalizedTrack]) -> Result<(), StoreError> {
        validate_tracks(video_id, tracks, self.dimension)?;
        let mut videos = self.videos.write().map_err(|_| StoreError::Poisoned)?;
        videos.insert(video_id.to_string(), tracks.to_vec());
        Ok(())
    }

    fn nearest(
        &self,
        video_id: &str,
        query: &Embedding,
    ) -> Result<Option<NearestSignature>, StoreError> {
        let videos = self.videos.read().map_err(|_| StoreError::Poisoned)?;
        let tracks = videos.get(video_id).map(Vec::as_slice).unwrap_or(&[]);
        nearest_signature(tracks, query, self.dimension)
    }

    fn videos(&self) -> Result<Vec<VideoSummary>, StoreError> {
        let videos = self.videos.read().map_err(|_| StoreError::Poisoned)?;
        Ok(videos
            .iter()
            .map(|(video_id, tracks)| VideoSummary {
                video_id: video_id.clone(),
                tracks: tracks.len(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(track_id: u32, signature: [f32; 2]) -> FinalizedTrack {
        FinalizedTrack {
            track_id,
            start_ts: track_id as f64,
            end_ts: track_id as f64 + 1.0,
            signature: Embedding::new(signature.to_vec()),
        }
    }

    #[test]
    fn test_search_is_scoped_by_video() {
        let store = InMemorySignatureStore::with_dimension(2);
        store.save_video("a", &[track(1, [1.0, 0.0])]).unwrap();
        store.save_video("b", &[track(2, [0.0, 1.0])]).unwrap();

        let query = Embedding::new(vec![0.0, 1.0]);
        assert_eq!(store.nearest("a", &query).unwrap().unwrap().track_id, 1);
        assert_eq!(store.nearest("b", &query).unwrap().unwrap().track_id, 2);
        assert!(store.nearest("c", &query).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_tracks() {
        let store = InMemorySignatureStore::with_dimension(2);
        store
            .save_video("a", &[track(1, [1.0, 0.0]), track(2, [0.0, 1.0])])
            .unwrap();
        store.save_video("a", &[track(3, [1.0, 0.0])]).unwrap();
        assert_eq!(store.tracks("a").unwrap().len(), 1);
    }

    #[test]
    fn test_failed_save_leaves_store_untouched() {
        let store = InMemorySignatureStore::with_dimension(2);
        store.save_video("a", &[track(1, [1.0, 0.0])]).unwrap();

        let bad = FinalizedTrack {
            signature: Embedding::new(vec![1.0]),
            ..track(2, [0.0, 0.0])
        };
        assert!(store.save_video("a", &[track(3, [0.0, 1.0]), bad]).is_err());
        assert_eq!(store.tracks("a").unwrap(), vec![track(1, [1.0, 0.0])]);
    }

    #[test]
    fn test_videos_lists_empty_analyses() {
        let store = InMemorySignatureStore::with_dimension(2);
        store.save_video("b", &[track(1, [1.0, 0.0])]).unwrap();
        store.save_video("a", &[]).unwrap();
        let summary = store.videos().unwrap();
        assert_eq!(
            summary,
            vec![
                VideoSummary {
                    video_id: "a".into(),
                    tracks: 0
                },
                VideoSummary {
                    video_id: "b".into(),
                    tracks: 1
                },
            ]
        );
    }
}
