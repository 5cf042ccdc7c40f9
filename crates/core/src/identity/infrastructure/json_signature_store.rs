use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::detection::domain::embedding::Embedding;
use crate::identity::domain::finalized_track::FinalizedTrack;
use crate::identity::domain::signature_store::{
    nearest_signature, validate_tracks, NearestSignature, SignatureStore, StoreError, VideoSummary,
};
use crate::shared::constants::EMBEDDING_DIM;

/// On-disk layout. The dimension is recorded so a file written for one
/// embedding model is never searched with another's vectors.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    dimension: usize,
    videos: BTreeMap<String, Vec<FinalizedTrack>>,
}

/// Signature store persisted as a single JSON document.
///
/// The whole file is read on open and rewritten on every save through a
/// temporary sibling and a rename, so readers never see a half-written file
/// and a failed save keeps the previous one.
pub struct JsonSignatureStore {
    path: PathBuf,
    dimension: usize,
    videos: Mutex<BTreeMap<String, Vec<FinalizedTrack>>>,
}

impl JsonSignatureStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_dimension(path, EMBEDDING_DIM)
    }

    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open_with_dimension(path: &Path, dimension: usize) -> Result<Self, StoreError> {
        let videos = match fs::read_to_string(path) {
            Ok(json) => {
                let file: StoreFile = serde_json::from_str(&json)?;
                if file.dimension != dimension {
                    return Err(StoreError::DimensionMismatch {
                        expected: dimension,
                        actual: file.dimension,
                    });
                }
                file.videos
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        log::debug!(
            "Opened signature store {} ({} videos)",
            path.display(),
            videos.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            dimension,
            videos: Mutex::new(videos),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, videos: &BTreeMap<String, Vec<FinalizedTrack>>) -> Result<(), StoreError> {
        let io_err = |path: &Path, source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let file = StoreFile {
            dimension: self.dimension,
            videos: videos.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.path.with_extension("part");
        let result = fs::write(&temp_path, json)
            .map_err(|e| io_err(&temp_path, e))
            .and_then(|()| fs::rename(&temp_path, &self.path).map_err(|e| io_err(&self.path, e)));
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

impl SignatureStore for JsonSignatureStore {
    fn save_video(&self, video_id: &str, tracks: &[FinalizedTrack]) -> Result<(), StoreError> {
        validate_tracks(video_id, tracks, self.dimension)?;
        let mut videos = self.videos.lock().map_err(|_| StoreError::Poisoned)?;

        let mut updated = videos.clone();
        updated.insert(video_id.to_string(), tracks.to_vec());
        self.write(&updated)?;
        *videos = updated;

        log::debug!(
            "Saved {} signatures for video {video_id} to {}",
            tracks.len(),
            self.path.display()
        );
        Ok(())
    }

    fn nearest(
        &self,
        video_id: &str,
        query: &Embedding,
    ) -> Result<Option<NearestSignature>, StoreError> {
        let videos = self.videos.lock().map_err(|_| StoreError::Poisoned)?;
        let tracks = videos.get(video_id).map(Vec::as_slice).unwrap_or(&[]);
        nearest_signature(tracks, query, self.dimension)
    }

    fn videos(&self) -> Result<Vec<VideoSummary>, StoreError> {
        let videos = self.videos.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(videos
            .iter()
            .map(|(video_id, tracks)| VideoSummary {
                video_id: video_id.clone(),
                tracks: tracks.len(),
            })
            .collect())
    }
}
