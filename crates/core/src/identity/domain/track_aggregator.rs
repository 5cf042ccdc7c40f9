use crate::detection::domain::embedding::Embedding;
use crate::identity::domain::finalized_track::FinalizedTrack;
use crate::identity::domain::sample::{Sample, SampleCollector};
use crate::shared::constants::TOP_K_SAMPLES;

/// Why a track produced no signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    #[error("none of its {0} best samples has an embedding")]
    NoEmbedding(usize),
    #[error("its best samples mix embedding sizes {0:?}")]
    MixedDimensions(Vec<usize>),
}

/// Fuses a finished track's best samples into one identity signature.
///
/// Samples are ranked by quality (stable, so ties keep arrival order), the
/// top `top_k` kept, and those without an embedding discarded. The
/// survivors' embeddings are averaged and L2-normalized. The time span
/// covers every sample of the track, so it reflects when the face was on
/// screen rather than when it looked best.
#[derive(Clone, Debug)]
pub struct TrackAggregator {
    top_k: usize,
}

impl Default for TrackAggregator {
    fn default() -> Self {
        Self::new(TOP_K_SAMPLES)
    }
}

impl TrackAggregator {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn aggregate(
        &self,
        track_id: u32,
        samples: &[Sample],
    ) -> Result<FinalizedTrack, AggregationError> {
        let mut ranked: Vec<&Sample> = samples.iter().collect();
        ranked.sort_by(|a, b| b.quality.total_cmp(&a.quality));

        let kept: Vec<&Embedding> = ranked
            .into_iter()
            .take(self.top_k)
            .filter_map(|s| s.embedding.as_ref())
            .collect();
        if kept.is_empty() {
            return Err(AggregationError::NoEmbedding(samples.len().min(self.top_k)));
        }

        let signature = Embedding::mean(kept.iter().copied())
            .ok_or_else(|| {
                let mut sizes: Vec<usize> = kept.iter().map(|e| e.len()).collect();
                sizes.sort_unstable();
                sizes.dedup();
                AggregationError::MixedDimensions(sizes)
            })?
            .normalized();
        let start_ts = samples
            .iter()
            .map(|s| s.timestamp)
            .fold(f64::INFINITY, f64::min);
        let end_ts = samples
            .iter()
            .map(|s| s.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(FinalizedTrack {
            track_id,
            start_ts,
            end_ts,
            signature,
        })
    }

    /// Finalizes every collected track, dropping those without a signature.
    pub fn finalize_all(&self, collector: SampleCollector) -> Vec<FinalizedTrack> {
        collector
            .into_tracks()
            .into_iter()
            .filter_map(|(track_id, samples)| match self.aggregate(track_id, &samples) {
                Ok(track) => Some(track),
                Err(e @ AggregationError::NoEmbedding(_)) => {
                    log::info!("Track {track_id} dropped: {e}");
                    None
                }
                Err(e) => {
                    log::warn!("Track {track_id} dropped: {e}");
                    None
                }
            })
            .collect()
    }
}
