use std::collections::HashMap;

use crate::detection::domain::embedding::Embedding;

/// One scored observation of a tracked face.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Seconds from the start of the video.
    pub timestamp: f64,
    pub quality: f64,
    pub embedding: Option<Embedding>,
}

/// Append-only per-track sample buckets for one video run.
///
/// Tracks are yielded in the order their first sample arrived, so results
/// do not depend on hash iteration order.
#[derive(Debug, Default)]
pub struct SampleCollector {
    order: Vec<u32>,
    samples: HashMap<u32, Vec<Sample>>,
}

impl SampleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track_id: u32, sample: Sample) {
        self.samples
            .entry(track_id)
            .or_insert_with(|| {
                self.order.push(track_id);
                Vec::new()
            })
            .push(sample);
    }

    pub fn track_count(&self) -> usize {
        self.order.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn samples_for(&self, track_id: u32) -> &[Sample] {
        self.samples.get(&track_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_tracks(mut self) -> Vec<(u32, Vec<Sample>)> {
        self.order
            .iter()
            .filter_map(|id| self.samples.remove(id).map(|s| (*id, s)))
            .collect()
    }
}
