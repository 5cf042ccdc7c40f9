/// ByteTrack multi-object tracker.
///
/// Two-stage association strategy: high-confidence detections are matched
/// first against every live track, then low-confidence detections fill the
/// remaining `Tracked` ones. Weak detections can keep an identity alive
/// through a confidence dip but never start a new one.
///
/// Tracks born after the first frame start `New` and are only reported
/// once a second detection confirms them.
use std::collections::HashSet;

use crate::shared::bbox::BoundingBox;
use crate::shared::constants::{MATCH_THRESH, REFERENCE_FRAME_RATE, TRACK_BUFFER, TRACK_THRESH};
use crate::tracking::domain::face_tracker::{Detection, FaceTracker, TrackedBox};
use crate::tracking::domain::motion_model::MotionModel;
use crate::tracking::domain::track_state::TrackState;

/// Detections at or below this score are discarded outright.
const LOW_SCORE_FLOOR: f64 = 0.1;

/// Maximum IoU distance for confirming a `New` track.
const UNCONFIRMED_MATCH_THRESH: f64 = 0.7;

/// IoU above which a `Tracked` and a `Lost` track are considered the same face.
const DUPLICATE_IOU: f64 = 0.85;

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Minimum score for the first association pass and for spawning tracks.
    pub track_thresh: f64,
    /// Maximum IoU distance (`1 - IoU`) for a track/detection pair to match.
    pub match_thresh: f64,
    /// Tolerated consecutive misses at the reference frame rate.
    pub track_buffer: u32,
    pub frame_rate: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: TRACK_THRESH,
            match_thresh: MATCH_THRESH,
            track_buffer: TRACK_BUFFER,
            frame_rate: REFERENCE_FRAME_RATE,
        }
    }
}

impl TrackerConfig {
    pub fn with_frame_rate(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            ..Self::default()
        }
    }

    /// Frames a `Lost` track may go unmatched before it is removed.
    ///
    /// Scaled from the reference rate; an unusable frame rate falls back
    /// to the unscaled buffer.
    pub fn buffer_window(&self) -> u64 {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            (self.frame_rate / REFERENCE_FRAME_RATE * self.track_buffer as f64) as u64
        } else {
            self.track_buffer as u64
        }
    }
}

#[derive(Clone, Debug)]
struct Track {
    id: u32,
    state: TrackState,
    motion: MotionModel,
    start_frame: u64,
    last_matched_frame: u64,
}

impl Track {
    fn bbox(&self) -> BoundingBox {
        self.motion.bbox()
    }

    fn apply_match(&mut self, det: &Detection, frame_id: u64) {
        self.motion.correct(&det.bbox);
        self.state = TrackState::Tracked;
        self.last_matched_frame = frame_id;
    }

    fn frames_since_match(&self, frame_id: u64) -> u64 {
        frame_id - self.last_matched_frame
    }

    fn age(&self, frame_id: u64) -> u64 {
        frame_id - self.start_frame
    }
}

pub struct ByteTracker {
    tracks: Vec<Track>,
    next_id: u32,
    frame_id: u64,
    config: TrackerConfig,
    buffer_window: u64,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let buffer_window = config.buffer_window();
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            config,
            buffer_window,
        }
    }

    /// Number of tracks currently held, in any non-terminal state.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn predict_live_tracks(&mut self) {
        for track in self.tracks.iter_mut().filter(|t| t.state.is_alive()) {
            track.motion.predict();
        }
    }

    /// Matches `dets` against the tracks at `candidates`; returns matched
    /// track indices and the detection indices left over.
    fn associate<'d>(
        &mut self,
        candidates: &[usize],
        dets: &[(usize, &'d Detection)],
        max_cost: f64,
    ) -> (HashSet<usize>, Vec<(usize, &'d Detection)>) {
        let track_refs: Vec<(usize, BoundingBox)> = candidates
            .iter()
            .map(|&ti| (ti, self.tracks[ti].bbox()))
            .collect();

        let mut matched_tracks = HashSet::new();
        let mut matched_dets = HashSet::new();
        for (ti, di) in greedy_match(&track_refs, dets, max_cost) {
            let det = dets
                .iter()
                .find(|(i, _)| *i == di)
                .map(|(_, d)| *d);
            if let Some(det) = det {
                self.tracks[ti].apply_match(det, self.frame_id);
                matched_tracks.insert(ti);
                matched_dets.insert(di);
            }
        }

        let leftover = dets
            .iter()
            .filter(|(di, _)| !matched_dets.contains(di))
            .copied()
            .collect();
        (matched_tracks, leftover)
    }

    fn spawn(&mut self, det: &Detection) {
        // Nothing to confirm against on the very first frame
        let state = if self.frame_id == 1 {
            TrackState::Tracked
        } else {
            TrackState::New
        };
        self.tracks.push(Track {
            id: self.next_id,
            state,
            motion: MotionModel::new(&det.bbox),
            start_frame: self.frame_id,
            last_matched_frame: self.frame_id,
        });
        self.next_id += 1;
    }

    fn expire_lost_tracks(&mut self) {
        let frame_id = self.frame_id;
        let window = self.buffer_window;
        for track in self.tracks.iter_mut() {
            if track.state == TrackState::Lost && track.frames_since_match(frame_id) > window {
                log::debug!("Track {} removed after {window} unmatched frames", track.id);
                track.state = TrackState::Removed;
            }
        }
    }

    /// A `Lost` track overlapping a `Tracked` one is the same face picked up
    /// twice; the younger of the pair is removed, the `Tracked` one on a tie
    /// of ages.
    fn remove_duplicates(&mut self) {
        let frame_id = self.frame_id;
        let mut doomed = Vec::new();
        for (ai, a) in self.tracks.iter().enumerate() {
            if a.state != TrackState::Tracked {
                continue;
            }
            for (bi, b) in self.tracks.iter().enumerate() {
                if b.state != TrackState::Lost || a.bbox().iou(&b.bbox()) <= DUPLICATE_IOU {
                    continue;
                }
                if a.age(frame_id) >= b.age(frame_id) {
                    doomed.push(bi);
                } else {
                    doomed.push(ai);
                }
            }
        }
        for idx in doomed {
            self.tracks[idx].state = TrackState::Removed;
        }
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl FaceTracker for ByteTracker {
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedBox> {
        self.frame_id += 1;
        let (high, low) = split_by_confidence(detections, self.config.track_thresh);

        self.predict_live_tracks();

        // First pass: high-confidence detections against Tracked + Lost
        let pool: Vec<usize> = indices_where(&self.tracks, |t| t.state.is_alive());
        let (matched_first, unmatched_high) =
            self.associate(&pool, &high, self.config.match_thresh);

        // Second pass: low-confidence detections against still-unmatched Tracked
        let remaining: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|ti| {
                !matched_first.contains(ti) && self.tracks[*ti].state == TrackState::Tracked
            })
            .collect();
        let (matched_second, _) = self.associate(&remaining, &low, self.config.match_thresh);
        for ti in remaining {
            if !matched_second.contains(&ti) {
                self.tracks[ti].state = TrackState::Lost;
            }
        }

        // Unconfirmed tracks get one chance against leftover high detections
        let unconfirmed: Vec<usize> = indices_where(&self.tracks, |t| t.state == TrackState::New);
        let (confirmed, unmatched_high) =
            self.associate(&unconfirmed, &unmatched_high, UNCONFIRMED_MATCH_THRESH);
        for ti in unconfirmed {
            if !confirmed.contains(&ti) {
                self.tracks[ti].state = TrackState::Removed;
            }
        }

        for (_, det) in unmatched_high {
            self.spawn(det);
        }

        self.expire_lost_tracks();
        self.remove_duplicates();
        self.tracks.retain(|t| t.state != TrackState::Removed);

        self.tracks
            .iter()
            .filter(|t| t.state.is_alive())
            .map(|t| TrackedBox {
                track_id: t.id,
                bbox: t.bbox(),
                state: t.state,
            })
            .collect()
    }
}

type IndexedDets<'a> = Vec<(usize, &'a Detection)>;

fn split_by_confidence(detections: &[Detection], thresh: f64) -> (IndexedDets<'_>, IndexedDets<'_>) {
    let mut high = Vec::new();
    let mut low = Vec::new();
    for (i, det) in detections.iter().enumerate() {
        if det.score >= thresh {
            high.push((i, det));
        } else if det.score > LOW_SCORE_FLOOR {
            low.push((i, det));
        }
    }
    (high, low)
}

fn indices_where(tracks: &[Track], pred: impl Fn(&Track) -> bool) -> Vec<usize> {
    tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| pred(t))
        .map(|(i, _)| i)
        .collect()
}

/// Greedy IoU matching: each track/detection used at most once.
///
/// Pairs with IoU distance above `max_cost` (or no overlap) are never
/// admitted. Candidates are taken by descending IoU, then descending
/// detection score, then ascending detection index, then ascending track
/// index, so identical input always yields identical associations.
fn greedy_match(
    tracks: &[(usize, BoundingBox)],
    dets: &[(usize, &Detection)],
    max_cost: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for (di, det) in dets {
            let iou = bbox.iou(&det.bbox);
            if iou > 0.0 && 1.0 - iou <= max_cost {
                pairs.push((*ti, *di, iou, det.score));
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then(b.3.total_cmp(&a.3))
            .then(a.1.cmp(&b.1))
            .then(a.0.cmp(&b.0))
    });

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _, _) in &pairs {
        if !used_tracks.contains(ti) && !used_dets.contains(di) {
            used_tracks.insert(*ti);
            used_dets.insert(*di);
            matches.push((*ti, *di));
        }
    }
    matches
}
