/// Decides which decoded frames go through detection.
///
/// While the tracker holds any live track, tracked or lost, every frame is
/// analyzed. After a frame with no live tracks the next `round(fps / 2)` frames are
/// skipped, so empty stretches of video cost about two detections per second.
#[derive(Clone, Debug)]
pub struct FrameSampler {
    skip_span: usize,
    pending_skip: usize,
    skipped: usize,
}

impl FrameSampler {
    /// An unknown or invalid `fps` disables skipping.
    pub fn new(fps: f64) -> Self {
        let skip_span = if fps.is_finite() && fps > 0.0 {
            (fps / 2.0).round() as usize
        } else {
            0
        };
        Self {
            skip_span,
            pending_skip: 0,
            skipped: 0,
        }
    }

    pub fn skip_span(&self) -> usize {
        self.skip_span
    }

    /// Consumes one frame slot; `false` means the frame is skipped.
    pub fn should_analyze(&mut self) -> bool {
        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            self.skipped += 1;
            false
        } else {
            true
        }
    }

    /// Reports the number of live tracks after an analyzed frame.
    pub fn record(&mut self, live_tracks: usize) {
        self.pending_skip = if live_tracks == 0 { self.skip_span } else { 0 };
    }

    pub fn skipped_frames(&self) -> usize {
        self.skipped
    }
}
