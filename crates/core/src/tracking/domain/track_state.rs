/// Lifecycle of one tracked identity.
///
/// `New → Tracked ⇄ Lost → Removed`. A `New` track that misses its
/// confirming frame goes straight to `Removed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TrackState {
    /// Created this frame, not yet confirmed.
    #[default]
    New,
    /// Matched in the most recent frame.
    Tracked,
    /// Unmatched, still inside the buffer window.
    Lost,
    /// Terminal.
    Removed,
}

impl TrackState {
    /// Whether the track takes part in association against the frame's detections.
    pub fn is_alive(self) -> bool {
        matches!(self, TrackState::Tracked | TrackState::Lost)
    }
}
