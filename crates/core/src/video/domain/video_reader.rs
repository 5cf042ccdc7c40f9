use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

pub type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Reads frames from a video or image source.
///
/// Implementations handle codec and container details; the pipeline only
/// sees RGB `Frame`s in presentation order and the source's `VideoMetadata`.
pub trait VideoReader: Send {
    /// Opens a video or image file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Lazily decodes frames in order. A decode failure is yielded as an
    /// `Err` item; callers stop at the first one.
    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_>;

    /// Releases any resources held by the reader. Safe to call twice.
    fn close(&mut self);
}
