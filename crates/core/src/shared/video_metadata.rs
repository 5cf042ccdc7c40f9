use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0.0 when the container does not report a rate.
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn has_known_fps(&self) -> bool {
        self.fps.is_finite() && self.fps > 0.0
    }

    /// Presentation time of `frame_index` in seconds.
    ///
    /// Without a usable frame rate every frame maps to 0.0.
    pub fn timestamp_of(&self, frame_index: usize) -> f64 {
        if self.has_known_fps() {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn meta(fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: 1920,
            height: 1080,
            fps,
            total_frames: 300,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/test.mp4")),
        }
    }

    #[test]
    fn test_construction() {
        let m = meta(30.0);
        assert_eq!(m.width, 1920);
        assert_eq!(m.height, 1080);
        assert_eq!(m.total_frames, 300);
        assert_eq!(m.codec, "h264");
        assert_eq!(m.source_path, Some(PathBuf::from("/tmp/test.mp4")));
    }

    #[test]
    fn test_timestamp_of_uses_fps() {
        let m = meta(30.0);
        assert_relative_eq!(m.timestamp_of(0), 0.0);
        assert_relative_eq!(m.timestamp_of(149), 149.0 / 30.0);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-25.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_timestamp_of_without_fps_is_zero(#[case] fps: f64) {
        let m = meta(fps);
        assert!(!m.has_known_fps());
        assert_eq!(m.timestamp_of(42), 0.0);
    }
}
