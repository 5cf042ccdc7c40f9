use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameResult, VideoReader};

/// Adapts a single still image to the [`VideoReader`] interface.
///
/// The image is a one-frame source with `fps = 0` and `total_frames = 1`,
/// so query photos go through the same detector path as video frames.
/// EXIF orientation is applied before conversion to RGB.
pub struct ImageFileReader {
    pending: Option<Frame>,
    opened: bool,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self {
            pending: None,
            opened: false,
        }
    }

    /// Decodes `path` straight into a frame.
    pub fn load_frame(path: &Path) -> FrameResult {
        let mut reader = Self::new();
        reader.open(path)?;
        let frame = reader.frames().next().ok_or("Image produced no frame")?;
        reader.close();
        frame
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_rgb(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let frame = decode_rgb(path)?;
        let codec = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            codec,
            source_path: Some(path.to_path_buf()),
        };
        self.pending = Some(frame);
        self.opened = true;
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        if !self.opened {
            return Box::new(std::iter::once(Err("ImageFileReader: not opened".into())));
        }
        // A still yields its frame once; later calls see an exhausted source
        Box::new(self.pending.take().into_iter().map(Ok))
    }

    fn close(&mut self) {
        self.pending = None;
        self.opened = false;
    }
}
