use ndarray::{Array2, ArrayView3};

use crate::shared::bbox::BoundingBox;

/// ITU-R BT.601 luma weights for R, G, B.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque apart from cropping and grayscale conversion.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `bbox` (clamped to the frame) into a new frame.
    ///
    /// Returns `None` when the clamped box has zero area.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
        let clamped = bbox.clamp_to(self.width, self.height);
        if clamped.is_empty() {
            return None;
        }

        let x1 = clamped.x1 as usize;
        let y1 = clamped.y1 as usize;
        let x2 = clamped.x2 as usize;
        let y2 = clamped.y2 as usize;
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;

        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * channels);
        for row in y1..y2 {
            let start = row * row_len + x1 * channels;
            let end = row * row_len + x2 * channels;
            data.extend_from_slice(&self.data[start..end]);
        }

        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.channels,
            self.index,
        ))
    }

    /// BT.601 luma plane as `[height, width]`, rounded to whole 8-bit levels
    /// the way an 8-bit grayscale conversion stores them.
    ///
    /// Single-channel frames are passed through unchanged.
    pub fn grayscale(&self) -> Array2<f64> {
        let src = self.as_ndarray();
        let (h, w) = (self.height as usize, self.width as usize);
        if self.channels < 3 {
            return Array2::from_shape_fn((h, w), |(y, x)| src[[y, x, 0]] as f64);
        }
        Array2::from_shape_fn((h, w), |(y, x)| {
            LUMA_WEIGHTS
                .iter()
                .enumerate()
                .map(|(c, wgt)| wgt * src[[y, x, c]] as f64)
                .sum::<f64>()
                .round()
        })
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
