/// ArcFace embedding decorator over any `FaceDetector`.
///
/// Runs the wrapped detector, aligns each face to the ArcFace landmark
/// template and attaches an L2-normalized identity embedding. Faces without
/// usable landmarks fall back to their bounding-box crop; faces whose crop is
/// empty keep `embedding: None` and are skipped by aggregation downstream.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::embedding::Embedding;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::detection::infrastructure::face_alignment::align_face;
use crate::shared::constants::EMBEDDING_DIM;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct EmbeddingFaceDetector<D: FaceDetector> {
    inner: D,
    session: Mutex<ort::session::Session>,
}

impl<D: FaceDetector> EmbeddingFaceDetector<D> {
    pub fn new(inner: D, model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        Ok(Self {
            inner,
            session: Mutex::new(session),
        })
    }

    fn embed(&self, crop: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess(crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;
        if embedding_slice.len() != EMBEDDING_DIM {
            return Err(format!(
                "Embedding model produced {} values, expected {EMBEDDING_DIM}",
                embedding_slice.len()
            )
            .into());
        }

        Ok(Embedding::new(embedding_slice.to_vec()).normalized())
    }
}

impl<D: FaceDetector> FaceDetector for EmbeddingFaceDetector<D> {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
        let mut records = self.inner.detect(frame)?;
        for record in records.iter_mut() {
            let Some(face) = embedding_input(frame, record) else {
                continue;
            };
            record.embedding = Some(self.embed(&face)?);
        }
        Ok(records)
    }
}

/// Aligned face when the landmarks allow it, otherwise the raw box crop.
fn embedding_input(frame: &Frame, record: &FaceRecord) -> Option<Frame> {
    record
        .landmarks
        .as_ref()
        .and_then(|landmarks| align_face(frame, landmarks))
        .or_else(|| frame.crop(&record.bbox))
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(crop: &Frame) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;
    let channels = crop.channels() as usize;
    let src = crop.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let value = src[[src_y, src_x, c.min(channels - 1)]] as f32;
                tensor[[0, c, y, x]] = (value - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::detection::infrastructure::face_alignment::ARCFACE_TEMPLATE;
    use crate::shared::bbox::BoundingBox;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn textured(width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_landmarked_face_is_aligned() {
        let frame = textured(160, 120);
        let landmarks =
            FaceLandmarks::new(ARCFACE_TEMPLATE.map(|(x, y)| (x * 0.8 + 30.0, y * 0.8 + 10.0)));
        let record = FaceRecord::new(BoundingBox::new(30.0, 10.0, 120.0, 100.0), 0.9)
            .with_landmarks(landmarks);

        let face = embedding_input(&frame, &record).unwrap();
        assert_eq!((face.width(), face.height()), (112, 112));
    }

    #[test]
    fn test_face_without_landmarks_uses_box_crop() {
        let frame = textured(160, 120);
        let record = FaceRecord::new(BoundingBox::new(30.0, 10.0, 70.0, 60.0), 0.9);

        let face = embedding_input(&frame, &record).unwrap();
        assert_eq!((face.width(), face.height()), (40, 50));
    }

    #[test]
    fn test_degenerate_landmarks_fall_back_to_box_crop() {
        let frame = textured(160, 120);
        let record = FaceRecord::new(BoundingBox::new(30.0, 10.0, 70.0, 60.0), 0.9)
            .with_landmarks(FaceLandmarks::new([(50.0, 30.0); 5]));

        let face = embedding_input(&frame, &record).unwrap();
        assert_eq!((face.width(), face.height()), (40, 50));
    }

    #[test]
    fn test_empty_box_without_landmarks_has_no_input() {
        let frame = textured(160, 120);
        let record = FaceRecord::new(BoundingBox::new(200.0, 200.0, 240.0, 240.0), 0.9);
        assert!(embedding_input(&frame, &record).is_none());
    }

    #[test]
    fn test_preprocess_shape() {
        let crop = Frame::new(vec![128u8; 50 * 50 * 3], 50, 50, 3, 0);
        assert_eq!(preprocess(&crop).shape(), &[1, 3, 112, 112]);
    }

    #[rstest]
    #[case::mid(127, (127.0 - 127.5) / 127.5)]
    #[case::max(255, 1.0)]
    #[case::min(0, -1.0)]
    fn test_preprocess_normalization(#[case] pixel: u8, #[case] expected: f32) {
        let crop = Frame::new(vec![pixel; 10 * 10 * 3], 10, 10, 3, 0);
        assert_relative_eq!(preprocess(&crop)[[0, 0, 0, 0]], expected, epsilon = 0.01);
    }

    #[test]
    fn test_preprocess_samples_source_by_position() {
        // Left half black, right half white
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 255, 255, 255, 255, 255, 255]);
        }
        let crop = Frame::new(data, 4, 4, 3, 0);
        let tensor = preprocess(&crop);
        assert_relative_eq!(tensor[[0, 1, 50, 10]], -1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 1, 50, 100]], 1.0, epsilon = 0.01);
    }
}
