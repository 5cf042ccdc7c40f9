//! Warps a face onto the canonical ArcFace 112×112 layout.
//!
//! The five detected landmarks are fitted to the reference template with a
//! least-squares similarity transform (uniform scale, rotation, translation);
//! the output is then sampled bilinearly through the inverse transform.
//! Pixels that fall outside the source frame are black.

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

pub const ALIGNED_SIZE: u32 = 112;

/// Landmark positions of a canonical face in a 112×112 ArcFace input.
pub const ARCFACE_TEMPLATE: [(f64, f64); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// `p -> [[a, -b], [b, a]] · p + t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform {
    /// Least-squares fit mapping `src` onto `dst`.
    ///
    /// `None` when the source points are (nearly) coincident.
    pub fn estimate(src: &[(f64, f64); 5], dst: &[(f64, f64); 5]) -> Option<Self> {
        let (sx, sy) = centroid(src);
        let (dx, dy) = centroid(dst);

        let mut spread = 0.0;
        let mut dot = 0.0;
        let mut cross = 0.0;
        for (&(px, py), &(qx, qy)) in src.iter().zip(dst) {
            let (px, py) = (px - sx, py - sy);
            let (qx, qy) = (qx - dx, qy - dy);
            spread += px * px + py * py;
            dot += px * qx + py * qy;
            cross += px * qy - py * qx;
        }
        if spread < 1e-9 {
            return None;
        }

        let a = dot / spread;
        let b = cross / spread;
        Some(Self {
            a,
            b,
            tx: dx - (a * sx - b * sy),
            ty: dy - (b * sx + a * sy),
        })
    }

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Maps a destination point back into source coordinates.
    pub fn invert(&self, (u, v): (f64, f64)) -> (f64, f64) {
        let det = self.a * self.a + self.b * self.b;
        let (u, v) = (u - self.tx, v - self.ty);
        ((self.a * u + self.b * v) / det, (self.a * v - self.b * u) / det)
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }
}

fn centroid(points: &[(f64, f64); 5]) -> (f64, f64) {
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (sx / 5.0, sy / 5.0)
}

/// Aligned 112×112 face crop, or `None` for degenerate landmarks.
pub fn align_face(frame: &Frame, landmarks: &FaceLandmarks) -> Option<Frame> {
    let transform = SimilarityTransform::estimate(landmarks.points(), &ARCFACE_TEMPLATE)?;
    let src = frame.as_ndarray();
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let channels = frame.channels() as usize;
    if w == 0 || h == 0 {
        return None;
    }

    let texel = |x: i64, y: i64, c: usize| -> f64 {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            src[[y as usize, x as usize, c]] as f64
        } else {
            0.0
        }
    };

    let size = ALIGNED_SIZE as usize;
    let mut data = Vec::with_capacity(size * size * channels);
    for oy in 0..size {
        for ox in 0..size {
            let (sx, sy) = transform.invert((ox as f64, oy as f64));
            let (x0, y0) = (sx.floor(), sy.floor());
            let (fx, fy) = (sx - x0, sy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            for c in 0..channels {
                let top = texel(x0, y0, c) * (1.0 - fx) + texel(x0 + 1, y0, c) * fx;
                let bottom = texel(x0, y0 + 1, c) * (1.0 - fx) + texel(x0 + 1, y0 + 1, c) * fx;
                let value = top * (1.0 - fy) + bottom * fy;
                data.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    Some(Frame::new(
        data,
        ALIGNED_SIZE,
        ALIGNED_SIZE,
        frame.channels(),
        frame.index(),
    ))
}
