//! 5-point face landmarks and the frontality estimate derived from them.
//!
//! Pitch is approximated by comparing nose-to-eyes against nose-to-mouth
//! distance, yaw by comparing nose-to-left-eye against nose-to-right-eye.
//! A perfectly frontal face has both ratios at 1.0.

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

/// Denominator guard for the pose ratios.
const RATIO_EPSILON: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// [left_eye, right_eye, nose, left_mouth, right_mouth] in pixel coordinates.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn left_eye(&self) -> (f64, f64) {
        self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> (f64, f64) {
        self.points[RIGHT_EYE]
    }

    pub fn nose(&self) -> (f64, f64) {
        self.points[NOSE]
    }

    pub fn eye_midpoint(&self) -> (f64, f64) {
        midpoint(self.points[LEFT_EYE], self.points[RIGHT_EYE])
    }

    pub fn mouth_midpoint(&self) -> (f64, f64) {
        midpoint(self.points[LEFT_MOUTH], self.points[RIGHT_MOUTH])
    }

    /// `1 - |d(nose, eyes) / d(nose, mouth) - 1|`; 1.0 at neutral pitch.
    pub fn pitch_score(&self) -> f64 {
        let nose = self.nose();
        let ratio = distance(nose, self.eye_midpoint())
            / (distance(nose, self.mouth_midpoint()) + RATIO_EPSILON);
        1.0 - (ratio - 1.0).abs()
    }

    /// `1 - |d(nose, left eye) / d(nose, right eye) - 1|`; 1.0 at neutral yaw.
    pub fn yaw_score(&self) -> f64 {
        let nose = self.nose();
        let ratio =
            distance(nose, self.left_eye()) / (distance(nose, self.right_eye()) + RATIO_EPSILON);
        1.0 - (ratio - 1.0).abs()
    }

    /// Mean of pitch and yaw scores. Unbounded below for extreme poses.
    pub fn pose_score(&self) -> f64 {
        (self.pitch_score() + self.yaw_score()) / 2.0
    }

    /// Shifts every point by `(-dx, -dy)`, e.g. into crop coordinates.
    pub fn translated(&self, dx: f64, dy: f64) -> FaceLandmarks {
        FaceLandmarks::new(self.points.map(|(x, y)| (x - dx, y - dy)))
    }
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Nose equidistant from both eyes and from eye/mouth midpoints.
    fn frontal_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (40.0, 40.0), // left_eye
            (80.0, 40.0), // right_eye
            (60.0, 60.0), // nose
            (45.0, 80.0), // left_mouth
            (75.0, 80.0), // right_mouth
        ])
    }

    #[test]
    fn test_midpoints() {
        let lm = frontal_landmarks();
        assert_eq!(lm.eye_midpoint(), (60.0, 40.0));
        assert_eq!(lm.mouth_midpoint(), (60.0, 80.0));
    }

    #[test]
    fn test_frontal_face_scores_near_one() {
        let lm = frontal_landmarks();
        assert_relative_eq!(lm.pitch_score(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(lm.yaw_score(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(lm.pose_score(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_penalizes_turned_head() {
        // Nose 10px from left eye, 30px from right eye → ratio 1/3
        let lm = FaceLandmarks::new([
            (40.0, 60.0),
            (80.0, 60.0),
            (50.0, 60.0),
            (45.0, 80.0),
            (75.0, 80.0),
        ]);
        assert_relative_eq!(lm.yaw_score(), 1.0 - (10.0 / 30.0 - 1.0f64).abs(), epsilon = 1e-6);
        assert!(lm.yaw_score() < frontal_landmarks().yaw_score());
    }

    #[test]
    fn test_pitch_penalizes_tilted_head() {
        // Nose 10px below eyes, 30px above mouth → ratio 1/3
        let lm = FaceLandmarks::new([
            (40.0, 40.0),
            (80.0, 40.0),
            (60.0, 50.0),
            (45.0, 80.0),
            (75.0, 80.0),
        ]);
        assert_relative_eq!(lm.pitch_score(), 1.0 - (10.0 / 30.0 - 1.0f64).abs(), epsilon = 1e-3);
    }

    #[test]
    fn test_collapsed_landmarks_are_finite() {
        let lm = FaceLandmarks::new([(10.0, 10.0); 5]);
        assert!(lm.pose_score().is_finite());
        // 0 / (0 + eps) = 0 → score 0 for both components
        assert_relative_eq!(lm.pose_score(), 0.0);
    }

    #[rstest]
    #[case::left_eye_shifted(0)]
    #[case::left_mouth_shifted(3)]
    fn test_degenerate_denominator_guarded(#[case] moved: usize) {
        let mut pts = *frontal_landmarks().points();
        pts[RIGHT_EYE] = pts[NOSE];
        pts[RIGHT_MOUTH] = pts[NOSE];
        pts[LEFT_MOUTH] = pts[NOSE];
        pts[moved] = (pts[moved].0 + 1.0, pts[moved].1);
        let lm = FaceLandmarks::new(pts);
        assert!(lm.yaw_score().is_finite());
        assert!(lm.pitch_score().is_finite());
    }

    #[test]
    fn test_translated_preserves_pose() {
        let lm = frontal_landmarks();
        let moved = lm.translated(40.0, 40.0);
        assert_eq!(moved.left_eye(), (0.0, 0.0));
        assert_relative_eq!(moved.pose_score(), lm.pose_score(), epsilon = 1e-12);
    }
}
