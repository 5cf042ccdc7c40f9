use crate::shared::bbox::BoundingBox;

/// Weight given to the measurement residual when correcting position/size.
pub const DEFAULT_POSITION_GAIN: f64 = 0.8;

/// Weight given to the measurement residual when correcting velocity.
pub const DEFAULT_VELOCITY_GAIN: f64 = 0.3;

/// Constant-velocity motion model over `[cx, cy, w, h]`.
///
/// An alpha-beta filter: `predict` advances the state by one frame of
/// velocity, `correct` blends the observed box into the prediction and
/// nudges velocity by the residual.
///
/// Formula, per component: `r = z - x̂; x = x̂ + α·r; v = v + β·r`
#[derive(Clone, Debug, PartialEq)]
pub struct MotionModel {
    state: [f64; 4],
    velocity: [f64; 4],
    position_gain: f64,
    velocity_gain: f64,
}

impl MotionModel {
    pub fn new(bbox: &BoundingBox) -> Self {
        Self::with_gains(bbox, DEFAULT_POSITION_GAIN, DEFAULT_VELOCITY_GAIN)
    }

    pub fn with_gains(bbox: &BoundingBox, position_gain: f64, velocity_gain: f64) -> Self {
        Self {
            state: params_of(bbox),
            velocity: [0.0; 4],
            position_gain,
            velocity_gain,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        let [cx, cy, w, h] = self.state;
        BoundingBox::from_center(cx, cy, w.max(0.0), h.max(0.0))
    }

    #[cfg(test)]
    pub(crate) fn velocity(&self) -> [f64; 4] {
        self.velocity
    }

    /// Advances one frame and returns the predicted box.
    pub fn predict(&mut self) -> BoundingBox {
        for (s, v) in self.state.iter_mut().zip(self.velocity.iter()) {
            *s += v;
        }
        self.bbox()
    }

    pub fn correct(&mut self, observed: &BoundingBox) {
        let measured = params_of(observed);
        for i in 0..4 {
            let residual = measured[i] - self.state[i];
            self.state[i] += self.position_gain * residual;
            self.velocity[i] += self.velocity_gain * residual;
        }
    }
}

fn params_of(bbox: &BoundingBox) -> [f64; 4] {
    let (cx, cy) = bbox.center();
    [cx, cy, bbox.width(), bbox.height()]
}
