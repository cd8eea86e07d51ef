//! Constant-velocity motion model over box center, aspect ratio and height.
//!
//! The state is `(cx, cy, a, h)` plus one velocity per coordinate. Process
//! and measurement noise are diagonal and each coordinate only couples with
//! its own velocity, so the 8x8 covariance is block diagonal and is stored
//! as four 2x2 blocks. Predict and update on the blocks are exact.

/// 95% quantile of the chi-square distribution with 4 degrees of freedom.
pub const CHI2_INV_95_4DOF: f64 = 9.4877;

const STD_WEIGHT_POSITION: f64 = 1.0 / 20.0;
const STD_WEIGHT_VELOCITY: f64 = 1.0 / 160.0;

const AXES: usize = 4;
const ASPECT: usize = 2;
const HEIGHT: usize = 3;

/// Covariance of one coordinate and its velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
struct AxisCovariance {
    pos: f64,
    cross: f64,
    vel: f64,
}

/// Filter state owned by a single track.
#[derive(Clone, Debug, PartialEq)]
pub struct KalmanState {
    position: [f64; AXES],
    velocity: [f64; AXES],
    covariance: [AxisCovariance; AXES],
}

impl KalmanState {
    /// Starts a track at the measured `(cx, cy, a, h)` with zero velocity.
    pub fn initiate(xyah: [f64; 4]) -> Self {
        let h = xyah[HEIGHT];
        let covariance = std::array::from_fn(|axis| {
            let (pos_std, vel_std) = if axis == ASPECT {
                (1e-2, 1e-5)
            } else {
                (
                    2.0 * STD_WEIGHT_POSITION * h,
                    10.0 * STD_WEIGHT_VELOCITY * h,
                )
            };
            AxisCovariance {
                pos: pos_std * pos_std,
                cross: 0.0,
                vel: vel_std * vel_std,
            }
        });
        Self {
            position: xyah,
            velocity: [0.0; AXES],
            covariance,
        }
    }

    /// Advances the state by one sampled frame.
    pub fn predict(&mut self) {
        let h = self.position[HEIGHT];
        for axis in 0..AXES {
            let (pos_std, vel_std) = if axis == ASPECT {
                (1e-2, 1e-5)
            } else {
                (STD_WEIGHT_POSITION * h, STD_WEIGHT_VELOCITY * h)
            };
            self.position[axis] += self.velocity[axis];

            let c = self.covariance[axis];
            self.covariance[axis] = AxisCovariance {
                pos: c.pos + 2.0 * c.cross + c.vel + pos_std * pos_std,
                cross: c.cross + c.vel,
                vel: c.vel + vel_std * vel_std,
            };
        }
    }

    /// Corrects the state with a measured `(cx, cy, a, h)`.
    pub fn update(&mut self, xyah: [f64; 4]) {
        let innovation_var = self.innovation_variance();
        for axis in 0..AXES {
            let c = self.covariance[axis];
            let s = innovation_var[axis];
            let residual = xyah[axis] - self.position[axis];
            let gain_pos = c.pos / s;
            let gain_vel = c.cross / s;

            self.position[axis] += gain_pos * residual;
            self.velocity[axis] += gain_vel * residual;
            self.covariance[axis] = AxisCovariance {
                pos: c.pos - gain_pos * c.pos,
                cross: c.cross - gain_pos * c.cross,
                vel: c.vel - gain_vel * c.cross,
            };
        }
    }

    /// Squared Mahalanobis distance between the projected state and a
    /// measured `(cx, cy, a, h)`.
    pub fn gating_distance(&self, xyah: [f64; 4]) -> f64 {
        let innovation_var = self.innovation_variance();
        (0..AXES)
            .map(|axis| {
                let d = xyah[axis] - self.position[axis];
                d * d / innovation_var[axis]
            })
            .sum()
    }

    /// Current `(cx, cy, a, h)` estimate.
    pub fn xyah(&self) -> [f64; 4] {
        self.position
    }

    /// Current estimate as `[x1, y1, x2, y2]`.
    pub fn ltrb(&self) -> [f64; 4] {
        let [cx, cy, a, h] = self.position;
        let w = a * h;
        [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
    }

    /// Diagonal of the projected (measurement-space) covariance.
    fn innovation_variance(&self) -> [f64; AXES] {
        let h = self.position[HEIGHT];
        std::array::from_fn(|axis| {
            let std = if axis == ASPECT {
                1e-1
            } else {
                STD_WEIGHT_POSITION * h
            };
            // Floor keeps a zero-height state from dividing by zero.
            (self.covariance[axis].pos + std * std).max(f64::EPSILON)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initiate_centers_on_measurement() {
        let state = KalmanState::initiate([50.0, 60.0, 0.5, 40.0]);
        assert_eq!(state.xyah(), [50.0, 60.0, 0.5, 40.0]);
        assert_eq!(state.ltrb(), [40.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_predict_without_velocity_keeps_position() {
        let mut state = KalmanState::initiate([50.0, 60.0, 0.5, 40.0]);
        state.predict();
        assert_eq!(state.xyah(), [50.0, 60.0, 0.5, 40.0]);
    }

    #[test]
    fn test_predict_grows_uncertainty() {
        let mut state = KalmanState::initiate([50.0, 60.0, 1.0, 40.0]);
        let before = state.gating_distance([55.0, 60.0, 1.0, 40.0]);
        state.predict();
        let after = state.gating_distance([55.0, 60.0, 1.0, 40.0]);
        assert!(after < before);
    }

    #[test]
    fn test_update_moves_toward_measurement() {
        let mut state = KalmanState::initiate([50.0, 50.0, 1.0, 40.0]);
        state.predict();
        state.update([60.0, 50.0, 1.0, 40.0]);
        let cx = state.xyah()[0];
        assert!(cx > 50.0 && cx < 60.0);
    }

    #[test]
    fn test_update_learns_velocity() {
        let mut state = KalmanState::initiate([0.0, 0.0, 1.0, 40.0]);
        for step in 1..=10 {
            state.predict();
            state.update([step as f64 * 5.0, 0.0, 1.0, 40.0]);
        }
        state.predict();
        // Constant motion of 5px per step is extrapolated.
        assert_relative_eq!(state.xyah()[0], 55.0, epsilon = 1.5);
    }

    #[test]
    fn test_gating_distance_zero_at_estimate() {
        let state = KalmanState::initiate([50.0, 60.0, 0.5, 40.0]);
        assert_relative_eq!(state.gating_distance([50.0, 60.0, 0.5, 40.0]), 0.0);
    }

    #[test]
    fn test_gating_rejects_far_measurement() {
        let mut state = KalmanState::initiate([50.0, 50.0, 1.0, 40.0]);
        state.predict();
        assert!(state.gating_distance([52.0, 51.0, 1.0, 40.0]) < CHI2_INV_95_4DOF);
        assert!(state.gating_distance([400.0, 50.0, 1.0, 40.0]) > CHI2_INV_95_4DOF);
    }

    #[test]
    fn test_covariance_stays_positive() {
        let mut state = KalmanState::initiate([50.0, 50.0, 1.0, 40.0]);
        for _ in 0..50 {
            state.predict();
            state.update([50.0, 50.0, 1.0, 40.0]);
        }
        for c in &state.covariance {
            assert!(c.pos > 0.0);
            assert!(c.vel > 0.0);
            assert!(c.pos * c.vel - c.cross * c.cross >= 0.0);
        }
    }
}
