//! Constant-velocity Kalman filter for the tracked point.
//!
//! State x = [px, py, vx, vy]^T, measurement z = [px, py]^T.
//!
//! Transition matrix F = [[1,0,1,0],[0,1,0,1],[0,0,1,0],[0,0,0,1]]
//! Observation matrix H = [[1,0,0,0],[0,1,0,0]]
//! Q = 0.05·I₄, R = 0.1·I₂, initial covariance 0.
//!
//! Each update corrects with the measurement, then predicts one step
//! ahead; the predicted state becomes the next prior.

use nalgebra::{Matrix2x4, Matrix4, Vector2, Vector4};
use tracing::warn;

const PROCESS_NOISE: f64 = 0.05;
const MEASUREMENT_NOISE: f64 = 0.1;

/// Output of one estimator step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// One-step-ahead predicted position
    pub x: f64,
    pub y: f64,
    /// Post-correction velocity (pixels per frame)
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone)]
struct KalmanState {
    /// Prior state (after the last predict)
    state: Vector4<f64>,
    /// Prior covariance
    covariance: Matrix4<f64>,
    initialized: bool,
}

impl Default for KalmanState {
    fn default() -> Self {
        Self {
            state: Vector4::zeros(),
            covariance: Matrix4::zeros(),
            initialized: false,
        }
    }
}

/// Motion estimator, optionally bypassed
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    enabled: bool,
    transition: Matrix4<f64>,
    observation: Matrix2x4<f64>,
    process_noise: Matrix4<f64>,
    measurement_noise: nalgebra::Matrix2<f64>,
    filter: KalmanState,
}

impl MotionEstimator {
    pub fn new(enabled: bool) -> Self {
        #[rustfmt::skip]
        let transition = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let observation = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            enabled,
            transition,
            observation,
            process_noise: Matrix4::identity() * PROCESS_NOISE,
            measurement_noise: nalgebra::Matrix2::identity() * MEASUREMENT_NOISE,
            filter: KalmanState::default(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.filter.initialized
    }

    /// Feed one measurement
    ///
    /// Disabled: the measurement passes through with zero velocity.
    pub fn update(&mut self, x: f64, y: f64) -> Estimate {
        if !self.enabled {
            return Estimate {
                x,
                y,
                vx: 0.0,
                vy: 0.0,
            };
        }

        if !self.filter.initialized {
            self.filter.state = Vector4::new(x, y, 0.0, 0.0);
            self.filter.initialized = true;
        }

        // ===== Correct =====
        let h = &self.observation;
        let prior = self.filter.state;
        let p = self.filter.covariance;
        let innovation_cov = h * p * h.transpose() + self.measurement_noise;

        let (posterior, posterior_cov) = match innovation_cov.try_inverse() {
            Some(s_inv) => {
                let gain = p * h.transpose() * s_inv;
                let residual = Vector2::new(x, y) - h * prior;
                (
                    prior + gain * residual,
                    (Matrix4::identity() - gain * h) * p,
                )
            }
            None => {
                warn!("singular innovation covariance, skipping correction");
                (prior, p)
            }
        };

        // ===== Predict =====
        let f = &self.transition;
        self.filter.state = f * posterior;
        self.filter.covariance = f * posterior_cov * f.transpose() + self.process_noise;

        Estimate {
            x: self.filter.state[0],
            y: self.filter.state[1],
            vx: posterior[2],
            vy: posterior[3],
        }
    }

    /// Forget the track: the next measurement re-initializes the state
    pub fn reset(&mut self) {
        self.filter = KalmanState::default();
    }
}
