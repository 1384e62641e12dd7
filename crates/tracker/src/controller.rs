//! AimController - error → bounded correction
//!
//! 预测位置 = 平滑位置 + 速度 × 预测系数；
//! 误差 = 预测位置 − 画面中心；
//! 增益 = min(基础增益 + 距离 × 距离系数, 增益上限)；
//! 输出 = 累积器提取的整数位移。

use contracts::{ControlConfig, Correction, GainProfile, TrackedPoint};

use crate::accumulator::Accumulator;
use crate::kalman::MotionEstimator;

/// Controller constants, fixed for the lifetime of a loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    pub base_gain: f64,
    pub gain_cap: f64,
    pub distance_gain: f64,
    pub prediction_factor: f64,
    pub filter_enabled: bool,
}

impl ControlParams {
    pub fn from_config(control: &ControlConfig, profile: &GainProfile) -> Self {
        Self {
            base_gain: profile.base_gain,
            gain_cap: profile.gain_cap,
            distance_gain: control.distance_gain,
            prediction_factor: control.prediction_factor,
            filter_enabled: profile.filter_enabled,
        }
    }

    /// Distance-adaptive gain, never above `gain_cap`
    #[inline]
    pub fn gain_for(&self, distance: f64) -> f64 {
        (self.base_gain + distance * self.distance_gain).min(self.gain_cap)
    }
}

/// Owns the estimator and accumulator for one control loop
#[derive(Debug, Clone)]
pub struct AimController {
    params: ControlParams,
    estimator: MotionEstimator,
    accumulator: Accumulator,
}

impl AimController {
    pub fn new(params: ControlParams) -> Self {
        Self {
            params,
            estimator: MotionEstimator::new(params.filter_enabled),
            accumulator: Accumulator::new(),
        }
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn estimator(&self) -> &MotionEstimator {
        &self.estimator
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// One control step
    ///
    /// No point: estimator and accumulator are reset and a zero,
    /// target-less correction is returned. A non-finite point counts as no
    /// point and never reaches the estimator.
    pub fn compute(&mut self, point: Option<TrackedPoint>, width: u32, height: u32) -> Correction {
        let Some(point) = point.filter(TrackedPoint::is_finite) else {
            self.reset();
            return Correction::NONE;
        };

        let est = self.estimator.update(point.x, point.y);
        let predicted_x = est.x + est.vx * self.params.prediction_factor;
        let predicted_y = est.y + est.vy * self.params.prediction_factor;

        let err_x = predicted_x - width as f64 * 0.5;
        let err_y = predicted_y - height as f64 * 0.5;
        let gain = self.params.gain_for(err_x.hypot(err_y));

        let (dx, dy) = self.accumulator.push(err_x * gain, err_y * gain);
        Correction::target(dx, dy)
    }

    pub fn reset(&mut self) {
        self.estimator.reset();
        self.accumulator.reset();
    }
}
