//! Two-state (angle, gyro bias) Kalman filter, one instance per axis.
//!
//! A filter instance is not synchronised internally. Only the thread that
//! owns it may call `update`; share results, not the filter.

use crate::config::{GyroConfig, KalmanTuning};
use crate::types::{AttitudeEstimate, FilterSample, Sample};

pub const DEFAULT_Q_ANGLE: f32 = 0.001;
pub const DEFAULT_Q_BIAS: f32 = 0.003;
pub const DEFAULT_R_MEASURE: f32 = 0.03;

#[derive(Debug, Clone, PartialEq)]
pub struct Kalman {
    /// Process noise variance for the accelerometer angle
    q_angle: f32,
    /// Process noise variance for the gyro bias
    q_bias: f32,
    /// Measurement noise variance
    r_measure: f32,

    angle: f32,
    bias: f32,
    /// Unbiased rate from the last `update`
    rate: f32,

    /// Error covariance
    p: [[f32; 2]; 2],
}

impl Default for Kalman {
    fn default() -> Self {
        Self::new()
    }
}

impl Kalman {
    pub fn new() -> Self {
        Self::with_tuning(DEFAULT_Q_ANGLE, DEFAULT_Q_BIAS, DEFAULT_R_MEASURE)
    }

    /// Starts from angle 0, bias 0 and a zero covariance; anchor the angle
    /// with `set_angle` once the first measurement is known.
    pub fn with_tuning(q_angle: f32, q_bias: f32, r_measure: f32) -> Self {
        Self {
            q_angle,
            q_bias,
            r_measure,
            angle: 0.0,
            bias: 0.0,
            rate: 0.0,
            p: [[0.0, 0.0], [0.0, 0.0]],
        }
    }

    pub fn from_config(tuning: &KalmanTuning) -> Self {
        Self::with_tuning(tuning.q_angle, tuning.q_bias, tuning.r_measure)
    }

    /// Fuses one angle measurement (degrees) with one gyro rate (deg/s)
    /// over `dt` seconds and returns the new angle estimate.
    ///
    /// `S = P00 + R_measure` is used as a divisor unchecked. With a positive
    /// `R_measure` it cannot be zero; `R_measure = 0` together with
    /// `Q_angle = 0` yields NaN on the first call.
    pub fn update(&mut self, new_angle: f32, new_rate: f32, dt: f32) -> f32 {
        // predict
        self.rate = new_rate - self.bias;
        self.angle += dt * self.rate;

        let p = &mut self.p;
        p[0][0] += dt * (dt * p[1][1] - p[0][1] - p[1][0] + self.q_angle);
        p[0][1] -= dt * p[1][1];
        p[1][0] -= dt * p[1][1];
        p[1][1] += self.q_bias * dt;

        // correct
        let s = p[0][0] + self.r_measure;
        let k = [p[0][0] / s, p[1][0] / s];

        let y = new_angle - self.angle;
        self.angle += k[0] * y;
        self.bias += k[1] * y;

        let p00 = p[0][0];
        let p01 = p[0][1];
        p[0][0] -= k[0] * p00;
        p[0][1] -= k[0] * p01;
        p[1][0] -= k[1] * p00;
        p[1][1] -= k[1] * p01;

        self.angle
    }

    /// Re-anchors the angle; bias and covariance are kept.
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn q_angle(&self) -> f32 {
        self.q_angle
    }

    pub fn set_q_angle(&mut self, q_angle: f32) {
        self.q_angle = q_angle;
    }

    pub fn q_bias(&self) -> f32 {
        self.q_bias
    }

    pub fn set_q_bias(&mut self, q_bias: f32) {
        self.q_bias = q_bias;
    }

    pub fn r_measure(&self) -> f32 {
        self.r_measure
    }

    pub fn set_r_measure(&mut self, r_measure: f32) {
        self.r_measure = r_measure;
    }

    pub fn apply_tuning(&mut self, tuning: &KalmanTuning) {
        self.q_angle = tuning.q_angle;
        self.q_bias = tuning.q_bias;
        self.r_measure = tuning.r_measure;
    }
}

/// Roll and pitch filters driven from decoded samples.
///
/// Rates follow the firmware's complementary filter: pitch integrates gyro x,
/// roll integrates the negated gyro y, both in counts / `sensitivity`.
#[derive(Debug, Clone)]
pub struct AttitudeKalman {
    roll: Kalman,
    pitch: Kalman,
    gyro: GyroConfig,
    last_time: Option<i64>,
}

impl AttitudeKalman {
    pub fn new(roll: &KalmanTuning, pitch: &KalmanTuning, gyro: GyroConfig) -> Self {
        Self {
            roll: Kalman::from_config(roll),
            pitch: Kalman::from_config(pitch),
            gyro,
            last_time: None,
        }
    }

    /// Feeds one sample. The first sample, and any sample whose time does not
    /// advance, only re-anchors both filters on the raw angles.
    pub fn update(&mut self, sample: &Sample) -> AttitudeEstimate {
        let dt = self
            .last_time
            .map(|prev| (sample.time - prev) as f64 * self.gyro.time_scale_seconds);
        self.last_time = Some(sample.time);

        let roll_measured = sample.raw.roll as f32;
        let pitch_measured = sample.raw.pitch as f32;

        match dt {
            Some(dt) if dt > 0.0 => {
                let sensitivity = self.gyro.sensitivity as f32;
                let roll_rate = -(sample.gyro.y as f32) / sensitivity;
                let pitch_rate = sample.gyro.x as f32 / sensitivity;
                self.roll.update(roll_measured, roll_rate, dt as f32);
                self.pitch.update(pitch_measured, pitch_rate, dt as f32);
            }
            _ => {
                self.roll.set_angle(roll_measured);
                self.pitch.set_angle(pitch_measured);
            }
        }

        AttitudeEstimate {
            time: sample.time,
            estimate: FilterSample::new(self.roll.angle().into(), self.pitch.angle().into()),
        }
    }

    pub fn roll(&self) -> &Kalman {
        &self.roll
    }

    pub fn pitch(&self) -> &Kalman {
        &self.pitch
    }

    pub fn retune(&mut self, roll: &KalmanTuning, pitch: &KalmanTuning) {
        self.roll.apply_tuning(roll);
        self.pitch.apply_tuning(pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorSample;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DT: f32 = 0.01;

    #[test]
    fn defaults_match_reference_tuning() {
        let k = Kalman::new();
        assert_eq!(k.q_angle(), 0.001);
        assert_eq!(k.q_bias(), 0.003);
        assert_eq!(k.r_measure(), 0.03);
        assert_eq!(k.angle(), 0.0);
        assert_eq!(k.bias(), 0.0);
    }

    #[test]
    fn first_step_matches_hand_computation() {
        let mut k = Kalman::new();
        let angle = k.update(10.0, 0.0, DT);

        // P00 = dt * Q_angle, K0 = P00 / (P00 + R)
        let p00 = DT * 0.001;
        let k0 = p00 / (p00 + 0.03);
        assert!((angle - k0 * 10.0).abs() < 1e-6);
        // P10 is still zero, so the bias does not move on the first step
        assert_eq!(k.bias(), 0.0);
    }

    #[test]
    fn converges_towards_constant_measurement() {
        for (start, target) in [(0.0f32, 30.0f32), (-45.0, 10.0), (50.0, -20.0), (10.0, 10.5)] {
            let mut k = Kalman::new();
            k.set_angle(start);

            let mut previous_error = (target - start).abs();
            let mut crossed = false;
            for _ in 0..3000 {
                let angle = k.update(target, 0.0, DT);
                let error = (target - angle).abs();
                if !crossed && (angle - target) * (start - target) <= 0.0 {
                    crossed = true;
                }
                if !crossed {
                    assert!(error <= previous_error, "error grew before reaching {}", target);
                }
                previous_error = error;
            }
            assert!(crossed);
            assert!((k.angle() - target).abs() < 1e-3, "{} did not settle on {}", k.angle(), target);
        }
    }

    #[test]
    fn estimates_constant_gyro_bias() {
        for bias in [2.0f32, -3.5] {
            let mut k = Kalman::new();
            for _ in 0..5000 {
                k.update(0.0, bias, DT);
            }
            assert!((k.bias() - bias).abs() < 1e-3);
            assert!(k.rate().abs() < 1e-3);
        }
    }

    #[test]
    fn estimates_bias_from_noisy_moving_measurements() {
        let injected = 1.5f32;
        let mut rng = StdRng::seed_from_u64(7);
        let mut k = Kalman::new();

        for i in 0..10_000 {
            let t = i as f32 * DT;
            let true_angle = 20.0 * (0.5 * t).sin();
            let true_rate = 10.0 * (0.5 * t).cos();
            let measured = true_angle + rng.random_range(-0.5f32..0.5);
            k.update(measured, true_rate + injected, DT);
        }

        assert!((k.bias() - injected).abs() < 0.25, "bias {}", k.bias());
    }

    #[test]
    fn set_angle_keeps_bias() {
        let mut k = Kalman::new();
        for _ in 0..500 {
            k.update(0.0, 1.0, DT);
        }
        let bias = k.bias();
        k.set_angle(42.0);
        assert_eq!(k.angle(), 42.0);
        assert_eq!(k.bias(), bias);
    }

    #[test]
    fn zero_noise_terms_divide_by_zero() {
        // 不做保护：R_measure 和 Q_angle 都为 0 时第一步 S == 0
        let mut k = Kalman::with_tuning(0.0, 0.003, 0.0);
        assert!(k.update(1.0, 0.0, DT).is_nan());
    }

    fn sample_at(time: i64, roll: f64, pitch: f64, gyro: SensorSample) -> Sample {
        Sample {
            time,
            gyro,
            raw: FilterSample::new(roll, pitch),
            ..Default::default()
        }
    }

    #[test]
    fn attitude_anchors_on_first_sample() {
        let tuning = KalmanTuning::default();
        let mut attitude = AttitudeKalman::new(&tuning, &tuning, GyroConfig::default());

        let estimate = attitude.update(&sample_at(1000, 12.0, -4.0, SensorSample::default()));
        assert_eq!(estimate.time, 1000);
        assert_eq!(estimate.estimate, FilterSample::new(12.0, -4.0));
    }

    #[test]
    fn attitude_maps_gyro_axes_to_rates() {
        let tuning = KalmanTuning::default();
        let gyro = GyroConfig::default();
        let mut attitude = AttitudeKalman::new(&tuning, &tuning, gyro.clone());
        attitude.update(&sample_at(0, 0.0, 0.0, SensorSample::default()));

        // gyro.x drives pitch, -gyro.y drives roll
        let counts = SensorSample::new(220, 330, 0);
        attitude.update(&sample_at(10, 0.0, 0.0, counts));

        let expected_pitch = 220.0 / gyro.sensitivity as f32;
        let expected_roll = -330.0 / gyro.sensitivity as f32;
        assert!((attitude.pitch().rate() - expected_pitch).abs() < 1e-5);
        assert!((attitude.roll().rate() - expected_roll).abs() < 1e-5);
    }

    #[test]
    fn attitude_reanchors_when_time_stalls() {
        let tuning = KalmanTuning::default();
        let mut attitude = AttitudeKalman::new(&tuning, &tuning, GyroConfig::default());
        attitude.update(&sample_at(500, 1.0, 1.0, SensorSample::default()));

        let estimate = attitude.update(&sample_at(500, 5.0, -5.0, SensorSample::default()));
        assert_eq!(estimate.estimate, FilterSample::new(5.0, -5.0));
    }
}
