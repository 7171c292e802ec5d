use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw accelerometer or gyroscope counts for the three axes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SensorSample {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{x: {}, y: {}, z: {}}}", self.x, self.y, self.z)
    }
}

/// Roll/pitch pair in degrees produced by one attitude estimator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterSample {
    pub roll: f64,
    pub pitch: f64,
}

impl FilterSample {
    pub fn new(roll: f64, pitch: f64) -> Self {
        Self { roll, pitch }
    }
}

impl fmt::Display for FilterSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{roll: {}, pitch: {}}}", self.roll, self.pitch)
    }
}

/// One telemetry frame as sent by the IMU firmware.
///
/// Built in one piece by the line decoder and never mutated afterwards, so a
/// `Sample` handed to the ring is always complete.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    /// Device timestamp in milliseconds.
    pub time: i64,
    pub acc: SensorSample,
    pub gyro: SensorSample,
    pub raw: FilterSample,
    pub kalman: FilterSample,
    pub comp: FilterSample,
    pub gyro_filter: FilterSample,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{time: {}, acc: {}, gyro: {}, raw: {}, kalman: {}, comp: {}, gyro: {}}}",
            self.time, self.acc, self.gyro, self.raw, self.kalman, self.comp, self.gyro_filter
        )
    }
}

/// Locally computed Kalman roll/pitch for the sample with the same `time`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct AttitudeEstimate {
    pub time: i64,
    pub estimate: FilterSample,
}
