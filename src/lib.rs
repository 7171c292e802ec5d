//! Decode-and-filter pipeline for fixed-width IMU telemetry.
//!
//! Lines from a [`ingest::LineSource`] are decoded by [`protocol::decode`],
//! run through a local [`kalman::AttitudeKalman`] and kept in a bounded
//! [`ring::SampleRing`] that any thread may snapshot.

pub mod config;
pub mod ingest;
pub mod kalman;
pub mod logger;
pub mod protocol;
pub mod ring;
pub mod types;
pub mod utils;

pub use config::{AppConfig, ConfigError, ConfigManager, KalmanTuning};
pub use ingest::{IngestPipeline, LineSource, SourceError};
pub use kalman::{AttitudeKalman, Kalman};
pub use protocol::{decode, encode, DecodeError};
pub use ring::SampleRing;
pub use types::{AttitudeEstimate, FilterSample, Sample, SensorSample};
