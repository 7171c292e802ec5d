pub mod sample;
pub mod stats;
pub mod events;

pub use sample::{AttitudeEstimate, FilterSample, Sample, SensorSample};
pub use stats::{IngestStats, SharedStats};
pub use events::IngestEvent;
