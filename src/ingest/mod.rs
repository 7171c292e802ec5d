//! Line sources and the single-producer ingest loop.

pub mod source;
pub mod pipeline;

pub use source::{
    available_ports, open_serial, LineSource, ReaderLineSource, SerialLineSource,
    SimulatedLineSource, SourceError,
};
pub use pipeline::{spawn_ingest, IngestPipeline};
