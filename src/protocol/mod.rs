//! Fixed-width telemetry line protocol.

pub mod layout;
pub mod decoder;
pub mod encoder;

pub use layout::{FieldId, Span, LINE_LAYOUT, LINE_WIDTH};
pub use decoder::{decode, DecodeError, Malformed};
pub use encoder::{encode, EncodeError};
