use thiserror::Error;

use super::layout::{FieldValue, Span, LINE_LAYOUT, LINE_WIDTH};
use crate::types::Sample;

/// Decimals written for angle columns
pub const ANGLE_DECIMALS: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{field} does not fit in {width} chars: {text:?}")]
    FieldOverflow {
        field: &'static str,
        width: usize,
        text: String,
    },
}

/// Renders a `Sample` the way the firmware prints it.
///
/// Used by the simulated source and by tests; the result always decodes back
/// to the same integers and to floats within half a unit of the last decimal.
pub fn encode(sample: &Sample) -> Result<String, EncodeError> {
    let mut line = String::with_capacity(LINE_WIDTH);
    for span in LINE_LAYOUT {
        match *span {
            Span::Skip { width, label } => {
                line.push_str(&format!("{:<width$}", label, width = width));
            }
            Span::Field { id, width } => {
                let text = match id.value(sample) {
                    FieldValue::Integer(v) => v.to_string(),
                    FieldValue::Float(v) => format!("{:.*}", ANGLE_DECIMALS, v),
                };
                if text.len() > width {
                    return Err(EncodeError::FieldOverflow {
                        field: id.name(),
                        width,
                        text,
                    });
                }
                line.push_str(&format!("{:>width$}", text, width = width));
            }
        }
    }
    Ok(line)
}
