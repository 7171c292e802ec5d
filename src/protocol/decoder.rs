use std::str::FromStr;

use thiserror::Error;

use super::layout::{columns, Column, Slot, LINE_LAYOUT, LINE_WIDTH};
use crate::types::Sample;

/// Why a non-empty line was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Malformed {
    #[error("line is {len} bytes, need at least {required}")]
    TooShort { len: usize, required: usize },
    #[error("field {field} at offset {offset} is not a number: {text:?}")]
    BadField {
        field: &'static str,
        offset: usize,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Nothing arrived this tick; callers skip it without logging a warning
    #[error("empty line")]
    Empty,
    #[error("malformed line: {0}")]
    Malformed(#[from] Malformed),
}

/// Decodes one telemetry line into a `Sample`.
///
/// A trailing `\r`/`\n` is ignored, as is anything after the last column.
/// Either every field parses or no sample is produced.
pub fn decode(line: &str) -> Result<Sample, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = line.as_bytes();
    if bytes.len() < LINE_WIDTH {
        return Err(Malformed::TooShort {
            len: bytes.len(),
            required: LINE_WIDTH,
        }
        .into());
    }

    let mut sample = Sample::default();
    for column in columns(LINE_LAYOUT) {
        let text = column_text(bytes, &column)?;
        match column.id.slot_mut(&mut sample) {
            Slot::Long(target) => *target = parse(&column, text)?,
            Slot::Int(target) => *target = parse(&column, text)?,
            Slot::Float(target) => *target = parse(&column, text)?,
        }
    }
    Ok(sample)
}

fn column_text<'a>(bytes: &'a [u8], column: &Column) -> Result<&'a str, Malformed> {
    let raw = &bytes[column.offset..column.end()];
    std::str::from_utf8(raw)
        .map(str::trim)
        .map_err(|_| Malformed::BadField {
            field: column.id.name(),
            offset: column.offset,
            text: String::from_utf8_lossy(raw).into_owned(),
        })
}

fn parse<T: FromStr>(column: &Column, text: &str) -> Result<T, Malformed> {
    text.parse::<T>().map_err(|_| Malformed::BadField {
        field: column.id.name(),
        offset: column.offset,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;
    use crate::types::{FilterSample, SensorSample};

    fn reference_sample() -> Sample {
        Sample {
            time: 1234567890,
            acc: SensorSample::new(100, -200, 300),
            gyro: SensorSample::new(10, -20, 30),
            raw: FilterSample::new(1.5, -2.5),
            kalman: FilterSample::new(1.4, -2.4),
            comp: FilterSample::new(1.45, -2.45),
            gyro_filter: FilterSample::new(1.3, -2.3),
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    #[test]
    fn decodes_hand_written_line() {
        // 字段之间的填充字符不参与解析
        let line = concat!(
            "T: 1234567890 A:    100   -200    300 G:     10    -20     30",
            " R:    1.500   -2.500 K:    1.400   -2.400",
            " C:    1.450   -2.450 F:    1.300   -2.300",
        );
        assert_eq!(line.len(), LINE_WIDTH);

        let sample = decode(line).unwrap();
        assert_eq!(sample.time, 1234567890);
        assert_eq!(sample.acc, SensorSample::new(100, -200, 300));
        assert_eq!(sample.gyro, SensorSample::new(10, -20, 30));
        assert_close(sample.raw.pitch, -2.5);
        assert_close(sample.comp.roll, 1.45);
        assert_close(sample.gyro_filter.pitch, -2.3);
    }

    #[test]
    fn recovers_encoded_sample() {
        let expected = reference_sample();
        let line = encode(&expected).unwrap();
        let sample = decode(&line).unwrap();

        assert_eq!(sample.time, expected.time);
        assert_eq!(sample.acc, expected.acc);
        assert_eq!(sample.gyro, expected.gyro);
        for (got, want) in [
            (sample.raw, expected.raw),
            (sample.kalman, expected.kalman),
            (sample.comp, expected.comp),
            (sample.gyro_filter, expected.gyro_filter),
        ] {
            assert_close(got.roll, want.roll);
            assert_close(got.pitch, want.pitch);
        }
    }

    #[test]
    fn ignores_line_ending_and_trailing_bytes() {
        let line = encode(&reference_sample()).unwrap();
        assert!(decode(&format!("{}\r\n", line)).is_ok());
        assert!(decode(&format!("{} extra", line)).is_ok());
    }

    #[test]
    fn every_truncation_is_rejected() {
        let line = encode(&reference_sample()).unwrap();
        for len in 1..LINE_WIDTH {
            match decode(&line[..len]) {
                Err(DecodeError::Malformed(Malformed::TooShort { len: got, required })) => {
                    assert_eq!(got, len);
                    assert_eq!(required, LINE_WIDTH);
                }
                Err(DecodeError::Empty) => assert!(line[..len].trim().is_empty()),
                other => panic!("truncated to {} gave {:?}", len, other),
            }
        }
    }

    #[test]
    fn empty_line_means_no_data() {
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert_eq!(decode("\r\n"), Err(DecodeError::Empty));
        assert_eq!(decode("     "), Err(DecodeError::Empty));
    }

    #[test]
    fn bad_number_names_the_field() {
        let mut line = encode(&reference_sample()).unwrap();
        line.replace_range(24..30, "  1x2 ");

        match decode(&line) {
            Err(DecodeError::Malformed(Malformed::BadField { field, offset, text })) => {
                assert_eq!(field, "acc.y");
                assert_eq!(offset, 24);
                assert_eq!(text, "1x2");
            }
            other => panic!("expected bad field, got {:?}", other),
        }
    }

    #[test]
    fn blank_field_is_malformed() {
        let mut line = encode(&reference_sample()).unwrap();
        line.replace_range(86..94, "        ");
        assert!(matches!(
            decode(&line),
            Err(DecodeError::Malformed(Malformed::BadField { field: "kalman.roll", .. }))
        ));
    }

    #[test]
    fn time_column_holds_64_bit_values() {
        let mut line = encode(&reference_sample()).unwrap();
        line.replace_range(3..13, "9999999999");
        assert_eq!(decode(&line).unwrap().time, 9_999_999_999);
    }

    #[test]
    fn multibyte_text_in_a_field_is_malformed() {
        let mut line = encode(&reference_sample()).unwrap();
        // 'é' is two bytes; keep the total width by dropping one space
        line.replace_range(17..23, "  1é ");
        assert_eq!(line.len(), LINE_WIDTH);
        assert!(matches!(decode(&line), Err(DecodeError::Malformed(_))));
    }
}
