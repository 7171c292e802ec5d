//! Column layout of one telemetry line.
//!
//! The firmware prints every value into a fixed character slot, so a line is
//! described by a flat list of spans. Fillers are never inspected by the
//! decoder; their labels are only what the encoder writes into them.

use crate::types::Sample;

/// Every value carried by a telemetry line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Time,
    AccX,
    AccY,
    AccZ,
    GyroX,
    GyroY,
    GyroZ,
    RawRoll,
    RawPitch,
    KalmanRoll,
    KalmanPitch,
    CompRoll,
    CompPitch,
    GyroFilterRoll,
    GyroFilterPitch,
}

/// Mutable view of the `Sample` member a field decodes into.
/// The member type decides how the column text is parsed.
pub enum Slot<'a> {
    Long(&'a mut i64),
    Int(&'a mut i32),
    Float(&'a mut f64),
}

/// Value of a field read back from a `Sample`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl FieldId {
    pub fn name(self) -> &'static str {
        match self {
            FieldId::Time => "time",
            FieldId::AccX => "acc.x",
            FieldId::AccY => "acc.y",
            FieldId::AccZ => "acc.z",
            FieldId::GyroX => "gyro.x",
            FieldId::GyroY => "gyro.y",
            FieldId::GyroZ => "gyro.z",
            FieldId::RawRoll => "raw.roll",
            FieldId::RawPitch => "raw.pitch",
            FieldId::KalmanRoll => "kalman.roll",
            FieldId::KalmanPitch => "kalman.pitch",
            FieldId::CompRoll => "comp.roll",
            FieldId::CompPitch => "comp.pitch",
            FieldId::GyroFilterRoll => "gyroFilter.roll",
            FieldId::GyroFilterPitch => "gyroFilter.pitch",
        }
    }

    pub fn slot_mut(self, sample: &mut Sample) -> Slot<'_> {
        match self {
            FieldId::Time => Slot::Long(&mut sample.time),
            FieldId::AccX => Slot::Int(&mut sample.acc.x),
            FieldId::AccY => Slot::Int(&mut sample.acc.y),
            FieldId::AccZ => Slot::Int(&mut sample.acc.z),
            FieldId::GyroX => Slot::Int(&mut sample.gyro.x),
            FieldId::GyroY => Slot::Int(&mut sample.gyro.y),
            FieldId::GyroZ => Slot::Int(&mut sample.gyro.z),
            FieldId::RawRoll => Slot::Float(&mut sample.raw.roll),
            FieldId::RawPitch => Slot::Float(&mut sample.raw.pitch),
            FieldId::KalmanRoll => Slot::Float(&mut sample.kalman.roll),
            FieldId::KalmanPitch => Slot::Float(&mut sample.kalman.pitch),
            FieldId::CompRoll => Slot::Float(&mut sample.comp.roll),
            FieldId::CompPitch => Slot::Float(&mut sample.comp.pitch),
            FieldId::GyroFilterRoll => Slot::Float(&mut sample.gyro_filter.roll),
            FieldId::GyroFilterPitch => Slot::Float(&mut sample.gyro_filter.pitch),
        }
    }

    pub fn value(self, sample: &Sample) -> FieldValue {
        match self {
            FieldId::Time => FieldValue::Integer(sample.time),
            FieldId::AccX => FieldValue::Integer(sample.acc.x.into()),
            FieldId::AccY => FieldValue::Integer(sample.acc.y.into()),
            FieldId::AccZ => FieldValue::Integer(sample.acc.z.into()),
            FieldId::GyroX => FieldValue::Integer(sample.gyro.x.into()),
            FieldId::GyroY => FieldValue::Integer(sample.gyro.y.into()),
            FieldId::GyroZ => FieldValue::Integer(sample.gyro.z.into()),
            FieldId::RawRoll => FieldValue::Float(sample.raw.roll),
            FieldId::RawPitch => FieldValue::Float(sample.raw.pitch),
            FieldId::KalmanRoll => FieldValue::Float(sample.kalman.roll),
            FieldId::KalmanPitch => FieldValue::Float(sample.kalman.pitch),
            FieldId::CompRoll => FieldValue::Float(sample.comp.roll),
            FieldId::CompPitch => FieldValue::Float(sample.comp.pitch),
            FieldId::GyroFilterRoll => FieldValue::Float(sample.gyro_filter.roll),
            FieldId::GyroFilterPitch => FieldValue::Float(sample.gyro_filter.pitch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Skip { width: usize, label: &'static str },
    Field { id: FieldId, width: usize },
}

impl Span {
    pub const fn width(&self) -> usize {
        match self {
            Span::Skip { width, .. } | Span::Field { width, .. } => *width,
        }
    }
}

const TIME_WIDTH: usize = 10;
const SENSOR_WIDTH: usize = 6;
const ANGLE_WIDTH: usize = 8;

const fn skip(width: usize, label: &'static str) -> Span {
    Span::Skip { width, label }
}

const fn field(id: FieldId, width: usize) -> Span {
    Span::Field { id, width }
}

/// Line layout as printed by the firmware.
///
/// Group separators are one filler plus a three character group filler; the
/// values inside a group are separated by a single filler.
pub const LINE_LAYOUT: &[Span] = &[
    skip(3, "T: "),
    field(FieldId::Time, TIME_WIDTH),
    skip(4, " A: "),
    field(FieldId::AccX, SENSOR_WIDTH),
    skip(1, " "),
    field(FieldId::AccY, SENSOR_WIDTH),
    skip(1, " "),
    field(FieldId::AccZ, SENSOR_WIDTH),
    skip(4, " G: "),
    field(FieldId::GyroX, SENSOR_WIDTH),
    skip(1, " "),
    field(FieldId::GyroY, SENSOR_WIDTH),
    skip(1, " "),
    field(FieldId::GyroZ, SENSOR_WIDTH),
    skip(4, " R: "),
    field(FieldId::RawRoll, ANGLE_WIDTH),
    skip(1, " "),
    field(FieldId::RawPitch, ANGLE_WIDTH),
    skip(4, " K: "),
    field(FieldId::KalmanRoll, ANGLE_WIDTH),
    skip(1, " "),
    field(FieldId::KalmanPitch, ANGLE_WIDTH),
    skip(4, " C: "),
    field(FieldId::CompRoll, ANGLE_WIDTH),
    skip(1, " "),
    field(FieldId::CompPitch, ANGLE_WIDTH),
    skip(4, " F: "),
    field(FieldId::GyroFilterRoll, ANGLE_WIDTH),
    skip(1, " "),
    field(FieldId::GyroFilterPitch, ANGLE_WIDTH),
];

pub const fn layout_width(layout: &[Span]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += layout[i].width();
        i += 1;
    }
    total
}

/// Shortest line the decoder accepts.
pub const LINE_WIDTH: usize = layout_width(LINE_LAYOUT);

/// A field span resolved to its absolute byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub id: FieldId,
    pub offset: usize,
    pub width: usize,
}

impl Column {
    pub fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Walks a layout and yields the field columns with their offsets.
pub fn columns(layout: &[Span]) -> impl Iterator<Item = Column> + '_ {
    layout
        .iter()
        .scan(0usize, |offset, span| {
            let start = *offset;
            *offset += span.width();
            Some((start, span))
        })
        .filter_map(|(offset, span)| match *span {
            Span::Field { id, width } => Some(Column { id, offset, width }),
            Span::Skip { .. } => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(id: FieldId) -> usize {
        columns(LINE_LAYOUT)
            .find(|c| c.id == id)
            .map(|c| c.offset)
            .unwrap()
    }

    #[test]
    fn line_width_is_145() {
        assert_eq!(LINE_WIDTH, 145);
    }

    #[test]
    fn offsets_match_firmware_output() {
        assert_eq!(offset_of(FieldId::Time), 3);
        assert_eq!(offset_of(FieldId::AccX), 17);
        assert_eq!(offset_of(FieldId::AccY), 24);
        assert_eq!(offset_of(FieldId::AccZ), 31);
        assert_eq!(offset_of(FieldId::GyroX), 41);
        assert_eq!(offset_of(FieldId::GyroZ), 55);
        assert_eq!(offset_of(FieldId::RawRoll), 65);
        assert_eq!(offset_of(FieldId::RawPitch), 74);
        assert_eq!(offset_of(FieldId::KalmanRoll), 86);
        assert_eq!(offset_of(FieldId::CompRoll), 107);
        assert_eq!(offset_of(FieldId::GyroFilterRoll), 128);
        assert_eq!(offset_of(FieldId::GyroFilterPitch), 137);
    }

    #[test]
    fn every_field_appears_once() {
        let ids: Vec<FieldId> = columns(LINE_LAYOUT).map(|c| c.id).collect();
        assert_eq!(ids.len(), 15);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn skip_labels_fit_their_width() {
        for span in LINE_LAYOUT {
            if let Span::Skip { width, label } = span {
                assert!(label.len() <= *width, "label {:?} wider than {}", label, width);
            }
        }
    }
}
