use std::str::FromStr;

use thiserror::Error;

use crate::types::BUTTON_COUNT;

/// Number of comma separated fields in a telemetry line.
pub const FIELD_COUNT: usize = 8;

const AXIS_FIELDS: usize = FIELD_COUNT - BUTTON_COUNT;

/// Reason a telemetry line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The line does not have exactly [`FIELD_COUNT`] fields.
    #[error("invalid format: expected {FIELD_COUNT} fields, got {fields}")]
    MalformedLine { fields: usize },
    /// A field could not be converted to float (axes) or integer (buttons).
    #[error("field {index} is not convertible: {value:?}")]
    InvalidField { index: usize, value: Box<str> },
}

/// One decoded line of telemetry: two sticks and four buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryFrame {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub buttons: [i32; BUTTON_COUNT],
}

impl TelemetryFrame {
    /// Returns the frame with the first and the second stick exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            x1: self.x2,
            y1: self.y2,
            x2: self.x1,
            y2: self.y1,
            buttons: self.buttons,
        }
    }
}

impl FromStr for TelemetryFrame {
    type Err = RejectReason;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = [""; FIELD_COUNT];
        let mut count = 0;
        for field in line.split(',') {
            if let Some(slot) = fields.get_mut(count) {
                *slot = field;
            }
            count += 1;
        }
        if count != FIELD_COUNT {
            return Err(RejectReason::MalformedLine { fields: count });
        }

        let mut axes = [0.0; AXIS_FIELDS];
        for (index, axis) in axes.iter_mut().enumerate() {
            *axis = parse_axis(index, fields[index])?;
        }
        let mut buttons = [0; BUTTON_COUNT];
        for (offset, button) in buttons.iter_mut().enumerate() {
            let index = AXIS_FIELDS + offset;
            *button = parse_button(index, fields[index])?;
        }

        let [x1, y1, x2, y2] = axes;
        Ok(Self {
            x1,
            y1,
            x2,
            y2,
            buttons,
        })
    }
}

/// Parse one telemetry line, e.g. `512,512,0,1023,0,1,0,1`.
///
/// The line must already be decoded with [`decode_line`].
pub fn parse_line(line: &str) -> Result<TelemetryFrame, RejectReason> {
    line.parse()
}

/// Decode raw bytes read from the serial port into a trimmed ASCII line.
/// Non-ASCII bytes are dropped.
pub fn decode_line(raw: &[u8]) -> String {
    let text: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();
    text.trim().to_owned()
}

fn parse_axis(index: usize, field: &str) -> Result<f64, RejectReason> {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(index, field)),
    }
}

fn parse_button(index: usize, field: &str) -> Result<i32, RejectReason> {
    field.trim().parse::<i32>().map_err(|_| invalid(index, field))
}

fn invalid(index: usize, field: &str) -> RejectReason {
    RejectReason::InvalidField {
        index,
        value: field.into(),
    }
}
