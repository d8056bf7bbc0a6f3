//! Field decoding by per-type format strings.
//!
//! Each format character names a fixed-width wire type; a record body is
//! decoded left-to-right into labeled values. All multi-byte fields are
//! little-endian, floats are IEEE 754 single-precision.

use super::descriptor::TypeDescriptor;
use crate::value::{NameValuePair, Value};

/// Result of decoding one record body.
pub(crate) enum DecodeOutcome {
    /// Fields in format order. May be empty for degenerate types (STRT).
    Row(Vec<NameValuePair>),
    /// The record is unusable; the message says why. Consumed bytes stay
    /// consumed so the cursor remains aligned with the declared length.
    Corrupt(String),
}

/// Decode `data` (the record body, header stripped) according to the
/// descriptor's format string.
pub(crate) fn decode_fields(desc: &TypeDescriptor, data: &[u8]) -> DecodeOutcome {
    let mut values = Vec::with_capacity(desc.format.len());
    let mut cursor = ByteCursor::new(data);

    for (index, code) in desc.format.chars().enumerate() {
        let value = match code {
            'b' | 'M' => cursor.read_i8().map(|v| Value::Int(v.into())),
            'B' => cursor.read_u8().map(|v| Value::UInt(v.into())),
            'h' => cursor.read_i16().map(|v| Value::Int(v.into())),
            'H' => cursor.read_u16().map(|v| Value::UInt(v.into())),
            'i' => cursor.read_i32().map(|v| Value::Int(v.into())),
            'I' => cursor.read_u32().map(|v| Value::UInt(v.into())),
            'q' => cursor.read_i64().map(Value::Int),
            'Q' => cursor.read_u64().map(Value::UInt),
            'f' => match cursor.read_f32() {
                Some(v) if v.is_nan() => {
                    return DecodeOutcome::Corrupt(format!(
                        "Corrupt data element found when decoding {} data.",
                        desc.name
                    ));
                }
                other => other.map(|v| Value::Float(v.into())),
            },
            'c' => cursor.read_i16().map(|v| Value::Float(f64::from(v) / 100.0)),
            'C' => cursor.read_u16().map(|v| Value::Float(f64::from(v) / 100.0)),
            'e' => cursor.read_i32().map(|v| Value::Float(f64::from(v) / 100.0)),
            'E' => cursor.read_u32().map(|v| Value::Float(f64::from(v) / 100.0)),
            'L' => cursor
                .read_i32()
                .map(|v| Value::Float(f64::from(v) / 10_000_000.0)),
            'n' => cursor.read_text(4).map(Value::Text),
            'N' => cursor.read_text(16).map(Value::Text),
            'Z' => cursor.read_text(64).map(Value::Text),
            unknown => {
                return DecodeOutcome::Corrupt(format!(
                    "Unknown data type: {} when decoding {}",
                    unknown, desc.name
                ));
            }
        };
        match value {
            Some(value) => values.push((desc.label_at(index).to_string(), value)),
            None => {
                return DecodeOutcome::Corrupt(format!(
                    "Data shorter than format when decoding {}",
                    desc.name
                ));
            }
        }
    }

    DecodeOutcome::Row(values)
}

struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.offset..self.offset + N)?;
        self.offset += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|b| b[0])
    }

    fn read_i8(&mut self) -> Option<i8> {
        self.read_array::<1>().map(|b| b[0] as i8)
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    fn read_i16(&mut self) -> Option<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    fn read_f32(&mut self) -> Option<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Fixed window of `count` bytes; the string stops at the first NUL but
    /// the whole window is consumed.
    fn read_text(&mut self, count: usize) -> Option<String> {
        let bytes = self.data.get(self.offset..self.offset + count)?;
        self.offset += count;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(count);
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
