//! Message-type descriptors discovered from FMT records.

use tracing::warn;

use super::timestamp::TimestampConvention;
use super::wire;

/// Sentinel id meaning "unset".
const UNSET_ID: u8 = 0xFF;

/// Schema of one message type, parsed from an FMT record.
///
/// `length` is the total on-wire record length including the 3-byte header.
/// `format` holds one alphabet character per field; `labels` the matching
/// field names.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub id: u8,
    pub length: usize,
    pub name: String,
    pub format: String,
    pub labels: Vec<String>,
    /// Whether one of the labels matches the active timestamp name.
    pub has_timestamp: bool,
    /// Index of that label when `has_timestamp`.
    pub timestamp_index: usize,
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self {
            id: UNSET_ID,
            length: 0,
            name: String::new(),
            format: String::new(),
            labels: Vec::new(),
            has_timestamp: false,
            timestamp_index: 0,
        }
    }
}

impl TypeDescriptor {
    /// Mark the timestamp field if one of the labels matches the active
    /// convention.
    pub(crate) fn finalize(&mut self, ts: &TimestampConvention) {
        if let Some(index) = self.labels.iter().position(|label| *label == ts.name) {
            self.has_timestamp = true;
            self.timestamp_index = index;
        }
    }

    /// Prepend a synthetic 64-bit timestamp field.
    ///
    /// The field is never read from the wire; row emission prepends the last
    /// valid timestamp instead, so every row in the sink has a time axis.
    pub(crate) fn add_timestamp_field(&mut self, ts: &TimestampConvention) {
        self.labels.insert(0, ts.name.clone());
        self.format.insert(0, 'Q');
        self.length += 8;
        self.has_timestamp = true;
        self.timestamp_index = 0;
    }

    pub(crate) fn replace_label(&mut self, old: &str, new: &str) {
        if let Some(label) = self.labels.iter_mut().find(|label| *label == old) {
            *label = new.to_string();
        }
    }

    /// Label for field `index`, or `"NoLabel"` for surplus format characters.
    pub(crate) fn label_at(&self, index: usize) -> &str {
        self.labels.get(index).map(String::as_str).unwrap_or("NoLabel")
    }

    pub(crate) fn has_no_timestamp(&self) -> bool {
        !self.has_timestamp
    }

    /// Structural validity.
    ///
    /// The FMT descriptor itself and STRT descriptors are corrupt in logs
    /// from some producers; those shapes are tolerated with a warning. FMT
    /// keeps parsing by its fixed layout regardless, and a degenerate STRT
    /// simply has no data fields.
    pub(crate) fn is_valid(&self) -> bool {
        if self.id == wire::FMT_MESSAGE_TYPE {
            if self.format.len() != self.labels.len() {
                warn!(
                    "corrupt FMT descriptor (format/label count mismatch), known bug in some logs, ignoring"
                );
            }
            self.id != UNSET_ID
                && self.length > 0
                && !self.name.is_empty()
                && !self.format.is_empty()
                && !self.labels.is_empty()
        } else if self.name == wire::STRT_NAME {
            if self.format.is_empty() && self.length == wire::HEADER_SIZE {
                warn!("corrupt STRT descriptor (empty format), known bug in some logs, ignoring");
            }
            self.id != UNSET_ID
                && self.length > 0
                && !self.name.is_empty()
                && self.format.len() == self.labels.len()
        } else {
            self.id != UNSET_ID
                && self.length > 0
                && !self.name.is_empty()
                && !self.format.is_empty()
                && self.format.len() == self.labels.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u8, length: usize, name: &str, format: &str, labels: &[&str]) -> TypeDescriptor {
        TypeDescriptor {
            id,
            length,
            name: name.to_string(),
            format: format.to_string(),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            ..Default::default()
        }
    }

    fn time_us() -> TimestampConvention {
        TimestampConvention::new("TimeUS", 1_000_000.0)
    }

    #[test]
    fn test_well_formed_descriptor_is_valid() {
        assert!(descriptor(0x81, 12, "TEST", "BQ", &["X", "TimeUS"]).is_valid());
    }

    #[test]
    fn test_label_count_mismatch_is_invalid() {
        assert!(!descriptor(0x81, 12, "TEST", "BQ", &["X"]).is_valid());
    }

    #[test]
    fn test_unset_id_and_zero_length_are_invalid() {
        assert!(!descriptor(0xFF, 12, "TEST", "B", &["X"]).is_valid());
        assert!(!descriptor(0x81, 0, "TEST", "B", &["X"]).is_valid());
        assert!(!descriptor(0x81, 12, "", "B", &["X"]).is_valid());
    }

    #[test]
    fn test_fmt_descriptor_tolerates_mismatch() {
        // Known producer bug: the FMT self-descriptor often has fewer labels
        // than format characters.
        assert!(descriptor(0x80, 89, "FMT", "BBnNZ", &["Type", "Length"]).is_valid());
        assert!(!descriptor(0x80, 89, "FMT", "", &["Type"]).is_valid());
    }

    #[test]
    fn test_degenerate_strt_is_tolerated() {
        assert!(descriptor(0x0A, 3, "STRT", "", &[]).is_valid());
        assert!(!descriptor(0x0A, 3, "STRT", "B", &[]).is_valid());
    }

    #[test]
    fn test_finalize_marks_timestamp_label() {
        let mut desc = descriptor(0x81, 12, "TEST", "BQ", &["X", "TimeUS"]);
        desc.finalize(&time_us());
        assert!(desc.has_timestamp);
        assert_eq!(desc.timestamp_index, 1);

        let mut no_ts = descriptor(0x82, 4, "PING", "B", &["SEQ"]);
        no_ts.finalize(&time_us());
        assert!(no_ts.has_no_timestamp());
    }

    #[test]
    fn test_add_timestamp_field_prepends() {
        let mut desc = descriptor(0x82, 4, "PING", "B", &["SEQ"]);
        desc.add_timestamp_field(&time_us());
        assert_eq!(desc.format, "QB");
        assert_eq!(desc.labels, vec!["TimeUS".to_string(), "SEQ".to_string()]);
        assert_eq!(desc.length, 12);
        assert!(desc.has_timestamp);
        assert_eq!(desc.timestamp_index, 0);
    }

    #[test]
    fn test_replace_label() {
        let mut desc = descriptor(0x83, 20, "GPS", "IB", &["TimeMS", "NSats"]);
        desc.replace_label("TimeMS", "GPSTimeMS");
        assert_eq!(desc.labels[0], "GPSTimeMS");
        desc.replace_label("Missing", "X");
        assert_eq!(desc.labels, vec!["GPSTimeMS".to_string(), "NSats".to_string()]);
    }

    #[test]
    fn test_label_at_fills_no_label() {
        let desc = descriptor(0x81, 12, "TEST", "BQ", &["X"]);
        assert_eq!(desc.label_at(0), "X");
        assert_eq!(desc.label_at(1), "NoLabel");
    }
}
