//! Shared fixtures: an in-memory sink, a recording observer and a synthetic
//! log builder.

use std::io;

use dataflash::{ByteSource, LogSink, NameValuePair, ParseObserver, SinkError};

/// One registered type as the sink saw it.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub name: String,
    pub id: u8,
    pub length: usize,
    pub format: String,
    pub labels: Vec<String>,
}

/// Tabular in-memory sink with optional fault injection.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub types: Vec<TypeEntry>,
    pub rows: Vec<(String, Vec<NameValuePair>)>,
    pub transactions_started: usize,
    pub transactions_ended: usize,
    pub time_axis: Option<(bool, String, f64)>,
    pub fail_on_add_type: bool,
    pub fail_on_add_row: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_named(&self, name: &str) -> Option<&TypeEntry> {
        self.types.iter().find(|entry| entry.name == name)
    }

    pub fn rows_of(&self, type_name: &str) -> Vec<&Vec<NameValuePair>> {
        self.rows
            .iter()
            .filter(|(name, _)| name == type_name)
            .map(|(_, values)| values)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn start_transaction(&mut self) -> Result<(), SinkError> {
        self.transactions_started += 1;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), SinkError> {
        self.transactions_ended += 1;
        Ok(())
    }

    fn add_type(
        &mut self,
        name: &str,
        id: u8,
        length: usize,
        format: &str,
        labels: &[String],
    ) -> Result<(), SinkError> {
        if self.fail_on_add_type {
            return Err(SinkError::new("table creation failed"));
        }
        self.types.push(TypeEntry {
            name: name.to_string(),
            id,
            length,
            format: format.to_string(),
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn add_row(
        &mut self,
        type_name: &str,
        values: &[NameValuePair],
        _ts_label: &str,
    ) -> Result<(), SinkError> {
        if self.fail_on_add_row {
            return Err(SinkError::new("row insert failed"));
        }
        self.rows.push((type_name.to_string(), values.to_vec()));
        Ok(())
    }

    fn set_all_rows_have_time(&mut self, all_have_time: bool, ts_label: &str, divisor: f64) {
        self.time_axis = Some((all_have_time, ts_label.to_string(), divisor));
    }
}

/// Observer that records every callback.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub progress: Vec<(u64, u64)>,
    pub errors: Vec<String>,
}

impl ParseObserver for RecordingObserver {
    fn on_progress(&mut self, position: u64, total: u64) {
        self.progress.push((position, total));
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Builds synthetic log byte streams record by record.
#[derive(Default)]
pub struct LogBuilder {
    bytes: Vec<u8>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes, e.g. garbage for resync tests.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Append a record: header plus body.
    pub fn record(mut self, message_type: u8, body: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0xA3, 0x95, message_type]);
        self.bytes.extend_from_slice(body);
        self
    }

    /// Append an FMT record describing `id`.
    pub fn fmt(self, id: u8, length: u8, name: &str, format: &str, labels: &str) -> Self {
        let mut body = vec![id, length];
        body.extend(padded(name, 4));
        body.extend(padded(format, 16));
        body.extend(padded(labels, 64));
        self.record(0x80, &body)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn padded(text: &str, width: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    assert!(bytes.len() <= width, "field {text:?} exceeds {width} bytes");
    bytes.resize(width, 0);
    bytes
}

/// Source that hands out at most `max_read` bytes per read, forcing records
/// to straddle refill boundaries.
pub struct DribbleSource {
    data: Vec<u8>,
    position: usize,
    max_read: usize,
}

impl DribbleSource {
    pub fn new(data: Vec<u8>, max_read: usize) -> Self {
        Self {
            data,
            position: 0,
            max_read,
        }
    }
}

impl ByteSource for DribbleSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let count = remaining.len().min(buf.len()).min(self.max_read);
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }

    fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
