//! Sink and observer contracts.
//!
//! The parser emits descriptors and rows into a borrowed [`LogSink`] (the
//! tabular data model) and reports progress and fatal failures through a
//! borrowed [`ParseObserver`]. Both must outlive the parse.

use crate::value::NameValuePair;
use thiserror::Error;

/// Error reported by a sink operation. Carries the sink's own message so the
/// parser can forward it to [`ParseObserver::on_error`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The tabular data model decoded records are stored into.
///
/// Rows are delivered in strict stream order. Every row carries exactly one
/// timestamp field: at its on-wire index for types that declare one, or
/// prepended for types that had one synthesized.
pub trait LogSink {
    fn start_transaction(&mut self) -> Result<(), SinkError>;

    fn end_transaction(&mut self) -> Result<(), SinkError>;

    /// Register a type descriptor for subsequent row insertions.
    fn add_type(
        &mut self,
        name: &str,
        id: u8,
        length: usize,
        format: &str,
        labels: &[String],
    ) -> Result<(), SinkError>;

    /// Append one decoded record.
    fn add_row(
        &mut self,
        type_name: &str,
        values: &[NameValuePair],
        ts_label: &str,
    ) -> Result<(), SinkError>;

    /// Called once at parse end, after the transaction, when a timestamp
    /// convention was established for the log.
    fn set_all_rows_have_time(&mut self, all_have_time: bool, ts_label: &str, divisor: f64);
}

/// Progress and fatal-error callbacks for one parse.
pub trait ParseObserver {
    /// Called once per buffer refill.
    fn on_progress(&mut self, _position: u64, _total: u64) {}

    /// Called at most once, when the sink rejects data and the parse aborts.
    fn on_error(&mut self, _message: &str) {}
}

/// Callers that do not care about progress can pass `&mut ()`.
impl ParseObserver for () {}
