//! Streaming parser for DataFlash binary logs.
//!
//! The parser pulls bytes from a [`ByteSource`], locates records behind the
//! `0xA3 0x95` start marker, learns the schema from in-band FMT records and
//! emits decoded rows into a borrowed [`LogSink`]. Corruption never aborts
//! the parse: bad bytes are skipped and counted, bad records are recorded in
//! the returned [`ParseStatus`]. Only a sink failure is fatal.

mod decoder;
mod descriptor;
mod framer;
mod timestamp;
pub(crate) mod wire;

pub use descriptor::TypeDescriptor;
pub use timestamp::TimestampConvention;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use crate::sink::{LogSink, ParseObserver, SinkError};
use crate::source::ByteSource;
use crate::status::{ParseStatus, VehicleKind};
use crate::value::{NameValuePair, Value};
use decoder::DecodeOutcome;
use framer::Framer;
use timestamp::TimestampManager;

/// Marker for a fatal sink failure; the parse unwinds immediately.
struct FatalSinkError;

/// Streaming parser for one DataFlash log.
///
/// Owns all mutable parse state; the sink and observer are borrowed and must
/// outlive the parse. A parser instance performs exactly one parse and is
/// consumed by it.
pub struct BinLogParser<'a> {
    sink: &'a mut dyn LogSink,
    observer: &'a mut dyn ParseObserver,
    framer: Framer,
    descriptors: HashMap<u8, TypeDescriptor>,
    timestamps: TimestampManager,
    status: ParseStatus,
    message_counter: u64,
    stop: Arc<AtomicBool>,
}

impl<'a> BinLogParser<'a> {
    pub fn new(sink: &'a mut dyn LogSink, observer: &'a mut dyn ParseObserver) -> Self {
        Self {
            sink,
            observer,
            framer: Framer::new(),
            descriptors: HashMap::new(),
            timestamps: TimestampManager::new(),
            status: ParseStatus::default(),
            message_counter: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that cancels the parse cooperatively. Checked at the top of the
    /// refill loop and before each record decode; a stopped parse still ends
    /// the sink transaction and returns the accumulated status.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Parse `source` to completion, cancellation or fatal sink failure,
    /// returning the accumulated diagnostics.
    pub fn parse(mut self, source: &mut dyn ByteSource) -> ParseStatus {
        debug!("starting binary log parse, {} bytes", source.size());

        if let Err(cause) = self.sink.start_transaction() {
            self.observer.on_error(&cause.to_string());
            return self.status;
        }

        match self.run(source) {
            Ok(()) => {
                let no_message_bytes = self.framer.no_message_bytes();
                if no_message_bytes > 0 {
                    debug!(
                        "{no_message_bytes} non-record bytes filtered out, the log may be corrupt"
                    );
                    self.status.set_no_message_bytes(no_message_bytes);
                }
                if let Err(cause) = self.sink.end_transaction() {
                    self.observer.on_error(&cause.to_string());
                    return self.status;
                }
                if let Some(ts) = self.timestamps.active() {
                    self.sink.set_all_rows_have_time(true, &ts.name, ts.divisor);
                }
                self.status
            }
            // The fatal handler has already ended the transaction and
            // notified the observer.
            Err(FatalSinkError) => self.status,
        }
    }

    fn run(&mut self, source: &mut dyn ByteSource) -> Result<(), FatalSinkError> {
        while !self.stopped() {
            self.observer.on_progress(source.position(), source.size());

            let added = match self.framer.refill(source) {
                Ok(count) => count,
                Err(cause) => {
                    warn!("read from log source failed: {cause}");
                    0
                }
            };

            while self.framer.available() >= wire::MIN_HEADER_SIZE && !self.stopped() {
                let Some(message_type) = self.framer.try_read_header() else {
                    continue;
                };

                if message_type == wire::FMT_MESSAGE_TYPE {
                    if !self.handle_fmt_record()? {
                        break; // short read, refill and retry
                    }
                } else if let Some(desc) = self.descriptors.get(&message_type).cloned() {
                    if !self.handle_data_record(&desc)? {
                        break; // short read, refill and retry
                    }
                } else {
                    // The wire does not carry the length of unknown types,
                    // so only the header can be skipped.
                    self.status.corrupt_data(
                        self.message_counter,
                        format!(
                            "Read data without having a valid format descriptor - \
                             Message type is {message_type}"
                        ),
                    );
                }
            }

            if added == 0 {
                break;
            }
        }
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Parse the FMT body behind an already-consumed header and route the
    /// descriptor: register it, or park it until the timestamp convention is
    /// known. Returns `false` on a short read (cursor rewound).
    fn handle_fmt_record(&mut self) -> Result<bool, FatalSinkError> {
        let Some(mut desc) = self.parse_fmt_body() else {
            self.framer.rewind_to_record_start();
            return Ok(false);
        };

        if desc.name == "GPS" {
            // GPS time of week shares the TimeMS name but not its scale;
            // renaming keeps the two series apart downstream.
            desc.replace_label("TimeMS", "GPSTimeMS");
        }

        match self.timestamps.establish(&desc) {
            Some(ts) => {
                desc.finalize(&ts);
                self.flush_deferred_and_store(desc, &ts)?;
            }
            None => self.timestamps.defer(desc),
        }
        Ok(true)
    }

    /// The FMT body has a fixed layout: id, length, then NUL-padded name,
    /// format and comma-separated labels. The encoded length is used for the
    /// short-read check only.
    fn parse_fmt_body(&mut self) -> Option<TypeDescriptor> {
        let head = self.framer.take(2)?;
        let (id, length) = (head[0], head[1] as usize);

        let body_size = wire::FMT_NAME_SIZE + wire::FMT_FORMAT_SIZE + wire::FMT_LABELS_SIZE;
        let declared = length.saturating_sub(wire::HEADER_SIZE + 2);
        if self.framer.available() < declared.max(body_size) {
            return None;
        }

        let body = self.framer.take_up_to(body_size);
        let name = text_field(body, 0, wire::FMT_NAME_SIZE);
        let format = text_field(body, wire::FMT_NAME_SIZE, wire::FMT_FORMAT_SIZE);
        let labels_text = text_field(
            body,
            wire::FMT_NAME_SIZE + wire::FMT_FORMAT_SIZE,
            wire::FMT_LABELS_SIZE,
        );
        let labels = if labels_text.is_empty() {
            Vec::new()
        } else {
            labels_text.split(',').map(str::to_string).collect()
        };

        Some(TypeDescriptor {
            id,
            length,
            name,
            format,
            labels,
            ..Default::default()
        })
    }

    /// Submit parked descriptors in arrival order, then the current one.
    fn flush_deferred_and_store(
        &mut self,
        desc: TypeDescriptor,
        ts: &TimestampConvention,
    ) -> Result<(), FatalSinkError> {
        for mut deferred in self.timestamps.take_deferred() {
            deferred.finalize(ts);
            self.store_descriptor(deferred)?;
        }
        self.store_descriptor(desc)
    }

    /// Register a descriptor and forward it to the sink.
    ///
    /// Invalid and duplicate descriptors are recorded and skipped; the FMT
    /// self-descriptor is registered for parsing but never forwarded. The
    /// registry keeps the raw wire layout; the sink receives a copy with a
    /// synthetic timestamp field when the type lacks one.
    fn store_descriptor(&mut self, desc: TypeDescriptor) -> Result<(), FatalSinkError> {
        if !desc.is_valid() {
            warn!("invalid type descriptor for type {:#04x} ({})", desc.id, desc.name);
            self.status.corrupt_fmt(
                self.message_counter,
                format!(
                    "{} format data: Corrupt or missing. Message type is:{:#x}",
                    desc.name, desc.id
                ),
            );
            return Ok(());
        }
        if self.descriptors.contains_key(&desc.id) {
            warn!("descriptor table already holds id {:#04x}, keeping the first", desc.id);
            self.status.corrupt_fmt(
                self.message_counter,
                format!("{} format data: Doubled entry found. Using the first one.", desc.name),
            );
            return Ok(());
        }

        self.descriptors.insert(desc.id, desc.clone());
        if desc.id == wire::FMT_MESSAGE_TYPE {
            return Ok(());
        }

        let mut registered = desc;
        if registered.has_no_timestamp() {
            if let Some(ts) = self.timestamps.active().cloned() {
                registered.add_timestamp_field(&ts);
            }
        }
        if let Err(cause) = self.sink.add_type(
            &registered.name,
            registered.id,
            registered.length,
            &registered.format,
            &registered.labels,
        ) {
            return Err(self.fatal_sink(cause));
        }
        self.message_counter += 1;
        Ok(())
    }

    /// Decode one data record and emit it. Returns `false` on a short read
    /// (cursor rewound).
    fn handle_data_record(&mut self, desc: &TypeDescriptor) -> Result<bool, FatalSinkError> {
        let body_len = desc.length.saturating_sub(wire::HEADER_SIZE);
        let outcome = match self.framer.take(body_len) {
            Some(body) => decoder::decode_fields(desc, body),
            None => {
                self.framer.rewind_to_record_start();
                return Ok(false);
            }
        };

        match outcome {
            DecodeOutcome::Row(values) => self.emit_row(values, desc)?,
            DecodeOutcome::Corrupt(message) => {
                warn!("corrupt {} record: {message}", desc.name);
                self.status.corrupt_data(self.message_counter, message);
            }
        }
        Ok(true)
    }

    /// Attach the time axis and hand the row to the sink.
    fn emit_row(
        &mut self,
        mut values: Vec<NameValuePair>,
        desc: &TypeDescriptor,
    ) -> Result<(), FatalSinkError> {
        let Some(ts) = self.timestamps.active().cloned() else {
            return Ok(());
        };

        if desc.has_no_timestamp() {
            values.insert(0, (ts.name.clone(), Value::UInt(self.timestamps.last_valid())));
        } else {
            self.timestamps.enforce_monotonic(
                &mut values,
                desc.timestamp_index,
                self.message_counter,
                &mut self.status,
            );
        }

        if let Err(cause) = self.sink.add_row(&desc.name, &values, &ts.name) {
            return Err(self.fatal_sink(cause));
        }
        self.message_counter += 1;
        self.status.valid_row();

        if self.status.vehicle() == VehicleKind::Generic && desc.name == "PARM" {
            self.detect_vehicle(&values);
        }
        Ok(())
    }

    /// One-shot vehicle classification from well-known parameter names.
    fn detect_vehicle(&mut self, values: &[NameValuePair]) {
        let index = values
            .iter()
            .position(|(label, _)| label == "Name")
            .unwrap_or(0);
        let Some((_, Value::Text(parameter))) = values.get(index) else {
            return;
        };
        let kind = match parameter.as_str() {
            "RATE_RLL_P" | "H_SWASH_PLATE" | "ATC_RAT_RLL_P" => VehicleKind::Quadrotor,
            "PTCH2SRV_P" => VehicleKind::FixedWing,
            "SKID_STEER_OUT" => VehicleKind::GroundRover,
            _ => return,
        };
        debug!("detected vehicle kind {kind:?} from parameter {parameter}");
        self.status.set_vehicle(kind);
    }

    /// Capture the sink's failure, try to close the transaction anyway and
    /// tell the observer. No further records are emitted after this.
    fn fatal_sink(&mut self, cause: SinkError) -> FatalSinkError {
        error!("sink rejected data, aborting parse: {cause}");
        let message = cause.to_string();
        if self.sink.end_transaction().is_err() {
            debug!("ending the sink transaction after a fatal error also failed");
        }
        self.observer.on_error(&message);
        FatalSinkError
    }
}

/// NUL-trimmed ASCII text from a fixed window of the FMT body; the window
/// may be truncated when the producer wrote a short FMT.
fn text_field(body: &[u8], start: usize, len: usize) -> String {
    let bytes = body.get(start..).unwrap_or(&[]);
    let bytes = &bytes[..len.min(bytes.len())];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_trims_nul_padding() {
        let body = b"GPS\0QBIH\0\0\0\0rest";
        assert_eq!(text_field(body, 0, 4), "GPS");
        assert_eq!(text_field(body, 4, 8), "QBIH");
    }

    #[test]
    fn test_text_field_clamps_short_body() {
        assert_eq!(text_field(b"AB", 0, 4), "AB");
        assert_eq!(text_field(b"AB", 4, 16), "");
    }
}
