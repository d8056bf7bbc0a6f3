//! Streaming parser for the self-describing binary flight-log format
//! ("DataFlash" / `.bin`) written by open-source autopilot firmware.
//!
//! The log is a flat byte stream of fixed-width records behind a two-byte
//! start marker. Its schema travels in-band: FMT records describe every
//! other record type, interleaved with the data they describe. This crate
//! discovers that schema on the fly, resynchronizes on corrupt bytes,
//! decodes records into labeled values and enforces a single monotonic time
//! axis before handing rows to a caller-provided sink.
//!
//! # Architecture
//!
//! - **Framer**: sliding buffer with header scanning and loss-free retry of
//!   records cut short by a refill boundary
//! - **Descriptor registry**: message-type code to schema, populated from
//!   FMT records
//! - **Field decoder**: format-string alphabet to typed values
//! - **Timestamp manager**: convention discovery, synthesis for types
//!   without a native timestamp, monotonicity enforcement
//!
//! # Example
//!
//! ```no_run
//! use dataflash::{BinLogParser, FileSource, LogSink, NameValuePair, SinkError};
//!
//! # struct Discard;
//! # impl LogSink for Discard {
//! #     fn start_transaction(&mut self) -> Result<(), SinkError> { Ok(()) }
//! #     fn end_transaction(&mut self) -> Result<(), SinkError> { Ok(()) }
//! #     fn add_type(&mut self, _: &str, _: u8, _: usize, _: &str, _: &[String]) -> Result<(), SinkError> { Ok(()) }
//! #     fn add_row(&mut self, _: &str, _: &[NameValuePair], _: &str) -> Result<(), SinkError> { Ok(()) }
//! #     fn set_all_rows_have_time(&mut self, _: bool, _: &str, _: f64) {}
//! # }
//! let mut source = FileSource::open("flight.bin")?;
//! let mut sink = Discard;
//! let status = BinLogParser::new(&mut sink, &mut ()).parse(&mut source);
//! println!("{} rows, {} resync bytes", status.valid_rows(), status.no_message_bytes());
//! # Ok::<(), dataflash::BinLogError>(())
//! ```

use thiserror::Error;

pub mod parser;
pub mod sink;
pub mod source;
pub mod status;
pub mod value;

pub use parser::{BinLogParser, TimestampConvention, TypeDescriptor};
pub use sink::{LogSink, ParseObserver, SinkError};
pub use source::{ByteSource, FileSource, SliceSource};
pub use status::{ParseIncident, ParseStatus, VehicleKind};
pub use value::{NameValuePair, Value};

#[derive(Error, Debug)]
pub enum BinLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, BinLogError>;
