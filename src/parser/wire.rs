//! Wire-level constants of the DataFlash binary format.

/// First byte of the two-byte record start marker.
pub const START_BYTE_1: u8 = 0xA3;
/// Second byte of the two-byte record start marker.
pub const START_BYTE_2: u8 = 0x95;

/// Message type code of the self-describing FMT record.
pub const FMT_MESSAGE_TYPE: u8 = 0x80;
/// Name of the log-start marker record. Its numeric id is producer-defined,
/// so it is recognized by name only.
pub const STRT_NAME: &str = "STRT";

/// Record header: two marker bytes plus the message type code.
pub const HEADER_SIZE: usize = 3;
/// Fewest buffered bytes that can still hold a complete header.
pub const MIN_HEADER_SIZE: usize = 3;

/// FMT body field widths (after the 1-byte id and 1-byte length).
pub const FMT_NAME_SIZE: usize = 4;
pub const FMT_FORMAT_SIZE: usize = 16;
pub const FMT_LABELS_SIZE: usize = 64;

/// Refill chunk size for the sliding buffer.
pub const READ_CHUNK_SIZE: usize = 8192;
