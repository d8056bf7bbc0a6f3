//! Record framing over a sliding byte buffer.

use std::io;
use tracing::trace;

use super::wire;
use crate::source::ByteSource;

/// Locates record boundaries in the byte stream.
///
/// The buffer is append-only between refills; a read cursor walks it. Bytes
/// before the cursor are dropped at refill time, so a record that could not
/// be completed must rewind the cursor to its header first (see
/// [`Framer::rewind_to_record_start`]) to survive the next refill. This is
/// what makes short reads loss-free: an incomplete record is simply retried
/// once more bytes arrive.
pub(crate) struct Framer {
    buf: Vec<u8>,
    pos: usize,
    record_start: usize,
    no_message_bytes: u64,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(wire::READ_CHUNK_SIZE + wire::MIN_HEADER_SIZE),
            pos: 0,
            record_start: 0,
            no_message_bytes: 0,
        }
    }

    /// Drop consumed bytes and append the next chunk from `source`.
    /// Returns the number of bytes added.
    pub fn refill(&mut self, source: &mut dyn ByteSource) -> io::Result<usize> {
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.record_start = 0;

        let mut chunk = [0u8; wire::READ_CHUNK_SIZE];
        let count = source.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..count]);
        trace!("refilled {count} bytes, {} buffered", self.buf.len());
        Ok(count)
    }

    /// Unconsumed bytes currently buffered.
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Scan for a record header at the cursor.
    ///
    /// On a valid `0xA3 0x95 type` header all three bytes are consumed and
    /// the type code is returned. Otherwise the cursor advances one byte past
    /// the first mismatched position and the discarded bytes are counted.
    pub fn try_read_header(&mut self) -> Option<u8> {
        debug_assert!(self.available() >= wire::MIN_HEADER_SIZE);
        self.record_start = self.pos;

        if self.buf[self.pos] != wire::START_BYTE_1 {
            self.pos += 1;
            self.no_message_bytes += 1;
            return None;
        }
        if self.buf[self.pos + 1] != wire::START_BYTE_2 {
            self.pos += 2;
            self.no_message_bytes += 2;
            return None;
        }
        let message_type = self.buf[self.pos + 2];
        self.pos += wire::HEADER_SIZE;
        Some(message_type)
    }

    /// Consume exactly `count` bytes, or return `None` (cursor unchanged)
    /// when fewer are buffered.
    pub fn take(&mut self, count: usize) -> Option<&[u8]> {
        if self.available() < count {
            return None;
        }
        let start = self.pos;
        self.pos += count;
        Some(&self.buf[start..start + count])
    }

    /// Consume up to `count` bytes.
    pub fn take_up_to(&mut self, count: usize) -> &[u8] {
        let count = count.min(self.available());
        let start = self.pos;
        self.pos += count;
        &self.buf[start..start + count]
    }

    /// Rewind to the position before the last header so a short record is
    /// retried after the next refill.
    pub fn rewind_to_record_start(&mut self) {
        self.pos = self.record_start;
    }

    /// Bytes discarded during resynchronization so far.
    pub fn no_message_bytes(&self) -> u64 {
        self.no_message_bytes
    }
}
