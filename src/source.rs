//! Byte sources feeding the parser.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// An opaque byte stream the parser pulls from.
///
/// A `read` returning 0 means the stream is exhausted. `position` and `size`
/// feed progress reporting only and may be approximations.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning the count read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether the stream has been fully consumed.
    fn at_end(&self) -> bool;

    /// Bytes consumed so far.
    fn position(&self) -> u64;

    /// Total stream length, when known.
    fn size(&self) -> u64;
}

/// File-backed source with byte accounting for progress reporting.
pub struct FileSource {
    file: File,
    position: u64,
    size: u64,
}

impl FileSource {
    /// Open a log file for parsing.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            position: 0,
            size,
        })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.file.read(buf)?;
        self.position += count as u64;
        Ok(count)
    }

    fn at_end(&self) -> bool {
        self.position >= self.size
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// In-memory source over a borrowed byte slice.
pub struct SliceSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let count = remaining.len().min(buf.len());
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
