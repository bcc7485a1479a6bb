//! An append-only sink that never grows past the 32-bit contiguous limit.
//!
//! [Sink] is the drop-in choice when the collected bytes will eventually be handed to an API that
//! needs one contiguous buffer. Every write checks the limit before touching the store, so a
//! rejected write leaves the sink exactly as it was, and [Sink::to_vec] can never fail.

use crate::{
    check_range,
    config::{Config, MAX_CONTIGUOUS_LEN},
    reader::Reader,
    segments::Segments,
    Error,
};
use bytes::Bytes;
use std::io;

/// An append-only byte sink holding at most `max_contiguous` (and never more than
/// [MAX_CONTIGUOUS_LEN]) bytes.
#[derive(Debug)]
pub struct Sink {
    segments: Segments,
    max: u64,
}

impl Default for Sink {
    fn default() -> Self {
        Self {
            segments: Segments::default(),
            max: MAX_CONTIGUOUS_LEN,
        }
    }
}

impl Sink {
    /// Creates an empty sink.
    ///
    /// A `max_contiguous` above [MAX_CONTIGUOUS_LEN] is lowered to it.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            segments: Segments::new(cfg.initial_capacity),
            max: cfg.max_contiguous.min(MAX_CONTIGUOUS_LEN),
        })
    }

    /// Creates an empty sink whose first segment holds `initial_capacity` bytes.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self, Error> {
        Self::new(Config::with_capacity(initial_capacity))
    }

    /// Fails if `additional` more bytes would exceed the limit.
    fn check(&self, additional: usize) -> Result<(), Error> {
        let needed = self.segments.len().saturating_add(additional as u64);
        if needed > self.max {
            return Err(Error::CapacityExceeded(needed, self.max));
        }
        Ok(())
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) -> Result<(), Error> {
        self.check(1)?;
        self.segments.push(byte);
        Ok(())
    }

    /// Appends every byte of `bytes`, or none of them.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.check(bytes.len())?;
        self.segments.append(bytes);
        Ok(())
    }

    /// Appends `len` bytes of `buf` starting at `offset`, or none of them.
    pub fn write_range(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<(), Error> {
        check_range(offset, len, buf.len())?;
        self.extend_from_slice(&buf[offset..offset + len])
    }

    /// Returns the number of bytes written.
    pub fn size(&self) -> u32 {
        self.segments.len() as u32
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> u64 {
        self.segments.len()
    }

    /// Returns whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the most bytes this sink will accept.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Discards everything written, keeping the open segment for reuse.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Returns a copy of everything written.
    pub fn to_vec(&self) -> Vec<u8> {
        self.segments.concat(self.segments.len() as usize)
    }

    /// Returns a copy of everything written as [Bytes].
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_vec())
    }

    /// Decodes everything written as UTF-8.
    pub fn to_utf8(&self) -> Result<String, Error> {
        String::from_utf8(self.to_vec()).map_err(|err| Error::InvalidUtf8(err.utf8_error()))
    }

    /// Decodes everything written as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_vec()).into_owned()
    }

    /// Writes everything written so far to `sink`, one segment at a time.
    pub fn write_to<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        self.segments.write_to(sink)
    }

    /// Returns a sequential reader over everything written.
    pub fn reader(&self) -> Reader<'_> {
        self.segments.reader()
    }
}

impl io::Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
