//! An append-only sink for payloads that may outgrow a single contiguous buffer.
//!
//! [MemorySink] accepts any amount of data. Its legacy [MemorySink::size] saturates at
//! [MAX_CONTIGUOUS_LEN] while [MemorySink::len] is always exact, and [MemorySink::to_vec] refuses
//! (rather than truncates) payloads larger than the configured contiguous limit. Payloads of any
//! size can be streamed out with [MemorySink::write_to] or [MemorySink::reader].

use crate::{
    check_range,
    config::{Config, MAX_CONTIGUOUS_LEN},
    reader::Reader,
    segments::Segments,
    Error,
};
use bytes::{buf::UninitSlice, Buf, BufMut, Bytes};
use std::io;

/// An unbounded append-only byte sink.
#[derive(Debug)]
pub struct MemorySink {
    segments: Segments,
    max_contiguous: u64,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self {
            segments: Segments::default(),
            max_contiguous: MAX_CONTIGUOUS_LEN,
        }
    }
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            segments: Segments::new(cfg.initial_capacity),
            max_contiguous: cfg.max_contiguous,
        })
    }

    /// Creates an empty sink whose first segment holds `initial_capacity` bytes.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self, Error> {
        Self::new(Config::with_capacity(initial_capacity))
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) {
        self.segments.push(byte);
    }

    /// Appends every byte of `bytes`.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.segments.append(bytes);
    }

    /// Appends `len` bytes of `buf` starting at `offset`, or none of them.
    pub fn write_range(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<(), Error> {
        check_range(offset, len, buf.len())?;
        self.segments.append(&buf[offset..offset + len]);
        Ok(())
    }

    /// Appends every remaining byte of `buf`.
    pub fn append_buf(&mut self, buf: impl Buf) {
        self.segments.append_buf(buf);
    }

    /// Appends everything `reader` produces until end-of-file, returning the number of bytes read.
    pub fn read_from<R: io::Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<u64> {
        self.segments.read_from(reader)
    }

    /// Returns the number of bytes written, saturating at [MAX_CONTIGUOUS_LEN].
    pub fn size(&self) -> u32 {
        self.segments.len().min(MAX_CONTIGUOUS_LEN) as u32
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> u64 {
        self.segments.len()
    }

    /// Returns whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the underlying segment store.
    pub fn segments(&self) -> &Segments {
        &self.segments
    }

    /// Discards everything written, keeping the open segment for reuse.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Returns a copy of everything written.
    ///
    /// Fails with [Error::CapacityExceeded] if more than `max_contiguous` bytes were written.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        self.segments.to_vec(self.max_contiguous)
    }

    /// Returns a copy of everything written as [Bytes].
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        self.segments.to_bytes(self.max_contiguous)
    }

    /// Decodes everything written as UTF-8.
    pub fn to_utf8(&self) -> Result<String, Error> {
        String::from_utf8(self.to_vec()?).map_err(|err| Error::InvalidUtf8(err.utf8_error()))
    }

    /// Decodes everything written as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Result<String, Error> {
        Ok(String::from_utf8_lossy(&self.to_vec()?).into_owned())
    }

    /// Writes everything to `sink`, one segment at a time, without materializing it.
    pub fn write_to<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        self.segments.write_to(sink)
    }

    /// Returns a sequential reader over everything written.
    pub fn reader(&self) -> Reader<'_> {
        self.segments.reader()
    }
}

impl io::Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.segments.append(buf);
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.segments.append(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// SAFETY: `chunk_mut` only exposes the unused (zero-initialized) tail of the open segment, which
// is never empty, and `advance_mut` refuses to commit past the end of that tail.
unsafe impl BufMut for MemorySink {
    fn remaining_mut(&self) -> usize {
        (isize::MAX as u64).saturating_sub(self.segments.len()) as usize
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        self.segments.commit(cnt);
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        UninitSlice::new(self.segments.spare_mut())
    }

    fn put_slice(&mut self, src: &[u8]) {
        self.segments.append(src);
    }
}
