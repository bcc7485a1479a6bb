//! A growable byte array with random access.
//!
//! [ByteArray] appends like [crate::MemorySink] but also tracks where each segment starts, so any
//! byte can be read or overwritten in `O(log segments)`. It is single-writer: share it across
//! threads only behind external synchronization (for example [crate::Shared]).

use crate::{
    channel::Channel,
    check_range,
    config::{Config, MAX_CONTIGUOUS_LEN},
    index::Offsets,
    reader::Reader,
    segments::Segments,
    Error,
};
use bytes::{buf::UninitSlice, Buf, BufMut, Bytes};
use std::io;

/// A mutable, randomly addressable, segmented byte array.
#[derive(Debug)]
pub struct ByteArray {
    segments: Segments<Offsets>,
    max_contiguous: u64,
}

impl Default for ByteArray {
    fn default() -> Self {
        Self {
            segments: Segments::default(),
            max_contiguous: MAX_CONTIGUOUS_LEN,
        }
    }
}

impl ByteArray {
    /// Creates an empty array.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            segments: Segments::new(cfg.initial_capacity),
            max_contiguous: cfg.max_contiguous,
        })
    }

    /// Creates an empty array whose first segment holds `initial_capacity` bytes.
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

    /// Returns the byte at `index`.
    pub fn get(&self, index: u64) -> Result<u8, Error> {
        self.segments.get(index)
    }

    /// Overwrites the byte at `index`, returning the previous value.
    pub fn set(&mut self, index: u64, value: u8) -> Result<u8, Error> {
        self.segments.set(index, value)
    }

    /// Returns the number of bytes stored.
    ///
    /// Fails with [Error::CapacityExceeded] if the array holds more than [MAX_CONTIGUOUS_LEN]
    /// bytes. Use [ByteArray::len] for the exact length of larger arrays.
    pub fn size(&self) -> Result<u32, Error> {
        let len = self.segments.len();
        if len > MAX_CONTIGUOUS_LEN {
            return Err(Error::CapacityExceeded(len, MAX_CONTIGUOUS_LEN));
        }
        Ok(len as u32)
    }

    /// Returns the number of bytes stored.
    pub fn len(&self) -> u64 {
        self.segments.len()
    }

    /// Returns whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the underlying segment store.
    pub fn segments(&self) -> &Segments<Offsets> {
        &self.segments
    }

    /// Removes every byte, keeping the open segment for reuse.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Returns a copy of the array.
    ///
    /// Fails with [Error::CapacityExceeded] if the array is larger than `max_contiguous`.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        self.segments.to_vec(self.max_contiguous)
    }

    /// Returns a copy of the array as [Bytes].
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        self.segments.to_bytes(self.max_contiguous)
    }

    /// Decodes the array as UTF-8.
    pub fn to_utf8(&self) -> Result<String, Error> {
        String::from_utf8(self.to_vec()?).map_err(|err| Error::InvalidUtf8(err.utf8_error()))
    }

    /// Decodes the array as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Result<String, Error> {
        Ok(String::from_utf8_lossy(&self.to_vec()?).into_owned())
    }

    /// Writes the array to `sink`, one segment at a time, without materializing it.
    pub fn write_to<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        self.segments.write_to(sink)
    }

    /// Returns a sequential reader over the array.
    pub fn reader(&self) -> Reader<'_, Offsets> {
        self.segments.reader()
    }

    /// Returns a write-only channel that appends to the array.
    pub fn channel(&mut self) -> Channel<'_> {
        Channel::new(self)
    }
}

impl io::Write for ByteArray {
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
unsafe impl BufMut for ByteArray {
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
