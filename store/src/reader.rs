//! Read a store sequentially without copying it.
//!
//! A [Reader] borrows its store immutably, so the store cannot be appended to, mutated, or cleared
//! while the reader is alive. Reads are served directly from the store's segments: [io::BufRead]
//! and [Buf] expose the remainder of the current segment without copying.

use crate::{
    config::MAX_CONTIGUOUS_LEN,
    index::{Index, Unindexed},
    segments::Segments,
};
use bytes::Buf;
use std::io;

/// A sequential reader over a [Segments] store with mark/reset support.
#[derive(Clone, Debug)]
pub struct Reader<'a, I: Index = Unindexed> {
    /// The store being read.
    segments: &'a Segments<I>,
    /// Number of bytes in the store.
    len: u64,
    /// Absolute position of the next byte.
    position: u64,
    /// Position restored by [Reader::reset].
    mark: u64,
    /// Segment holding the next byte.
    segment: usize,
    /// Offset of the next byte within `segment`.
    offset: usize,
}

impl<'a, I: Index> Reader<'a, I> {
    /// Creates a reader positioned at the start of `segments`.
    pub(crate) fn new(segments: &'a Segments<I>) -> Self {
        Self {
            segments,
            len: segments.len(),
            position: 0,
            mark: 0,
            segment: 0,
            offset: 0,
        }
    }

    /// Returns the number of bytes in the underlying store.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns whether the underlying store is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the absolute position of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the exact number of bytes left to read.
    pub fn remaining_len(&self) -> u64 {
        self.len - self.position
    }

    /// Returns the number of bytes left to read, capped at [MAX_CONTIGUOUS_LEN].
    pub fn available(&self) -> u32 {
        self.remaining_len().min(MAX_CONTIGUOUS_LEN) as u32
    }

    /// Returns the next byte, or `None` once every byte has been read.
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = *self.current().first()?;
        self.step(1);
        Some(byte)
    }

    /// Remembers the current position for a later [Reader::reset].
    pub fn mark(&mut self) {
        self.mark = self.position;
    }

    /// Returns to the last marked position (or the start, if never marked).
    pub fn reset(&mut self) {
        self.seek_to(self.mark);
    }

    /// Skips up to `n` bytes, returning how many were skipped.
    pub fn skip(&mut self, n: u64) -> u64 {
        let n = n.min(self.remaining_len());
        self.step(n);
        n
    }

    /// Moves to `position` (clamped to the length of the store), returning the new position.
    pub fn seek_to(&mut self, position: u64) -> u64 {
        let position = position.min(self.len);
        if position < self.position {
            self.position = 0;
            self.segment = 0;
            self.offset = 0;
        }
        self.step(position - self.position);
        self.position
    }

    /// Returns the unread bytes of the current segment.
    ///
    /// Empty only when every byte has been read.
    fn current(&self) -> &'a [u8] {
        let segments: &'a Segments<I> = self.segments;
        &segments.segment(self.segment)[self.offset..]
    }

    /// Advances the cursor by `n` bytes, moving past a segment as soon as it is exhausted.
    fn step(&mut self, mut n: u64) {
        debug_assert!(n <= self.remaining_len());
        self.position += n;
        while n > 0 {
            let left = (self.segments.segment(self.segment).len() - self.offset) as u64;
            if left > n {
                self.offset += n as usize;
                return;
            }
            n -= left;
            self.segment += 1;
            self.offset = 0;
        }
    }
}

impl<I: Index> io::Read for Reader<'_, I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut read = 0;
        while read < buf.len() {
            let chunk = self.current();
            if chunk.is_empty() {
                break;
            }
            let n = chunk.len().min(buf.len() - read);
            buf[read..read + n].copy_from_slice(&chunk[..n]);
            self.step(n as u64);
            read += n;
        }
        Ok(read)
    }
}

impl<I: Index> io::BufRead for Reader<'_, I> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.current())
    }

    fn consume(&mut self, amt: usize) {
        let amt = (amt as u64).min(self.remaining_len());
        self.step(amt);
    }
}

impl<I: Index> io::Seek for Reader<'_, I> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => i128::from(offset),
            io::SeekFrom::End(delta) => i128::from(self.len) + i128::from(delta),
            io::SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        let target = u64::try_from(target).unwrap_or(u64::MAX);
        Ok(self.seek_to(target))
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl<I: Index> Buf for Reader<'_, I> {
    fn remaining(&self) -> usize {
        usize::try_from(self.remaining_len()).unwrap_or(usize::MAX)
    }

    fn chunk(&self) -> &[u8] {
        self.current()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt as u64 <= self.remaining_len(),
            "cannot advance past end of store"
        );
        self.step(cnt as u64);
    }
}
