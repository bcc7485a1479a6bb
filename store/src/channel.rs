//! A write-only channel view of a [ByteArray].
//!
//! A [Channel] can only append: it has no read operation at all, and its position is always the
//! end of the array. Asking it to move anywhere else fails with [Error::Unsupported].

use crate::{array::ByteArray, Error};
use bytes::Buf;
use std::io;

/// Appends to a [ByteArray] through a channel-style interface.
#[derive(Debug)]
pub struct Channel<'a> {
    array: &'a mut ByteArray,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(array: &'a mut ByteArray) -> Self {
        Self { array }
    }

    /// Appends every remaining byte of `buf`, returning how many were written.
    pub fn write_buf(&mut self, buf: impl Buf) -> usize {
        let n = buf.remaining();
        self.array.append_buf(buf);
        n
    }

    /// Returns the number of bytes in the underlying array.
    pub fn size(&self) -> u64 {
        self.array.len()
    }

    /// Returns where the next write lands (always the end of the array).
    pub fn position(&self) -> u64 {
        self.array.len()
    }

    /// Moves the write position.
    ///
    /// Only the current end of the array is accepted.
    pub fn set_position(&mut self, position: u64) -> Result<(), Error> {
        if position != self.array.len() {
            return Err(Error::Unsupported("repositioning a write-only channel"));
        }
        Ok(())
    }
}

impl io::Write for Channel<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.array.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
