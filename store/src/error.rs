//! Error types for byte store operations

use std::io::{Error as IoError, ErrorKind};
use thiserror::Error;

/// Error type for byte store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid capacity: {0} > {1}")]
    InvalidCapacity(usize, u64), // requested, max
    #[error("index out of bounds: {0} >= {1}")]
    OutOfBounds(u64, u64), // index, size
    #[error("invalid range: {0} + {1} > {2}")]
    InvalidRange(usize, usize, usize), // offset, length, available
    #[error("capacity exceeded: {0} > {1}")]
    CapacityExceeded(u64, u64), // size, max
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl From<Error> for IoError {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::InvalidCapacity(..) | Error::InvalidRange(..) => ErrorKind::InvalidInput,
            Error::OutOfBounds(..) => ErrorKind::UnexpectedEof,
            Error::CapacityExceeded(..) => ErrorKind::OutOfMemory,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::InvalidUtf8(_) => ErrorKind::InvalidData,
        };
        IoError::new(kind, err)
    }
}

/// Checks that `offset..offset + len` lies within a buffer of `available` bytes.
pub(crate) fn check_range(offset: usize, len: usize, available: usize) -> Result<(), Error> {
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(()),
        _ => Err(Error::InvalidRange(offset, len, available)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(2, 3, 5).is_ok());
        assert!(matches!(
            check_range(3, 3, 5),
            Err(Error::InvalidRange(3, 3, 5))
        ));

        // Overflowing end is rejected rather than wrapped
        assert!(matches!(
            check_range(usize::MAX, 1, 5),
            Err(Error::InvalidRange(usize::MAX, 1, 5))
        ));
    }

    #[test]
    fn test_io_error_kind() {
        let err: IoError = Error::CapacityExceeded(10, 5).into();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert_eq!(err.to_string(), "capacity exceeded: 10 > 5");

        let err: IoError = Error::Unsupported("seek").into();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err: IoError = Error::InvalidRange(1, 2, 0).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
