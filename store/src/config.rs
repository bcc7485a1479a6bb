//! Configuration shared by every byte store surface.

use crate::Error;

/// Segments are never allocated with less capacity than this.
pub const MINIMUM_SEGMENT_SIZE: usize = 8;

/// Capacity of the first segment when none is requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 32;

/// Largest number of bytes that may be materialized into one contiguous buffer by default.
///
/// This is the 32-bit signed limit that the legacy `size() -> u32` contract is built around.
pub const MAX_CONTIGUOUS_LEN: u64 = i32::MAX as u64;

/// Configuration for a byte store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the first segment. Values below [MINIMUM_SEGMENT_SIZE] are clamped up.
    pub initial_capacity: usize,

    /// Largest number of bytes that can be materialized into a single contiguous buffer.
    ///
    /// For [crate::Sink], this is also the most bytes the sink will accept.
    pub max_contiguous: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_contiguous: MAX_CONTIGUOUS_LEN,
        }
    }
}

impl Config {
    /// Returns a default configuration with the given initial capacity.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Verifies the configuration describes a store that can hold at least one byte.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_contiguous == 0 || self.initial_capacity as u64 > self.max_contiguous {
            return Err(Error::InvalidCapacity(
                self.initial_capacity,
                self.max_contiguous,
            ));
        }
        Ok(())
    }
}
