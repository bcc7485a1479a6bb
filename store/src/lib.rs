//! Accumulate, address, and stream byte sequences that may outgrow a single buffer.
//!
//! Bytes are stored in a growing list of fixed-size segments rather than one contiguous
//! allocation. Appends never move data that was already written, segment sizes grow
//! geometrically so that the number of segments stays logarithmic in the total, and nothing
//! forces the contents into one buffer unless asked to.
//!
//! Three surfaces are built on the same engine ([Segments]):
//!
//! * [Sink]: append-only, refuses to grow past the 32-bit contiguous limit, so it can always be
//!   materialized.
//! * [MemorySink]: append-only and unbounded. Oversized contents are streamed out with
//!   [MemorySink::write_to] or [MemorySink::reader] instead of materialized.
//! * [ByteArray]: unbounded with `O(log segments)` random reads and writes, plus a write-only
//!   [Channel] view.
//!
//! Stores are single-writer. Wrap one in [Shared] to append from several threads.
//!
//! # Example
//!
//! ```rust
//! use membuf_store::{ByteArray, Error};
//!
//! let mut array = ByteArray::with_capacity(4).unwrap();
//! for i in 0..100u8 {
//!     array.push(i);
//! }
//! assert_eq!(array.get(50).unwrap(), 50);
//! assert_eq!(array.set(50, 200).unwrap(), 50);
//! assert_eq!(array.get(50).unwrap(), 200);
//! assert!(matches!(array.get(100), Err(Error::OutOfBounds(100, 100))));
//!
//! let mut out = Vec::new();
//! array.write_to(&mut out).unwrap();
//! assert_eq!(out.len(), 100);
//! ```
//!
//! # Status
//!
//! `membuf-store` is **ALPHA** software and is not yet recommended for production use. Developers
//! should expect breaking changes and occasional instability.

mod array;
mod channel;
mod config;
mod error;
mod growth;
mod index;
mod memory;
mod reader;
mod segments;
mod shared;
mod sink;

pub use array::ByteArray;
pub use channel::Channel;
pub use config::{Config, DEFAULT_INITIAL_CAPACITY, MAX_CONTIGUOUS_LEN, MINIMUM_SEGMENT_SIZE};
pub use error::Error;
pub(crate) use error::check_range;
pub use growth::{Allocation, Growth, ESCALATION, INITIAL_SLOTS, RAPID_EXPANSION};
pub use index::{Index, Offsets, Unindexed};
pub use memory::MemorySink;
pub use reader::Reader;
pub use segments::{Location, Segments};
pub use shared::{Append, Shared};
pub use sink::Sink;
