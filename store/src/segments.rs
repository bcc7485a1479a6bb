//! The segment store shared by every surface.
//!
//! # Layout
//!
//! Bytes live in a sequence of fixed-capacity segments. Every segment except the last is
//! "completed" (entirely filled); the last is "open" and holds `open_count` valid bytes:
//!
//! ```text
//! completed[0]       completed[1]               open
//! +--------+ +------------------------+ +--------------------------+
//! |########| |########################| |#########.................|
//! +--------+ +------------------------+ +--------------------------+
//! 0        8                         72        ^ open_count
//! ```
//!
//! Segments are never resized or moved once allocated. When a write does not fit into the open
//! segment, the prefix that fits is copied, the open segment is completed, and exactly one new
//! segment sized by [crate::growth::Growth] receives the remainder. Every byte is copied once.
//!
//! # Random Access
//!
//! A store built with [Offsets] records the start of each completed segment, allowing
//! [Segments::get] and [Segments::set] to find any position with a binary search.

use crate::{
    config::{DEFAULT_INITIAL_CAPACITY, MINIMUM_SEGMENT_SIZE},
    growth::Growth,
    index::{Index, Offsets, Unindexed},
    reader::Reader,
    Error,
};
use bytes::{Buf, Bytes};
use std::{fmt, io, iter};
use tracing::{debug, trace};

/// Position of a byte within a [Segments] store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    /// Byte `offset` of completed segment `segment`.
    Completed { segment: usize, offset: usize },
    /// Byte `offset` of the open segment.
    Open(usize),
}

/// An ordered collection of byte segments that grows without copying prior content.
pub struct Segments<I: Index = Unindexed> {
    /// Filled segments, in write order.
    completed: Vec<Box<[u8]>>,
    /// Sum of the capacities of `completed`.
    completed_len: u64,
    /// The segment receiving new bytes.
    open: Box<[u8]>,
    /// Number of valid bytes in `open`.
    open_count: usize,
    /// Sizing policy for new segments.
    growth: Growth,
    /// Start offsets of `completed` (if tracked).
    index: I,
}

fn allocate(capacity: usize) -> Box<[u8]> {
    vec![0u8; capacity].into_boxed_slice()
}

impl<I: Index> Default for Segments<I> {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPACITY)
    }
}

impl<I: Index> fmt::Debug for Segments<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segments")
            .field("len", &self.len())
            .field("completed", &self.completed.len())
            .field("open_capacity", &self.open.len())
            .field("minimum", &self.growth.minimum())
            .finish()
    }
}

impl<I: Index> Segments<I> {
    /// Creates an empty store whose first segment holds `initial_capacity` bytes.
    ///
    /// Capacities below [MINIMUM_SEGMENT_SIZE] are clamped up.
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(MINIMUM_SEGMENT_SIZE);
        Self {
            completed: Vec::new(),
            completed_len: 0,
            open: allocate(capacity),
            open_count: 0,
            growth: Growth::new(capacity),
            index: I::default(),
        }
    }

    /// Returns the number of bytes stored.
    pub fn len(&self) -> u64 {
        self.completed_len.saturating_add(self.open_count as u64)
    }

    /// Returns whether no bytes are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of completed segments.
    pub fn completed_segments(&self) -> usize {
        self.completed.len()
    }

    /// Returns the capacity of the open segment.
    pub fn open_capacity(&self) -> usize {
        self.open.len()
    }

    /// Returns the current floor capacity for new segments.
    pub fn minimum_segment_size(&self) -> usize {
        self.growth.minimum()
    }

    /// Completes the (full) open segment and opens a new one that can hold `extra` bytes.
    fn roll(&mut self, extra: usize) {
        debug_assert_eq!(self.open_count, self.open.len());
        let (growth, allocation) = self.growth.next(self.completed.len(), extra);
        if allocation.slots != self.growth.slots() {
            self.completed
                .reserve_exact(allocation.slots.saturating_sub(self.completed.len()));
            self.index.reserve(allocation.slots);
            trace!(slots = allocation.slots, "reserved segment slots");
        }
        self.growth = growth;

        let full = std::mem::replace(&mut self.open, allocate(allocation.segment));
        self.index.push(self.completed_len);
        self.completed_len = self.completed_len.saturating_add(full.len() as u64);
        self.completed.push(full);
        self.open_count = 0;
        debug!(
            capacity = allocation.segment,
            completed = self.completed.len(),
            minimum = growth.minimum(),
            "allocated segment"
        );
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) {
        if self.open_count == self.open.len() {
            self.roll(1);
        }
        self.open[self.open_count] = byte;
        self.open_count += 1;
    }

    /// Appends `bytes`, allocating at most one new segment.
    pub fn append(&mut self, bytes: &[u8]) {
        let room = self.open.len() - self.open_count;
        if bytes.len() <= room {
            self.open[self.open_count..self.open_count + bytes.len()].copy_from_slice(bytes);
            self.open_count += bytes.len();
            return;
        }

        // Fill the open segment and spill the remainder into one new segment
        let (head, tail) = bytes.split_at(room);
        self.open[self.open_count..].copy_from_slice(head);
        self.open_count = self.open.len();
        self.roll(tail.len());
        self.open[..tail.len()].copy_from_slice(tail);
        self.open_count = tail.len();
    }

    /// Appends every remaining byte of `buf`, allocating at most one new segment.
    pub fn append_buf(&mut self, mut buf: impl Buf) {
        while buf.has_remaining() && self.open_count < self.open.len() {
            let chunk = buf.chunk();
            let n = chunk.len().min(self.open.len() - self.open_count);
            self.open[self.open_count..self.open_count + n].copy_from_slice(&chunk[..n]);
            self.open_count += n;
            buf.advance(n);
        }
        if !buf.has_remaining() {
            return;
        }

        let remaining = buf.remaining();
        self.roll(remaining);
        buf.copy_to_slice(&mut self.open[..remaining]);
        self.open_count = remaining;
    }

    /// Appends everything `reader` produces until it reports end-of-file, returning the number of
    /// bytes appended.
    ///
    /// Bytes read before an error remain appended.
    pub fn read_from<R: io::Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<u64> {
        let mut total = 0u64;
        loop {
            match reader.read(self.spare_mut()) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    self.commit(n);
                    total = total.saturating_add(n as u64);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns the unused tail of the open segment, opening a new segment if it is full.
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        if self.open_count == self.open.len() {
            self.roll(1);
        }
        &mut self.open[self.open_count..]
    }

    /// Marks `n` bytes of [Segments::spare_mut] as written.
    pub(crate) fn commit(&mut self, n: usize) {
        assert!(
            n <= self.open.len() - self.open_count,
            "cannot commit past end of segment"
        );
        self.open_count += n;
    }

    /// Returns the valid bytes of segment `segment`, where the segment after the last completed
    /// one is the open segment. Segments past the open one are empty.
    pub(crate) fn segment(&self, segment: usize) -> &[u8] {
        match segment.cmp(&self.completed.len()) {
            std::cmp::Ordering::Less => &self.completed[segment],
            std::cmp::Ordering::Equal => &self.open[..self.open_count],
            std::cmp::Ordering::Greater => &[],
        }
    }

    /// Iterates over the stored bytes one segment at a time, in order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.completed
            .iter()
            .map(|segment| &segment[..])
            .chain(iter::once(&self.open[..self.open_count]))
            .filter(|chunk| !chunk.is_empty())
    }

    /// Copies every stored byte into one contiguous buffer.
    ///
    /// Returns [Error::CapacityExceeded] if more than `max` bytes are stored.
    pub fn to_vec(&self, max: u64) -> Result<Vec<u8>, Error> {
        let len = self.len();
        if len > max {
            debug!(len, max, "refusing to materialize");
            return Err(Error::CapacityExceeded(len, max));
        }
        let len = usize::try_from(len).map_err(|_| Error::CapacityExceeded(len, max))?;
        Ok(self.concat(len))
    }

    /// Copies every stored byte into a buffer preallocated for `len` bytes.
    pub(crate) fn concat(&self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Copies every stored byte into one contiguous [Bytes].
    pub fn to_bytes(&self, max: u64) -> Result<Bytes, Error> {
        self.to_vec(max).map(Bytes::from)
    }

    /// Writes every stored byte to `sink`, one segment at a time, without materializing them.
    ///
    /// A failure from `sink` is returned unchanged and no further segments are written.
    pub fn write_to<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        for chunk in self.chunks() {
            sink.write_all(chunk)?;
        }
        Ok(())
    }

    /// Returns a sequential reader over the stored bytes.
    pub fn reader(&self) -> Reader<'_, I> {
        Reader::new(self)
    }

    /// Drops all completed segments and rewinds the open segment.
    ///
    /// The growth policy is retained: segments allocated after a clear are at least as large as
    /// those allocated before it.
    pub fn clear(&mut self) {
        debug!(
            len = self.len(),
            completed = self.completed.len(),
            "cleared segments"
        );
        self.completed.clear();
        self.completed_len = 0;
        self.open_count = 0;
        self.index.clear();
    }
}

impl Segments<Offsets> {
    /// Returns where the byte at `position` is stored.
    pub fn locate(&self, position: u64) -> Result<Location, Error> {
        let len = self.len();
        if position >= len {
            return Err(Error::OutOfBounds(position, len));
        }
        if position >= self.completed_len {
            let offset = (position - self.completed_len) as usize;
            return Ok(Location::Open(offset));
        }
        let (segment, start) = self
            .index
            .find(position)
            .ok_or(Error::OutOfBounds(position, len))?;
        Ok(Location::Completed {
            segment,
            offset: (position - start) as usize,
        })
    }

    /// Returns the byte at `position`.
    pub fn get(&self, position: u64) -> Result<u8, Error> {
        Ok(match self.locate(position)? {
            Location::Completed { segment, offset } => self.completed[segment][offset],
            Location::Open(offset) => self.open[offset],
        })
    }

    /// Replaces the byte at `position` with `value`, returning the previous byte.
    pub fn set(&mut self, position: u64, value: u8) -> Result<u8, Error> {
        let slot = match self.locate(position)? {
            Location::Completed { segment, offset } => &mut self.completed[segment][offset],
            Location::Open(offset) => &mut self.open[offset],
        };
        Ok(std::mem::replace(slot, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::INITIAL_SLOTS;
    use bytes::Buf;
    use membuf_macros::test_traced;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use test_case::test_case;

    /// Checks the structural invariants every store must uphold.
    fn assert_consistent<I: Index>(segments: &Segments<I>) {
        let completed: u64 = segments.completed.iter().map(|s| s.len() as u64).sum();
        assert_eq!(segments.completed_len, completed);
        assert!(segments.open_count <= segments.open.len());
        assert_eq!(segments.len(), completed + segments.open_count as u64);
    }

    fn assert_offsets(segments: &Segments<Offsets>) {
        assert_eq!(segments.index.len(), segments.completed.len());
        let mut start = 0u64;
        for (i, segment) in segments.completed.iter().enumerate() {
            assert_eq!(segments.index.start(i), Some(start));
            start += segment.len() as u64;
        }
    }

    #[test_traced]
    fn test_empty() {
        let segments = Segments::<Unindexed>::default();
        assert!(segments.is_empty());
        assert_eq!(segments.open_capacity(), DEFAULT_INITIAL_CAPACITY);
        assert_eq!(segments.chunks().count(), 0);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), Vec::<u8>::new());
    }

    #[test_case(0, MINIMUM_SEGMENT_SIZE; "zero clamped")]
    #[test_case(4, MINIMUM_SEGMENT_SIZE; "small clamped")]
    #[test_case(100, 100; "large kept")]
    fn test_initial_capacity(requested: usize, expected: usize) {
        let segments = Segments::<Unindexed>::new(requested);
        assert_eq!(segments.open_capacity(), expected);
        assert_eq!(segments.minimum_segment_size(), expected);
    }

    #[test_traced]
    fn test_first_overflow() {
        // Write 20 bytes into a store with an 8 byte segment
        let mut segments = Segments::<Unindexed>::new(8);
        let data: Vec<u8> = (0..20).collect();
        segments.append(&data);

        // The minimum escalates to 64 and the overflow lands in one segment
        assert_eq!(segments.len(), 20);
        assert_eq!(segments.completed_segments(), 1);
        assert_eq!(segments.open_capacity(), 64);
        assert_eq!(segments.minimum_segment_size(), 64);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), data);
        assert_consistent(&segments);
    }

    #[test_case(5, 10; "overflow below minimum")]
    #[test_case(5, 100; "overflow above minimum")]
    #[test_case(0, 1_000_000; "huge write into empty store")]
    fn test_single_segment_overflow(prefill: usize, len: usize) {
        let mut segments = Segments::<Offsets>::new(8);
        segments.append(&vec![1u8; prefill]);
        let room = segments.open_capacity() - prefill;
        assert!(len > room);

        // One write allocates exactly one segment sized for the overflow
        segments.append(&vec![2u8; len]);
        assert_eq!(segments.completed_segments(), 1);
        let expected = segments.minimum_segment_size().max(len - room);
        assert_eq!(segments.open_capacity(), expected);
        assert_eq!(segments.len(), (prefill + len) as u64);
        assert_consistent(&segments);
        assert_offsets(&segments);
    }

    #[test_traced]
    fn test_exact_fill_does_not_roll() {
        let mut segments = Segments::<Unindexed>::new(8);
        segments.append(&[7u8; 8]);
        assert_eq!(segments.completed_segments(), 0);

        // The next byte rolls over
        segments.push(8);
        assert_eq!(segments.completed_segments(), 1);
        assert_eq!(segments.len(), 9);
        assert_eq!(
            segments.to_vec(u64::MAX).unwrap(),
            vec![7, 7, 7, 7, 7, 7, 7, 7, 8]
        );
    }

    #[test_traced]
    fn test_chunking_invariance() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut expected = Vec::new();
        let mut segments = Segments::<Offsets>::new(8);
        for _ in 0..2_000 {
            let len = match rng.gen_range(0..10) {
                0 => 0,
                1..=6 => rng.gen_range(1..16),
                7 | 8 => rng.gen_range(16..512),
                _ => rng.gen_range(512..8_192),
            };
            let chunk: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            if len == 1 && rng.gen_bool(0.5) {
                segments.push(chunk[0]);
            } else {
                segments.append(&chunk);
            }
            expected.extend_from_slice(&chunk);
        }
        assert_eq!(segments.len(), expected.len() as u64);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), expected);
        assert_consistent(&segments);
        assert_offsets(&segments);

        // Exhausting the initial slots escalated the minimum segment size
        assert!(segments.completed_segments() > INITIAL_SLOTS);
        assert!(segments.minimum_segment_size() >= 256);

        // Random access agrees with the materialized copy
        for _ in 0..1_000 {
            let position = rng.gen_range(0..expected.len());
            assert_eq!(
                segments.get(position as u64).unwrap(),
                expected[position]
            );
        }
    }

    #[test_traced]
    fn test_append_buf() {
        let mut segments = Segments::<Unindexed>::new(8);
        segments.append(&[0u8; 6]);

        // A chained buffer spanning the open segment and beyond
        let first = &[1u8; 5][..];
        let second = &[2u8; 30][..];
        segments.append_buf(first.chain(second));
        assert_eq!(segments.len(), 41);
        assert_eq!(segments.completed_segments(), 1);
        assert_eq!(segments.open_capacity(), 64);

        let mut expected = vec![0u8; 6];
        expected.extend_from_slice(first);
        expected.extend_from_slice(second);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), expected);

        // A buffer larger than the minimum still takes one segment
        segments.append_buf(&vec![3u8; 500][..]);
        assert_eq!(segments.completed_segments(), 2);
        assert_eq!(segments.open_capacity(), 500 - (64 - 33));
        assert_consistent(&segments);
    }

    /// Hands out at most `step` bytes per read, interrupting every other call.
    struct Trickle {
        data: Vec<u8>,
        position: usize,
        step: usize,
        interrupt: bool,
    }

    impl io::Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(self.step).min(self.data.len() - self.position);
            buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
            self.position += n;
            Ok(n)
        }
    }

    #[test_traced]
    fn test_read_from() {
        let data: Vec<u8> = (0..1_000u32).map(|i| i as u8).collect();
        let mut source = Trickle {
            data: data.clone(),
            position: 0,
            step: 7,
            interrupt: false,
        };
        let mut segments = Segments::<Unindexed>::new(8);
        segments.push(255);
        let read = segments.read_from(&mut source).unwrap();
        assert_eq!(read, 1_000);

        let mut expected = vec![255];
        expected.extend_from_slice(&data);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), expected);
        assert_consistent(&segments);
    }

    #[test_traced]
    fn test_read_from_error_keeps_prefix() {
        let mut source = io::Read::chain(io::Cursor::new(vec![9u8; 10]), FailingReader);
        let mut segments = Segments::<Unindexed>::new(8);
        let err = segments.read_from(&mut source).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), vec![9u8; 10]);
    }

    struct FailingReader;

    impl io::Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    /// Accepts `budget` bytes and then fails, recording the size of every write.
    struct LimitedSink {
        received: Vec<u8>,
        writes: Vec<usize>,
        budget: usize,
    }

    impl io::Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            let n = buf.len().min(self.budget);
            self.received.extend_from_slice(&buf[..n]);
            self.writes.push(n);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test_traced]
    fn test_write_to() {
        let mut segments = Segments::<Unindexed>::new(8);
        let data: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();
        for chunk in data.chunks(13) {
            segments.append(chunk);
        }

        // Transfer matches materialization, one write per segment
        let mut sink = LimitedSink {
            received: Vec::new(),
            writes: Vec::new(),
            budget: usize::MAX,
        };
        segments.write_to(&mut sink).unwrap();
        assert_eq!(sink.received, segments.to_vec(u64::MAX).unwrap());
        let sizes: Vec<usize> = segments.chunks().map(<[u8]>::len).collect();
        assert_eq!(sink.writes, sizes);
    }

    #[test_traced]
    fn test_write_to_failure_stops() {
        let mut segments = Segments::<Unindexed>::new(8);
        segments.append(&[1u8; 100]);

        // The sink fails partway: delivered bytes stay delivered
        let mut sink = LimitedSink {
            received: Vec::new(),
            writes: Vec::new(),
            budget: 10,
        };
        let err = segments.write_to(&mut sink).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert_eq!(sink.received, vec![1u8; 10]);

        // The store is unchanged
        assert_eq!(segments.len(), 100);
    }

    #[test_traced]
    fn test_to_vec_capacity_exceeded() {
        let mut segments = Segments::<Unindexed>::new(8);
        segments.append(&[0u8; 20]);
        assert!(matches!(
            segments.to_vec(19),
            Err(Error::CapacityExceeded(20, 19))
        ));
        assert_eq!(segments.to_vec(20).unwrap().len(), 20);
        assert_eq!(segments.to_bytes(20).unwrap(), Bytes::from(vec![0u8; 20]));
    }

    #[test_traced]
    fn test_clear() {
        let mut segments = Segments::<Offsets>::new(8);
        segments.append(&[1u8; 100]);
        let minimum = segments.minimum_segment_size();
        segments.clear();

        assert!(segments.is_empty());
        assert_eq!(segments.completed_segments(), 0);
        assert!(segments.get(0).is_err());
        assert_eq!(segments.minimum_segment_size(), minimum);
        assert_consistent(&segments);
        assert_offsets(&segments);

        // Reusable after clear
        segments.append(&[2u8; 500]);
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), vec![2u8; 500]);
        assert!(segments.minimum_segment_size() >= minimum);
        assert_offsets(&segments);
    }

    #[test_traced]
    fn test_random_access() {
        // Append 0..100 one byte at a time into a store with a small initial hint
        let mut segments = Segments::<Offsets>::new(4);
        for i in 0..100u8 {
            segments.push(i);
        }
        assert_eq!(segments.len(), 100);
        assert_eq!(
            segments.to_vec(u64::MAX).unwrap(),
            (0..100u8).collect::<Vec<_>>()
        );
        assert_offsets(&segments);

        // Mutate a single byte
        assert_eq!(segments.get(50).unwrap(), 50);
        assert_eq!(segments.set(50, 200).unwrap(), 50);
        assert_eq!(segments.get(50).unwrap(), 200);
        for i in (0..100u8).filter(|&i| i != 50) {
            assert_eq!(segments.get(i as u64).unwrap(), i);
        }
    }

    #[test_traced]
    fn test_locate() {
        let mut segments = Segments::<Offsets>::new(8);
        segments.append(&[0u8; 8]);
        segments.append(&[1u8; 60]);
        segments.append(&[2u8; 10]);

        // 8 bytes in the first segment, 64 in the second, 6 in the open one
        assert_eq!(
            segments.locate(0).unwrap(),
            Location::Completed {
                segment: 0,
                offset: 0
            }
        );
        assert_eq!(
            segments.locate(8).unwrap(),
            Location::Completed {
                segment: 1,
                offset: 0
            }
        );
        assert_eq!(
            segments.locate(71).unwrap(),
            Location::Completed {
                segment: 1,
                offset: 63
            }
        );
        assert_eq!(segments.locate(72).unwrap(), Location::Open(0));
        assert_eq!(segments.locate(77).unwrap(), Location::Open(5));
    }

    #[test_traced]
    fn test_out_of_bounds() {
        let mut segments = Segments::<Offsets>::new(8);
        assert!(matches!(segments.get(0), Err(Error::OutOfBounds(0, 0))));

        segments.append(&[5u8; 10]);
        assert!(matches!(segments.get(10), Err(Error::OutOfBounds(10, 10))));
        assert!(matches!(
            segments.set(10, 1),
            Err(Error::OutOfBounds(10, 10))
        ));
        assert!(matches!(
            segments.set(u64::MAX, 1),
            Err(Error::OutOfBounds(u64::MAX, 10))
        ));

        // Nothing changed
        assert_eq!(segments.to_vec(u64::MAX).unwrap(), vec![5u8; 10]);
    }
}
