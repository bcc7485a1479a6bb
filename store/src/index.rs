//! Track where each completed segment starts.
//!
//! Append-only stores never address bytes by position and use [Unindexed]. Random-access stores
//! use [Offsets], which keeps the cumulative start offset of every completed segment so the segment
//! holding any position can be found with a binary search.

/// Bookkeeping kept in lockstep with a store's completed segments.
pub trait Index: Default {
    /// Records that a completed segment starting at `start` was appended.
    fn push(&mut self, start: u64);

    /// Ensures room for `slots` entries in total.
    fn reserve(&mut self, slots: usize);

    /// Forgets every entry.
    fn clear(&mut self);
}

/// An [Index] that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unindexed;

impl Index for Unindexed {
    #[inline]
    fn push(&mut self, _: u64) {}

    #[inline]
    fn reserve(&mut self, _: usize) {}

    #[inline]
    fn clear(&mut self) {}
}

/// An [Index] of cumulative segment start offsets.
///
/// `starts[i]` is the sum of the capacities of segments `0..i`, so `starts[0]` is always zero and
/// the entries are non-decreasing.
#[derive(Clone, Debug, Default)]
pub struct Offsets {
    starts: Vec<u64>,
}

impl Offsets {
    /// Returns the number of indexed segments.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Returns whether no segments are indexed.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Returns the start offset of segment `segment`.
    pub fn start(&self, segment: usize) -> Option<u64> {
        self.starts.get(segment).copied()
    }

    /// Returns the segment containing `position` (the one with the greatest start `<= position`)
    /// and that segment's start offset.
    ///
    /// The caller must ensure `position` is less than the total length of the indexed segments.
    pub fn find(&self, position: u64) -> Option<(usize, u64)> {
        let segment = self
            .starts
            .partition_point(|&start| start <= position)
            .checked_sub(1)?;
        Some((segment, self.starts[segment]))
    }
}

impl Index for Offsets {
    fn push(&mut self, start: u64) {
        debug_assert!(self.starts.last().map_or(true, |&last| last <= start));
        self.starts.push(start);
    }

    fn reserve(&mut self, slots: usize) {
        self.starts
            .reserve_exact(slots.saturating_sub(self.starts.len()));
    }

    fn clear(&mut self) {
        self.starts.clear();
    }
}
