//! Decide how large each new segment should be.
//!
//! [Growth] is a pure state transition: given the number of completed segments and how many bytes
//! a write could not fit into the open segment, [Growth::next] returns the next policy state and
//! the [Allocation] to perform. The caller owns the state and replaces it after allocating.
//!
//! Two knobs bound the number of segments created for large payloads:
//! - On the first rollover, the minimum segment size is multiplied by [RAPID_EXPANSION] so that
//!   small initial capacities do not produce a long tail of tiny segments.
//! - Whenever the segment index runs out of slots, the slot count doubles and the minimum segment
//!   size is multiplied by [ESCALATION], keeping the segment count roughly logarithmic in the
//!   total payload size.
//!
//! A new segment is always at least as large as the overflow of the write that triggered it, so a
//! single write never spans more than one new segment.

/// Multiplier applied to the minimum segment size on the first rollover.
pub const RAPID_EXPANSION: usize = 8;

/// Multiplier applied to the minimum segment size each time the index slots are exhausted.
pub const ESCALATION: usize = 4;

/// Number of index slots reserved on the first rollover.
pub const INITIAL_SLOTS: usize = 16;

/// State of the growth policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Growth {
    /// Floor capacity for new segments. Never decreases.
    minimum: usize,

    /// Number of completed segments the index can hold before it must grow.
    slots: usize,
}

/// Capacities chosen for a rollover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Capacity of the new open segment.
    pub segment: usize,

    /// Number of index slots that must be available after the rollover.
    pub slots: usize,
}

impl Growth {
    /// Creates a policy whose first segment had `minimum` capacity.
    pub const fn new(minimum: usize) -> Self {
        Self { minimum, slots: 0 }
    }

    /// Returns the current floor capacity for new segments.
    pub const fn minimum(&self) -> usize {
        self.minimum
    }

    /// Returns the number of index slots reserved so far.
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Returns the policy state after completing a segment when `completed` segments are already
    /// stored, along with the [Allocation] needed to hold `extra_required` more bytes.
    pub fn next(self, completed: usize, extra_required: usize) -> (Self, Allocation) {
        let mut next = self;
        if next.slots == 0 {
            next.minimum = next.minimum.saturating_mul(RAPID_EXPANSION);
            next.slots = INITIAL_SLOTS;
        } else if completed >= next.slots {
            next.slots = next.slots.saturating_mul(2);
            next.minimum = next.minimum.saturating_mul(ESCALATION);
        }
        let allocation = Allocation {
            segment: next.minimum.max(extra_required),
            slots: next.slots,
        };
        (next, allocation)
    }
}
