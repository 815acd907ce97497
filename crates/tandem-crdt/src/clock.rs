//! Timestamps for last-writer-wins ordering.
//!
//! The engine only ever *compares* timestamps; callers decide where they come
//! from. [`Clock`] is the helper replicas use for local edits.

use std::sync::atomic::{AtomicI64, Ordering};

/// An LWW timestamp. Larger wins; equal timestamps are legal and resolved by
/// each structure's tie rule.
pub type Timestamp = i64;

/// A strictly increasing wall-clock timestamp source.
///
/// Readings are microseconds since the Unix epoch. Every reading is greater
/// than any timestamp previously issued or [observed](Clock::observe): if the
/// wall clock stalls, steps back, or trails a remote replica, the clock issues
/// one past the highest value seen so far.
///
/// # Example
///
/// ```rust
/// use tandem_crdt::Clock;
///
/// let clock = Clock::new();
/// let a = clock.now();
/// let b = clock.now();
/// assert!(b >= a);
///
/// // A remote edit far in the future pulls local time forward.
/// clock.observe(a + 1_000_000_000);
/// assert!(clock.now() >= a + 1_000_000_000);
/// ```
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicI64,
}

impl Clock {
    /// Creates a clock that has issued nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Creates a clock that never issues anything below `floor`.
    #[must_use]
    pub const fn with_floor(floor: Timestamp) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    /// Returns the next timestamp for a local edit, never equal to an earlier one.
    pub fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp_micros();
        let next = |last: Timestamp| wall.max(last.saturating_add(1));
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(next(last)))
        {
            Ok(previous) | Err(previous) => next(previous),
        }
    }

    /// Folds a timestamp seen on a remote mutation into the clock. Only
    /// raises the floor; the next [`now`](Clock::now) is strictly above it.
    pub fn observe(&self, remote: Timestamp) {
        self.last.fetch_max(remote, Ordering::AcqRel);
    }

    /// The highest timestamp issued or observed so far.
    #[must_use]
    pub fn last(&self) -> Timestamp {
        self.last.load(Ordering::Acquire)
    }
}
