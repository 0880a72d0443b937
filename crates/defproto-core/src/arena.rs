//! Bulk allocation capability backing descriptor conversions.
//!
//! Every allocation a conversion makes (output nodes, duplicated strings,
//! child slot arrays, the options round-trip buffers) is charged to an
//! [`Arena`] before the storage is created. Conversion output owns its
//! storage directly, so releasing "the arena" is dropping the returned root
//! node; the capability that lives here is metering and exhaustion
//! signalling.
//!
//! ## Extensibility
//!
//! [`Arena`] is a trait so callers can substitute their own allocation
//! policy, for example one that fails after a fixed number of allocations:
//!
//! ```
//! use defproto_core::Arena;
//! use std::cell::Cell;
//!
//! struct FailAfter(Cell<usize>);
//!
//! impl Arena for FailAfter {
//!     fn allocate(&self, _size: usize) -> bool {
//!         let remaining = self.0.get();
//!         self.0.set(remaining.saturating_sub(1));
//!         remaining > 0
//!     }
//! }
//! ```

use std::cell::Cell;

/// Allocation capability consulted before every allocation of a conversion.
pub trait Arena {
    /// Reserves `size` bytes from the arena.
    ///
    /// Returns `false` when the arena is exhausted, which aborts the whole
    /// conversion in progress.
    fn allocate(&self, size: usize) -> bool;
}

/// Metering arena with an optional byte budget.
///
/// Tracks the total bytes and the number of allocations charged to it. With
/// no budget it never fails; with [`MeteredArena::with_limit`] it reports
/// exhaustion once the budget would be exceeded.
#[derive(Debug, Default)]
pub struct MeteredArena {
    used: Cell<usize>,
    count: Cell<usize>,
    limit: Option<usize>,
}

impl MeteredArena {
    /// Creates an unbounded arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arena that fails once more than `limit` bytes are charged.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Returns the total bytes charged so far.
    pub fn bytes_used(&self) -> usize {
        self.used.get()
    }

    /// Returns the number of allocations charged so far.
    pub fn allocation_count(&self) -> usize {
        self.count.get()
    }
}

impl Arena for MeteredArena {
    fn allocate(&self, size: usize) -> bool {
        let used = self.used.get().saturating_add(size);
        if let Some(limit) = self.limit {
            if used > limit {
                return false;
            }
        }
        self.used.set(used);
        self.count.set(self.count.get() + 1);
        true
    }
}
