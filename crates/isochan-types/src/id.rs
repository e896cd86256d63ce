//! Identifier types.
//!
//! Unlike most identifiers in a distributed system, these are plain
//! integers: channels and contexts live inside one process, and channel
//! ids must be allocated in strictly increasing order so they are never
//! reused.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a channel.
///
/// Allocated by the channel registry in increasing order starting at 0.
/// An id is never handed out twice, even after its channel is destroyed.
///
/// # Example
///
/// ```
/// use isochan_types::ChannelId;
///
/// let first = ChannelId::FIRST;
/// let second = first.next().expect("id space not exhausted");
/// assert!(second > first);
/// assert_eq!(format!("{second}"), "chan:1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(i64);

impl ChannelId {
    /// The first id a registry hands out.
    pub const FIRST: Self = Self(0);

    /// Wraps a raw id, e.g. one received back from a host-language value.
    ///
    /// The id is not validated; looking it up may fail with a not-found
    /// error.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns the id following this one, or `None` on overflow.
    ///
    /// Allocation must fail rather than wrap, otherwise an id could be
    /// reused.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan:{}", self.0)
    }
}

/// Identifier of an isolated execution context.
///
/// Contexts (interpreters, isolates, actors) are owned by the host; the
/// channel layer only records which context sent an item and which
/// contexts are bound to each end of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(i64);

impl ContextId {
    /// Wraps a host-assigned context id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx:{}", self.0)
    }
}

/// Identifier of a queued item, unique within its channel.
///
/// A blocking sender keeps the id of its item so it can cancel the item
/// if the wait times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    /// Wraps a raw item sequence number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item:{}", self.0)
    }
}
