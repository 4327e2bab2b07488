//! Document identities and their allocator.
//!
//! A [`DocumentId`] names one rendered-document lifetime. The lowest three
//! values are reserved sentinels; everything the allocator hands out sits
//! above them, wrapping back to [`DocumentId::FIRST_ALLOCATED`] on overflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of one rendered-document lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u32);

impl DocumentId {
    /// No document / invalid.
    pub const UNKNOWN: Self = Self(0);
    /// The document currently displayed, or the latest one if none is displayed.
    pub const CURRENT: Self = Self(1);
    /// The most recently started document.
    pub const LATEST: Self = Self(2);
    /// First value handed out by the allocator.
    pub const FIRST_ALLOCATED: Self = Self(3);

    /// Wrap a raw identifier.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// True for `UNKNOWN`, `CURRENT` and `LATEST`.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_ALLOCATED.0
    }

    /// True when the id needs resolving against recorder state.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::CURRENT.0 || self.0 == Self::LATEST.0
    }

    /// Whether `self` lies in the half-open window `[start, end)`.
    ///
    /// When `end <= start` the allocator has wrapped and the window is
    /// `[start, MAX] ∪ [0, end)`.
    #[must_use]
    pub const fn is_within(self, start: Self, end: Self) -> bool {
        if start.0 < end.0 {
            self.0 >= start.0 && self.0 < end.0
        } else {
            self.0 >= start.0 || self.0 < end.0
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => formatter.write_str("unknown"),
            Self::CURRENT => formatter.write_str("current"),
            Self::LATEST => formatter.write_str("latest"),
            Self(raw) => write!(formatter, "{raw}"),
        }
    }
}

/// Monotonic allocator for [`DocumentId`]s.
#[derive(Debug, Clone)]
pub struct DocumentIdAllocator {
    next: u32,
}

impl Default for DocumentIdAllocator {
    fn default() -> Self {
        Self {
            next: DocumentId::FIRST_ALLOCATED.0,
        }
    }
}

impl DocumentIdAllocator {
    /// Allocator whose next id is `raw` (clamped above the reserved range).
    #[must_use]
    pub const fn starting_at(raw: u32) -> Self {
        let next = if raw < DocumentId::FIRST_ALLOCATED.0 {
            DocumentId::FIRST_ALLOCATED.0
        } else {
            raw
        };
        Self { next }
    }

    /// Hand out the next id.
    pub const fn allocate(&mut self) -> DocumentId {
        let id = DocumentId(self.next);
        self.next = self.next.wrapping_add(1);
        if self.next < DocumentId::FIRST_ALLOCATED.0 {
            self.next = DocumentId::FIRST_ALLOCATED.0;
        }
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    #[must_use]
    pub const fn next_unallocated(&self) -> DocumentId {
        DocumentId(self.next)
    }
}
