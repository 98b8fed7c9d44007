//! Lineage intervals for edge endpoints.
//!
//! An edge version is the active connector on one side of an edge from the
//! node version at which it started until the node version that displaced
//! it. This mirrors a valid-time range, but over a node's version lineage
//! instead of a clock:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `start` | First node version this edge version connects (inclusive) |
//! | `end` | Node version after which another edge version took over, `None` while open |
//!
//! On storage an open end is encoded as [`OPEN_END`].

use crate::models::VersionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage encoding of an open interval end.
pub const OPEN_END: i64 = -1;

/// Interval over one node's version lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageInterval {
    /// Node version at which the interval starts.
    pub start: VersionId,
    /// Node version at which the interval was closed, `None` while open.
    pub end: Option<VersionId>,
}

impl LineageInterval {
    /// Creates an open interval starting at `start`.
    #[must_use]
    pub const fn open(start: VersionId) -> Self {
        Self { start, end: None }
    }

    /// Creates a closed interval.
    #[must_use]
    pub const fn between(start: VersionId, end: VersionId) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Decodes an interval from its stored `(start, end)` columns.
    #[must_use]
    pub const fn from_stored(start: i64, end: i64) -> Self {
        Self {
            start: VersionId::new(start),
            end: if end == OPEN_END {
                None
            } else {
                Some(VersionId::new(end))
            },
        }
    }

    /// Returns the stored encoding of the end.
    #[must_use]
    pub const fn stored_end(&self) -> i64 {
        match self.end {
            Some(end) => end.get(),
            None => OPEN_END,
        }
    }

    /// Returns `true` while no later edge version has displaced this one.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Closes the interval at `end`.
    #[must_use]
    pub const fn close_at(self, end: VersionId) -> Self {
        Self {
            start: self.start,
            end: Some(end),
        }
    }
}

impl fmt::Display for LineageInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {end}]", self.start),
            None => write!(f, "[{}, open)", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_encoding() {
        let open = LineageInterval::from_stored(5, OPEN_END);
        assert!(open.is_open());
        assert_eq!(open.stored_end(), -1);

        let closed = LineageInterval::from_stored(5, 9);
        assert_eq!(closed.end, Some(VersionId::new(9)));
        assert_eq!(closed.stored_end(), 9);
    }

    #[test]
    fn test_close_at() {
        let interval = LineageInterval::open(VersionId::new(1)).close_at(VersionId::new(4));
        assert_eq!(interval, LineageInterval::between(VersionId::new(1), VersionId::new(4)));
        assert!(!interval.is_open());
    }

    #[test]
    fn test_display() {
        assert_eq!(LineageInterval::open(VersionId::new(3)).to_string(), "[3, open)");
        assert_eq!(
            LineageInterval::between(VersionId::new(3), VersionId::new(8)).to_string(),
            "[3, 8]"
        );
    }
}
