// SPDX-License-Identifier: MIT OR Apache-2.0
//! Match quality scores for overload resolution.

use std::fmt;

/// Quality of a type-coercion match: an integer mismatch where `-1` is an
/// exact match, `0` a compatible one, and higher values are weaker.
///
/// Per-parameter matches combine with [`ObjectMatch::max`]: the worst
/// parameter decides the candidate's overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectMatch(i32);

impl ObjectMatch {
    /// Exact match: the JSON shape is the natural encoding of the target.
    pub const EXACT: Self = Self(-1);
    /// Compatible: convertible without information loss.
    pub const OKAY: Self = Self(0);
    /// Weaker coercion, e.g. a string parsed into a numeric target.
    pub const SIMILAR: Self = Self(1);

    /// A custom mismatch level.
    #[must_use]
    pub fn new(mismatch: i32) -> Self {
        Self(mismatch)
    }

    /// The raw mismatch value; lower is better.
    #[must_use]
    pub fn mismatch(self) -> i32 {
        self.0
    }

    /// Combine two matches; the worse (higher) one wins.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 { other } else { self }
    }
}

impl fmt::Display for ObjectMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EXACT => f.write_str("exact"),
            Self::OKAY => f.write_str("okay"),
            Self::SIMILAR => f.write_str("similar"),
            Self(n) => write!(f, "mismatch({n})"),
        }
    }
}
