use std::fmt;
use std::ops::Deref;

use crate::num::format_pad_u64;

/// SegmentId is defined with the base offset of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentId({})", format_pad_u64(self.0))
    }
}

impl From<u64> for SegmentId {
    fn from(offset: u64) -> Self {
        SegmentId(offset)
    }
}

impl Deref for SegmentId {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SegmentId {
    /// Return the absolute offset of the first record in this segment.
    pub fn offset(&self) -> u64 {
        self.0
    }
}
