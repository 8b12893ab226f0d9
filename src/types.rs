pub use codeq::config::Crc32fast;

/// Byte range `[offset, offset + size)` of a frame in a store file.
///
/// Frames carry no checksum; the `Crc32fast` parameter only selects a
/// `codeq::Segment` type and is never used to verify data.
pub type Span = codeq::Segment<Crc32fast>;

/// A record together with the offset it is stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub offset: u64,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(offset: u64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            value: value.into(),
        }
    }
}
