use std::io;

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

/// Number of bytes of the relative offset of an entry.
pub const OFFSET_WIDTH: u64 = 4;

/// Number of bytes of the store position of an entry.
pub const POSITION_WIDTH: u64 = 8;

/// Number of bytes of one index entry.
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// Maps the record at `relative_offset` in a segment to the position of its
/// frame in the segment store.
///
/// Encoded as:
/// - 4 bytes: big-endian relative offset
/// - 8 bytes: big-endian store position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub relative_offset: u32,
    pub position: u64,
}

impl Entry {
    pub fn new(relative_offset: u32, position: u64) -> Self {
        Self {
            relative_offset,
            position,
        }
    }
}

impl codeq::Encode for Entry {
    fn encode<W: io::Write>(&self, mut w: W) -> Result<usize, io::Error> {
        w.write_u32::<BigEndian>(self.relative_offset)?;
        w.write_u64::<BigEndian>(self.position)?;
        Ok(ENTRY_WIDTH as usize)
    }
}

impl codeq::Decode for Entry {
    fn decode<R: io::Read>(mut r: R) -> Result<Self, io::Error> {
        let relative_offset = r.read_u32::<BigEndian>()?;
        let position = r.read_u64::<BigEndian>()?;
        Ok(Self {
            relative_offset,
            position,
        })
    }
}
