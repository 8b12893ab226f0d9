use std::io;
use std::sync::RwLockReadGuard;

use crate::segment::Segment;

/// Reads the raw store bytes of every segment, one after another in base
/// offset order.
///
/// The stream consists of the frames of all records, i.e. for each record an
/// 8-byte big-endian length followed by the payload. It holds a shared lock
/// on the segment list: appends wait until the reader is dropped.
pub struct LogReader<'a> {
    segments: RwLockReadGuard<'a, Vec<Segment>>,

    /// Index of the segment being read.
    current: usize,

    /// Byte position in the store of the current segment.
    position: u64,
}

impl<'a> LogReader<'a> {
    pub(crate) fn new(segments: RwLockReadGuard<'a, Vec<Segment>>) -> Self {
        Self {
            segments,
            current: 0,
            position: 0,
        }
    }
}

impl io::Read for LogReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.current < self.segments.len() {
            let segment = &self.segments[self.current];
            let n = segment.read_store_at(buf, self.position)?;

            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }

            self.current += 1;
            self.position = 0;
        }

        Ok(0)
    }
}
