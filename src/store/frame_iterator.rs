use std::io;

use codeq::error_context_ext::ErrorContextExt;
use codeq::Decode;

use crate::offset_reader::OffsetReader;
use crate::store::frame::Frame;
use crate::types::Span;
use crate::SegmentId;

/// Iterates the frames of a store file from the beginning, yielding the byte
/// range of each frame along with its payload.
///
/// Iteration stops after the first error.
pub(crate) struct FrameIterator<R> {
    r: OffsetReader<R>,
    total_size: u64,
    segment_id: SegmentId,
    error: Option<io::Error>,
}

impl<R> FrameIterator<R>
where R: io::Read
{
    pub(crate) fn new(r: R, size: u64, segment_id: SegmentId) -> Self {
        Self {
            r: OffsetReader::new(r),
            total_size: size,
            segment_id,
            error: None,
        }
    }
}

impl<R> Iterator for FrameIterator<R>
where R: io::Read
{
    type Item = Result<(Span, Vec<u8>), io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        let start = self.r.offset();
        if start == self.total_size {
            return None;
        }

        let res = Frame::decode(&mut self.r)
            .map(|frame| {
                let size = self.r.offset() - start;
                (Span::new(start, size), frame.0)
            })
            .context(|| format!("decode Frame at offset {}", start))
            .context(|| format!("iterate {}", self.segment_id));

        if let Err(ref e) = res {
            self.error = Some(io::Error::new(e.kind(), e.to_string()));
        }

        Some(res)
    }
}
