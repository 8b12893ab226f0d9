use std::io;

use codeq::OffsetSize;

use crate::num::format_pad9_u64;
use crate::types::Span;
use crate::SegmentId;

/// Writes one frame per line, preceded by the segment id before the first
/// frame of a segment. The payload is shown as an escaped string.
pub fn multiline_string<W: io::Write>(
    w: &mut W,
    segment_id: SegmentId,
    record_index: u64,
    res: Result<(Span, Vec<u8>), io::Error>,
) -> Result<(), io::Error> {
    if record_index == 0 {
        writeln!(w, "{}", segment_id)?;
    }

    match res {
        Ok((span, payload)) => {
            let start = *span.offset();
            let end = *span.end();
            writeln!(
                w,
                "  R-{record_index:05}: [{}, {}) {}: {:?}",
                format_pad9_u64(start),
                format_pad9_u64(end),
                end - start,
                String::from_utf8_lossy(&payload)
            )?;
        }
        Err(io_err) => {
            writeln!(w, "  Error: {}", io_err)?;
        }
    }
    Ok(())
}
