use std::io;
use std::sync::Arc;

use codeq::error_context_ext::ErrorContextExt;

use crate::dump_writer;
use crate::store::frame_iterator::FrameIterator;
use crate::types::Span;
use crate::CommitLog;
use crate::Config;
use crate::SegmentId;

/// Writes the frames of every store file in a log directory in a
/// human-readable form.
///
/// It reads the files directly and does not need the log to be open.
pub struct Dump {
    config: Arc<Config>,
}

impl Dump {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn write_to_string(&self) -> Result<String, io::Error> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    pub fn write<W: io::Write>(&self, mut w: W) -> Result<(), io::Error> {
        writeln!(&mut w, "CommitLog:")?;
        self.write_with(w, dump_writer::multiline_string)
    }

    /// Writes every frame with the provided function.
    ///
    /// The function receives the segment id, the index of the frame in its
    /// segment, and the frame byte range with its payload or an error.
    pub fn write_with<W: io::Write, D>(
        &self,
        mut w: W,
        write_record: D,
    ) -> Result<(), io::Error>
    where
        D: Fn(
            &mut W,
            SegmentId,
            u64,
            Result<(Span, Vec<u8>), io::Error>,
        ) -> Result<(), io::Error>,
    {
        let config = self.config.as_ref();
        let segment_ids = CommitLog::load_segment_ids(config)?;

        for segment_id in segment_ids {
            let path = config.store_path(segment_id);
            let f = match std::fs::File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            let size = f.metadata().context(|| format!("stat {}", path))?.len();
            let br = io::BufReader::with_capacity(config.read_buffer_size(), f);

            let it = FrameIterator::new(br, size, segment_id);
            for (i, res) in it.enumerate() {
                write_record(&mut w, segment_id, i as u64, res)?;
            }
        }
        Ok(())
    }
}
