use std::io;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use codeq::error_context_ext::ErrorContextExt;
use log::info;
use log::warn;

use crate::api::record_log::RecordLog;
use crate::commit_log::dump::Dump;
use crate::commit_log::reader::LogReader;
use crate::commit_log::stat::Stat;
use crate::errors::LogError;
use crate::errors::OffsetNotFound;
use crate::file_lock::FileLock;
use crate::num::format_pad_u64;
use crate::segment::Segment;
use crate::Config;
use crate::SegmentId;

/// CommitLog is a segmented, append-only log of byte records addressed by a
/// monotonically increasing offset.
///
/// - Records are appended to the last(active) segment.
/// - When the active segment reaches its store or index size limit, a new
///   segment is created starting at the next offset.
/// - Reads are routed to the segment whose offset range contains the offset.
///
/// Appends and segment list changes hold an exclusive lock; reads share it.
#[derive(Debug)]
pub struct CommitLog {
    pub(crate) config: Arc<Config>,

    /// Acquire the dir exclusive lock when writing to the log.
    _dir_lock: FileLock,

    /// Segments sorted by base offset; never empty.
    pub(crate) segments: RwLock<Vec<Segment>>,
}

impl RecordLog for CommitLog {
    fn append(&self, value: &[u8]) -> Result<u64, LogError> {
        CommitLog::append(self, value)
    }

    fn read(&self, offset: u64) -> Result<Vec<u8>, LogError> {
        CommitLog::read(self, offset)
    }
}

impl CommitLog {
    /// Opens a CommitLog at the configured directory.
    ///
    /// This operation:
    /// 1. Validates the config and creates the directory if absent
    /// 2. Acquires an exclusive lock on the directory
    /// 3. Opens existing segments in base offset order
    /// 4. Creates the first segment at `initial_offset` for an empty directory,
    ///    or a new active segment if the last one is already full
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config is invalid
    /// - Directory operations fail
    /// - There are gaps between segment offsets
    pub fn open(config: Arc<Config>) -> Result<Self, LogError> {
        config.validate()?;

        std::fs::create_dir_all(&config.dir)
            .context(|| format!("create dir '{}'", config.dir))?;

        let dir_lock = FileLock::new(config.clone())
            .context(|| format!("open CommitLog in '{}'", config.dir))?;

        let segment_ids = Self::load_segment_ids(&config)?;

        let mut segments: Vec<Segment> = Vec::with_capacity(segment_ids.len());

        for segment_id in segment_ids {
            Self::ensure_consecutive_segments(segments.last(), segment_id)?;

            let segment = Segment::open(config.clone(), segment_id)?;
            segments.push(segment);
        }

        let new_segment_id = match segments.last() {
            None => {
                let segment_id = SegmentId(config.initial_offset());
                info!(
                    "Create first segment: {} in '{}'",
                    segment_id, config.dir
                );
                Some(segment_id)
            }
            Some(last) => {
                if last.is_maximal()? {
                    let segment_id = SegmentId(last.next_offset());
                    info!(
                        "Last segment {} is full, open new: {}",
                        last.segment_id(),
                        segment_id
                    );
                    Some(segment_id)
                } else {
                    None
                }
            }
        };

        if let Some(segment_id) = new_segment_id {
            segments.push(Segment::open(config.clone(), segment_id)?);
        }

        Ok(Self {
            config,
            _dir_lock: dir_lock,
            segments: RwLock::new(segments),
        })
    }

    /// Verifies that a segment starts right where the previous one ends.
    ///
    /// A gap would indicate data loss or corruption.
    fn ensure_consecutive_segments(
        prev: Option<&Segment>,
        segment_id: SegmentId,
    ) -> Result<(), io::Error> {
        let Some(prev) = prev else {
            return Ok(());
        };

        if prev.next_offset() != segment_id.offset() {
            let message = format!(
                "Gap between segments: {} ends at {}, next starts at {}; \
                        Can not open, fix this error and re-open",
                prev.segment_id(),
                format_pad_u64(prev.next_offset()),
                format_pad_u64(segment_id.offset()),
            );
            return Err(io::Error::new(io::ErrorKind::InvalidData, message));
        }

        Ok(())
    }

    /// Lists the base offsets of the segments stored in the configured
    /// directory, in ascending order.
    ///
    /// A segment is listed if either of its store or index file exists.
    /// Files that are not segment files are ignored.
    pub fn load_segment_ids(config: &Config) -> Result<Vec<SegmentId>, io::Error> {
        let path = &config.dir;
        let entries = std::fs::read_dir(path)
            .context(|| format!("read dir '{}'", path))?;

        let mut segment_ids = vec![];
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();

            let fn_str = file_name.to_string_lossy();
            if fn_str == FileLock::LOCK_FILE_NAME {
                continue;
            }

            match Config::parse_segment_file_name(&fn_str) {
                Ok((offset, _kind)) => {
                    segment_ids.push(SegmentId(offset));
                }
                Err(err) => {
                    warn!(
                        "Ignore invalid segment file name: '{}': {}",
                        fn_str, err
                    );
                    continue;
                }
            };
        }

        segment_ids.sort();
        segment_ids.dedup();

        Ok(segment_ids)
    }

    /// Get a reference to the CommitLog configuration.
    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    /// Appends a record and returns the offset assigned to it.
    ///
    /// The active segment is rolled over after the append if it has become
    /// full, so an append is never rejected because the segment is nearly
    /// full. If that rollover fails the offset is still returned, and a full
    /// index makes the next append roll over before writing.
    pub fn append(&self, value: &[u8]) -> Result<u64, LogError> {
        let mut segments = self.write_segments()?;

        let res = Self::active(&mut segments).append(value);

        let offset = match res {
            Ok(offset) => offset,
            Err(LogError::IndexFull(e)) => {
                warn!(
                    "Active segment index full({}), roll over before append",
                    e
                );
                self.roll_over(&mut segments)?;
                Self::active(&mut segments).append(value)?
            }
            Err(e) => return Err(e),
        };

        // `offset` is already stored and readable: a failed rollover is only
        // logged and retried by the next append.
        let maximal = Self::active(&mut segments).is_maximal();
        let roll_res = match maximal {
            Ok(true) => self.roll_over(&mut segments),
            Ok(false) => Ok(()),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = roll_res {
            warn!(
                "Failed to roll over after append at {}, retry on next append: {}",
                offset, e
            );
        }

        Ok(offset)
    }

    /// Creates a new active segment starting at the next offset of the
    /// current one.
    fn roll_over(&self, segments: &mut Vec<Segment>) -> Result<(), LogError> {
        let prev = Self::active(segments);
        let segment_id = SegmentId(prev.next_offset());

        info!(
            "Closing full segment: {}, open new: {}",
            prev.segment_id(),
            segment_id
        );

        prev.sync()?;

        let segment = Segment::open(self.config.clone(), segment_id)?;
        segments.push(segment);
        Ok(())
    }

    /// Reads the record at `offset`.
    ///
    /// Returns [`OffsetNotFound`] if the offset is below the lowest live
    /// offset or not yet written.
    pub fn read(&self, offset: u64) -> Result<Vec<u8>, LogError> {
        let segments = self.read_segments()?;

        let segment = Self::find_segment(&segments, offset).ok_or_else(|| {
            OffsetNotFound::new(
                offset,
                segments[0].base_offset(),
                segments[segments.len() - 1].next_offset(),
            )
        })?;

        segment.read(offset)
    }

    fn find_segment(segments: &[Segment], offset: u64) -> Option<&Segment> {
        let i = segments.partition_point(|s| s.base_offset() <= offset);
        if i == 0 {
            return None;
        }

        let segment = &segments[i - 1];
        if segment.contains(offset) {
            Some(segment)
        } else {
            None
        }
    }

    /// Returns the lowest offset stored, i.e. the base offset of the first
    /// segment.
    pub fn lowest_offset(&self) -> Result<u64, LogError> {
        let segments = self.read_segments()?;
        Ok(segments[0].base_offset())
    }

    /// Returns the offset of the last record, or `None` if the log holds no
    /// record.
    pub fn highest_offset(&self) -> Result<Option<u64>, LogError> {
        let segments = self.read_segments()?;

        let lowest = segments[0].base_offset();
        let next = segments[segments.len() - 1].next_offset();

        if next == lowest {
            Ok(None)
        } else {
            Ok(Some(next - 1))
        }
    }

    /// Returns the offset the next appended record will receive.
    pub fn next_offset(&self) -> Result<u64, LogError> {
        let segments = self.read_segments()?;
        Ok(segments[segments.len() - 1].next_offset())
    }

    /// Removes every segment whose records are all below `lowest`, and deletes
    /// their files.
    ///
    /// The segment list is never left empty: if every segment is below
    /// `lowest`, an empty active segment is kept as is, or a new one is opened
    /// at the next offset before anything is removed. Offsets are never
    /// reused.
    ///
    /// Segments are dropped from the log even if deleting their files fails;
    /// the first such error is returned.
    pub fn truncate(&self, lowest: u64) -> Result<(), LogError> {
        let mut segments = self.write_segments()?;

        let mut n = segments.partition_point(|s| s.next_offset() <= lowest);

        if n == segments.len() {
            let active = Self::active(&mut segments);

            if active.records_count() == 0 {
                // Already starts at the next offset.
                n -= 1;
            } else {
                let segment_id = SegmentId(active.next_offset());
                info!("All segments below {}, open new: {}", lowest, segment_id);
                segments.push(Segment::open(self.config.clone(), segment_id)?);
            }
        }

        if n == 0 {
            return Ok(());
        }

        info!(
            "CommitLog truncate below {}: remove {} segments",
            lowest, n
        );

        let removed = segments.drain(..n).collect::<Vec<_>>();

        let mut first_err = None;
        for segment in removed {
            let segment_id = segment.segment_id();
            if let Err(e) = segment.remove() {
                warn!("Failed to remove segment {}: {}", segment_id, e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Flushes buffered store data and index maps of all segments to disk.
    pub fn flush(&self) -> Result<(), LogError> {
        let segments = self.read_segments()?;
        for segment in segments.iter() {
            segment.sync()?;
        }
        Ok(())
    }

    /// Returns a reader of the raw store bytes of all segments in offset
    /// order.
    ///
    /// Appends are blocked while the reader is alive.
    pub fn reader(&self) -> Result<LogReader<'_>, LogError> {
        let segments = self.read_segments()?;
        Ok(LogReader::new(segments))
    }

    /// Get statistics about the segments of this log.
    pub fn stat(&self) -> Result<Stat, LogError> {
        let segments = self.read_segments()?;

        let stats = segments
            .iter()
            .map(|s| s.stat())
            .collect::<Result<Vec<_>, io::Error>>()?;

        Ok(Stat { segments: stats })
    }

    /// Dump the on-disk records of this log for debugging purposes.
    ///
    /// Buffered data is flushed first so that the dump sees every record.
    pub fn dump(&self) -> Result<Dump, LogError> {
        self.flush()?;
        Ok(Dump::new(self.config.clone()))
    }

    /// Closes every segment in base offset order.
    ///
    /// All segments are closed even if some fail; the first error is
    /// returned.
    pub fn close(self) -> Result<(), LogError> {
        let segments = self.segments.into_inner().map_err(|_e| {
            io::Error::new(io::ErrorKind::Other, "segment list lock poisoned")
        })?;

        let mut first_err = None;
        for segment in segments {
            let segment_id = segment.segment_id();
            if let Err(e) = segment.close() {
                warn!("Failed to close segment {}: {}", segment_id, e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        info!("CommitLog closed: '{}'", self.config.dir);

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Closes the log and deletes its directory.
    pub fn remove(self) -> Result<(), LogError> {
        let dir = self.config.dir.clone();
        self.close()?;

        std::fs::remove_dir_all(&dir)
            .context(|| format!("remove dir '{}'", dir))?;

        info!("CommitLog removed: '{}'", dir);
        Ok(())
    }

    /// Deletes all records and reopens an empty log starting at
    /// `initial_offset`.
    pub fn reset(self) -> Result<Self, LogError> {
        let config = self.config.clone();
        self.remove()?;
        Self::open(config)
    }

    fn active(segments: &mut [Segment]) -> &mut Segment {
        let l = segments.len();
        &mut segments[l - 1]
    }

    fn read_segments(
        &self,
    ) -> Result<RwLockReadGuard<'_, Vec<Segment>>, io::Error> {
        self.segments.read().map_err(|_e| {
            io::Error::new(io::ErrorKind::Other, "segment list lock poisoned")
        })
    }

    fn write_segments(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Vec<Segment>>, io::Error> {
        self.segments.write().map_err(|_e| {
            io::Error::new(io::ErrorKind::Other, "segment list lock poisoned")
        })
    }
}
