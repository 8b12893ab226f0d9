//! A segment binds one store and one index sharing a base offset.
//!
//! Offsets passed in and out of a segment are absolute offsets of the whole
//! log. The translation to offsets relative to the base offset happens only
//! here; neither the store nor the index know the base offset.

pub(crate) mod segment_id;

use std::io;
use std::sync::Arc;

use codeq::OffsetSize;
use log::info;
use log::warn;

use crate::errors::IndexFull;
use crate::errors::LogError;
use crate::errors::OffsetNotFound;
use crate::index::Index;
use crate::store::frame::LEN_WIDTH;
use crate::store::Store;
use crate::Config;
use crate::SegmentId;
use crate::SegmentStat;

#[derive(Debug)]
pub(crate) struct Segment {
    config: Arc<Config>,
    segment_id: SegmentId,
    store: Store,
    index: Index,

    /// The absolute offset the next appended record will receive.
    next_offset: u64,
}

impl Segment {
    /// Opens the segment starting at `segment_id`, creating its files if
    /// absent.
    ///
    /// Index entries whose frame does not lie entirely within the store file
    /// are discarded, so that only records present in both files are served.
    pub(crate) fn open(
        config: Arc<Config>,
        segment_id: SegmentId,
    ) -> Result<Self, LogError> {
        let store = Store::open(
            config.store_path(segment_id),
            config.write_buffer_size(),
        )?;
        let mut index =
            Index::open(config.index_path(segment_id), config.max_index_bytes())?;

        Self::discard_dangling_entries(&store, &mut index, segment_id)?;

        let next_offset = match index.read(-1) {
            Ok(last) => segment_id.offset() + last.relative_offset as u64 + 1,
            Err(LogError::EmptyIndex(_)) => segment_id.offset(),
            Err(e) => return Err(e),
        };

        info!(
            "Segment opened: {}, records: {}, store size: {}",
            segment_id,
            next_offset - segment_id.offset(),
            store.size()?
        );

        Ok(Self {
            config,
            segment_id,
            store,
            index,
            next_offset,
        })
    }

    fn discard_dangling_entries(
        store: &Store,
        index: &mut Index,
        segment_id: SegmentId,
    ) -> Result<(), LogError> {
        let store_size = store.size()?;
        let count = index.entries_count();
        let mut valid = count;

        while valid > 0 {
            let entry = index.read(valid as i64 - 1)?;

            if entry.position + LEN_WIDTH <= store_size {
                let mut len = [0u8; LEN_WIDTH as usize];
                store.read_at(&mut len, entry.position)?;
                let frame_end = (entry.position + LEN_WIDTH)
                    .saturating_add(u64::from_be_bytes(len));

                if frame_end <= store_size {
                    break;
                }
            }

            valid -= 1;
        }

        if valid < count {
            warn!(
                "{}: discard {} index entries beyond store size {}",
                segment_id,
                count - valid,
                store_size
            );
            index.truncate_entries(valid);
        }

        Ok(())
    }

    pub(crate) fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    pub(crate) fn base_offset(&self) -> u64 {
        self.segment_id.offset()
    }

    pub(crate) fn next_offset(&self) -> u64 {
        self.next_offset
    }

    pub(crate) fn records_count(&self) -> u64 {
        self.next_offset - self.base_offset()
    }

    /// Returns true if `offset` is stored in this segment.
    pub(crate) fn contains(&self, offset: u64) -> bool {
        self.base_offset() <= offset && offset < self.next_offset
    }

    /// Appends a record and returns the absolute offset assigned to it.
    ///
    /// Returns [`IndexFull`] without touching the store if the index has no
    /// room left or the relative offset would not fit in an entry. The
    /// caller is expected to roll over to a new segment.
    pub(crate) fn append(&mut self, value: &[u8]) -> Result<u64, LogError> {
        let offset = self.next_offset;
        let relative = offset - self.base_offset();

        if self.index.is_full() || relative > u32::MAX as u64 {
            return Err(IndexFull::new(self.index.capacity()).into());
        }

        let span = self.store.append(value)?;
        self.index.write(relative as u32, *span.offset())?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Reads the record at the absolute `offset`.
    pub(crate) fn read(&self, offset: u64) -> Result<Vec<u8>, LogError> {
        if !self.contains(offset) {
            return Err(OffsetNotFound::new(
                offset,
                self.base_offset(),
                self.next_offset,
            )
            .into());
        }

        let relative = offset - self.base_offset();
        let entry = self.index.read(relative as i64)?;

        debug_assert_eq!(relative, entry.relative_offset as u64);

        let value = self.store.read(entry.position)?;
        Ok(value)
    }

    /// Reads raw store bytes, see [`Store::read_at`].
    pub(crate) fn read_store_at(
        &self,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, io::Error> {
        self.store.read_at(buf, offset)
    }

    /// Returns true if this segment must not receive more records.
    pub(crate) fn is_maximal(&self) -> Result<bool, io::Error> {
        let store_full = self.store.size()? >= self.config.max_store_bytes();
        let index_full = self.index.size() >= self.config.max_index_bytes()
            || self.index.is_full()
            || self.records_count() > u32::MAX as u64;

        Ok(store_full || index_full)
    }

    /// Flushes buffered store data and the index map to disk.
    pub(crate) fn sync(&self) -> Result<(), io::Error> {
        self.store.sync()?;
        self.index.sync()
    }

    pub(crate) fn stat(&self) -> Result<SegmentStat, io::Error> {
        Ok(SegmentStat {
            segment_id: self.segment_id,
            records_count: self.records_count(),
            base_offset: self.base_offset(),
            next_offset: self.next_offset,
            store_size: self.store.size()?,
            index_size: self.index.size(),
            index_capacity: self.index.capacity(),
        })
    }

    /// Closes the index, then the store.
    ///
    /// Both are attempted; the first error is returned.
    pub(crate) fn close(self) -> Result<(), io::Error> {
        let index_res = self.index.close();
        let store_res = self.store.close();
        index_res.and(store_res)
    }

    /// Closes the segment and deletes its files.
    pub(crate) fn remove(self) -> Result<(), io::Error> {
        let store_path = self.store.path().to_string();
        let index_path = self.index.path().to_string();
        let segment_id = self.segment_id;

        self.close()?;

        std::fs::remove_file(&index_path)?;
        std::fs::remove_file(&store_path)?;

        info!("Segment removed: {}", segment_id);
        Ok(())
    }
}
