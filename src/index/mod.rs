//! Memory-mapped offset index of a segment.
//!
//! The index file is a table of fixed-width [`Entry`]s. While open, the file
//! is extended to its full capacity and mapped as a whole, so that writing an
//! entry never requires remapping. On close the file is truncated back to
//! the entries actually written.

pub(crate) mod entry;

use std::fs::File;
use std::fs::OpenOptions;
use std::io;

use codeq::error_context_ext::ErrorContextExt;
use codeq::Decode;
use codeq::Encode;
pub use entry::Entry;
pub use entry::ENTRY_WIDTH;
use log::debug;
use log::error;
use log::warn;
use memmap2::MmapMut;

use crate::errors::EmptyIndex;
use crate::errors::IndexFull;
use crate::errors::InvalidConfig;
use crate::errors::LogError;
use crate::errors::OffsetNotFound;

/// Owns an index file together with its memory map.
///
/// The map is flushed and dropped before the file is truncated, whether the
/// index is closed explicitly with [`Index::close`] or just dropped.
#[derive(Debug)]
pub(crate) struct Index {
    path: String,

    f: File,

    /// `None` once closed.
    mmap: Option<MmapMut>,

    /// Size of the mapped region in bytes.
    capacity: u64,

    /// Number of bytes of valid entries, i.e. where the next entry is written.
    size: u64,
}

impl Index {
    /// Opens or creates the index file at `path` and maps `max_bytes` of it.
    ///
    /// The used size is recovered by scanning the existing entries: entry `i`
    /// must store relative offset `i` and positions must strictly increase.
    /// Anything after the first entry violating this is not used, which
    /// discards the zero-filled tail left by an index that was not closed.
    pub(crate) fn open(
        path: impl ToString,
        max_bytes: u64,
    ) -> Result<Self, LogError> {
        let path = path.to_string();

        if max_bytes < ENTRY_WIDTH {
            return Err(InvalidConfig::new(format!(
                "index capacity {} is smaller than one entry({}): {}",
                max_bytes, ENTRY_WIDTH, path
            ))
            .into());
        }

        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .context(|| format!("open index {}", path))?;

        let file_size = f.metadata().context(|| format!("stat {}", path))?.len();

        // Never shrink an existing index below its whole entries.
        let capacity = max_bytes.max(file_size - file_size % ENTRY_WIDTH);
        if capacity > max_bytes {
            warn!(
                "Index {} holds {} bytes, more than max_index_bytes {}; map it all",
                path, file_size, max_bytes
            );
        }

        f.set_len(capacity)
            .context(|| format!("extend index {} to {}", path, capacity))?;

        // SAFETY: the file is owned by this struct and is only resized after
        // the map is dropped. Other processes are kept away by the directory
        // lock.
        let mmap = unsafe { MmapMut::map_mut(&f) }
            .context(|| format!("mmap index {}", path))?;

        let mut size = Self::scan_valid_size(&mmap, file_size.min(capacity))?;

        // A pre-allocated, never written index reads as one valid entry
        // `(0, 0)` followed by zeros. Only a cleanly closed file proves that a
        // lone first entry was written.
        if size == ENTRY_WIDTH && file_size > ENTRY_WIDTH {
            debug!("Index {}: lone first entry in unclosed file, drop it", path);
            size = 0;
        }

        if size != file_size {
            warn!(
                "Index {}: file size {} but valid entries end at {}; ignore the tail",
                path, file_size, size
            );
        }

        debug!(
            "Index opened: {}, entries: {}, capacity: {}",
            path,
            size / ENTRY_WIDTH,
            capacity
        );

        Ok(Self {
            path,
            f,
            mmap: Some(mmap),
            capacity,
            size,
        })
    }

    fn scan_valid_size(mmap: &[u8], limit: u64) -> Result<u64, io::Error> {
        let n = limit / ENTRY_WIDTH;
        let mut prev_position = None;

        for i in 0..n {
            let start = (i * ENTRY_WIDTH) as usize;
            let end = start + ENTRY_WIDTH as usize;
            let entry = Entry::decode(&mmap[start..end])?;

            if entry.relative_offset as u64 != i {
                return Ok(i * ENTRY_WIDTH);
            }

            if let Some(prev) = prev_position {
                if entry.position <= prev {
                    return Ok(i * ENTRY_WIDTH);
                }
            }

            prev_position = Some(entry.position);
        }

        Ok(n * ENTRY_WIDTH)
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Number of bytes of written entries.
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Size of the pre-allocated region in bytes.
    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn entries_count(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    /// Returns true if there is no room for another entry.
    pub(crate) fn is_full(&self) -> bool {
        self.size + ENTRY_WIDTH > self.capacity
    }

    /// Appends an entry after the last written one.
    ///
    /// Returns [`IndexFull`] if the pre-allocated region has no room left.
    pub(crate) fn write(
        &mut self,
        relative_offset: u32,
        position: u64,
    ) -> Result<(), LogError> {
        if self.is_full() {
            return Err(IndexFull::new(self.capacity).into());
        }

        let start = self.size as usize;
        let end = start + ENTRY_WIDTH as usize;

        let mmap = self.mmap_mut()?;
        Entry::new(relative_offset, position).encode(&mut mmap[start..end])?;

        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Reads an entry.
    ///
    /// `selector` is the entry index, or `-1` for the last written entry.
    /// Returns [`EmptyIndex`] if no entry is written, and [`OffsetNotFound`]
    /// with the relative offset if the selected entry is not written.
    pub(crate) fn read(&self, selector: i64) -> Result<Entry, LogError> {
        if self.size == 0 {
            return Err(EmptyIndex.into());
        }

        let count = self.entries_count();

        let i = match selector {
            -1 => count - 1,
            x if x >= 0 && (x as u64) < count => x as u64,
            x if x >= 0 => {
                return Err(OffsetNotFound::new(x as u64, 0, count).into());
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid index selector {}: {}", selector, self.path),
                )
                .into());
            }
        };

        let start = (i * ENTRY_WIDTH) as usize;
        let end = start + ENTRY_WIDTH as usize;

        let mmap = self.mmap()?;
        let entry = Entry::decode(&mmap[start..end])?;
        Ok(entry)
    }

    /// Forgets entries after the first `count` ones.
    pub(crate) fn truncate_entries(&mut self, count: u64) {
        self.size = self.size.min(count * ENTRY_WIDTH);
    }

    /// Flushes the mapped region to disk.
    pub(crate) fn sync(&self) -> Result<(), io::Error> {
        self.mmap()?.flush().context(|| format!("flush mmap {}", self.path))
    }

    /// Syncs the map and the file, then truncates the file to the written
    /// entries.
    pub(crate) fn close(mut self) -> Result<(), io::Error> {
        self.close_mmap()
    }

    fn close_mmap(&mut self) -> Result<(), io::Error> {
        let Some(mmap) = self.mmap.take() else {
            return Ok(());
        };

        mmap.flush().context(|| format!("flush mmap {}", self.path))?;
        drop(mmap);

        self.f.sync_all().context(|| format!("sync {}", self.path))?;
        self.f
            .set_len(self.size)
            .context(|| format!("truncate {} to {}", self.path, self.size))?;
        self.f.sync_all().context(|| format!("sync {}", self.path))?;

        debug!("Index closed: {}, size: {}", self.path, self.size);
        Ok(())
    }

    fn mmap(&self) -> Result<&MmapMut, io::Error> {
        self.mmap.as_ref().ok_or_else(|| closed_error(&self.path))
    }

    fn mmap_mut(&mut self) -> Result<&mut MmapMut, io::Error> {
        let path = &self.path;
        self.mmap.as_mut().ok_or_else(|| closed_error(path))
    }
}

fn closed_error(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("index already closed: {}", path),
    )
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.close_mmap() {
            error!("Failed to close index {}: {}", self.path, e);
        }
    }
}
