//! Append-only record store of a segment.
//!
//! A store file is a sequence of length-prefixed frames written in append
//! order. Writes go through a buffered writer; every read flushes the buffer
//! first so that a record accepted by [`Store::append`] is always visible to a
//! following read.

pub(crate) mod frame;
pub(crate) mod frame_iterator;

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;

use codeq::error_context_ext::ErrorContextExt;
use codeq::Decode;

use crate::store::frame::Frame;
use crate::store::frame::LEN_WIDTH;
use crate::types::Span;

#[derive(Debug)]
struct StoreInner {
    w: BufWriter<File>,

    /// Length of the file including buffered bytes, i.e. the position where
    /// the next frame begins.
    size: u64,

    /// Set when a write fails part way. Bytes of the failed frame may be
    /// buffered or on disk, so `size` no longer tells where the next frame
    /// begins and no further append is accepted.
    write_failed: bool,
}

#[derive(Debug)]
pub(crate) struct Store {
    path: String,
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Opens or creates the store file at `path`.
    ///
    /// The file is opened in append mode: every write lands at the end of the
    /// file regardless of where a reader has seeked to.
    pub(crate) fn open(
        path: impl ToString,
        write_buffer_size: usize,
    ) -> Result<Self, io::Error> {
        let path = path.to_string();

        let f = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .context(|| format!("open store {}", path))?;

        let size = f.metadata().context(|| format!("stat {}", path))?.len();

        let inner = StoreInner {
            w: BufWriter::with_capacity(write_buffer_size, f),
            size,
            write_failed: false,
        };

        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Appends one frame and returns the byte range it occupies.
    ///
    /// The returned span starts at the store size before the write and its
    /// size is `8 + payload.len()`.
    ///
    /// After a failed write every later append fails too; the store has to be
    /// reopened, which recovers its size from the file.
    pub(crate) fn append(&self, payload: &[u8]) -> Result<Span, io::Error> {
        let mut inner = self.lock()?;

        if inner.write_failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("store {} rejects appends after a failed write", self.path),
            ));
        }

        let position = inner.size;

        let mut frame = Vec::with_capacity(LEN_WIDTH as usize + payload.len());
        let written = Frame::encode_payload(&mut frame, payload)?;

        if let Err(e) = inner.w.write_all(&frame) {
            inner.write_failed = true;
            return Err(e).context(|| {
                format!("append frame at {} of {}", position, self.path)
            });
        }

        inner.size += written as u64;

        Ok(Span::new(position, written as u64))
    }

    /// Reads the payload of the frame starting at `position`.
    pub(crate) fn read(&self, position: u64) -> Result<Vec<u8>, io::Error> {
        let mut inner = self.lock()?;
        inner.w.flush()?;

        if position.saturating_add(LEN_WIDTH) > inner.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "no frame at position {} of {}, size: {}",
                    position, self.path, inner.size
                ),
            ));
        }

        let mut f = inner.w.get_ref();
        f.seek(io::SeekFrom::Start(position))?;

        let frame = Frame::decode(f).context(|| {
            format!("decode Frame at position {} of {}", position, self.path)
        })?;

        Ok(frame.0)
    }

    /// Reads raw bytes starting at `offset` into `buf` without interpreting
    /// the framing.
    ///
    /// Returns the number of bytes read, which is less than `buf.len()` only
    /// if the end of the store is reached.
    pub(crate) fn read_at(
        &self,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, io::Error> {
        let mut inner = self.lock()?;
        inner.w.flush()?;

        let mut f = inner.w.get_ref();
        f.seek(io::SeekFrom::Start(offset))?;

        let mut n = 0;
        while n < buf.len() {
            match f.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(x) => n += x,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(n)
    }

    /// Returns the store size in bytes, including buffered bytes.
    pub(crate) fn size(&self) -> Result<u64, io::Error> {
        Ok(self.lock()?.size)
    }

    /// Flushes the write buffer and syncs the file data to disk.
    pub(crate) fn sync(&self) -> Result<(), io::Error> {
        let mut inner = self.lock()?;
        inner.w.flush()?;
        inner.w.get_ref().sync_data()
    }

    /// Flushes the buffered writer and closes the file.
    pub(crate) fn close(self) -> Result<(), io::Error> {
        let path = self.path;
        let inner = self.inner.into_inner().map_err(|_e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("store lock poisoned: {}", path),
            )
        })?;

        let f = inner
            .w
            .into_inner()
            .map_err(|e| e.into_error())
            .context(|| format!("flush store {}", path))?;

        f.sync_data().context(|| format!("sync store {}", path))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, io::Error> {
        self.inner.lock().map_err(|_e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("store lock poisoned: {}", self.path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use codeq::OffsetSize;
    use pretty_assertions::assert_eq;

    use super::Store;

    const WRITE: &[u8] = b"hello world";
    const WIDTH: u64 = WRITE.len() as u64 + 8;

    fn new_store(
        dir: &tempfile::TempDir,
        buffer: usize,
    ) -> Result<Store, io::Error> {
        let path = dir.path().join("0.store");
        Store::open(path.to_str().unwrap(), buffer)
    }

    #[test]
    fn test_store_append_read() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;
        let s = new_store(&dir, 1024)?;

        for i in 1..4 {
            let span = s.append(WRITE)?;
            assert_eq!(WIDTH * i, *span.end());
            assert_eq!(WIDTH * (i - 1), *span.offset());
        }

        // Still in buffer, reading must flush it first.
        for i in 0..3 {
            let got = s.read(WIDTH * i)?;
            assert_eq!(WRITE.to_vec(), got);
        }

        assert_eq!(WIDTH * 3, s.size()?);

        Ok(())
    }

    #[test]
    fn test_store_read_at() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;
        let s = new_store(&dir, 1024)?;

        s.append(WRITE)?;
        s.append(b"x")?;

        let mut len = [0u8; 8];
        let n = s.read_at(&mut len, 0)?;
        assert_eq!(8, n);
        assert_eq!(WRITE.len() as u64, u64::from_be_bytes(len));

        let mut payload = vec![0u8; WRITE.len()];
        s.read_at(&mut payload, 8)?;
        assert_eq!(WRITE.to_vec(), payload);

        // Short read at the end of the store.
        let mut buf = [0u8; 32];
        let n = s.read_at(&mut buf, WIDTH)?;
        assert_eq!(9, n);
        assert_eq!(b'x', buf[8]);

        let n = s.read_at(&mut buf, WIDTH + 9)?;
        assert_eq!(0, n);

        Ok(())
    }

    #[test]
    fn test_store_read_past_end() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;
        let s = new_store(&dir, 1024)?;

        let err = s.read(0).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());

        s.append(WRITE)?;
        let err = s.read(WIDTH).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());

        Ok(())
    }

    #[test]
    fn test_store_close_and_reopen() -> Result<(), io::Error> {
        let dir = tempfile::tempdir()?;

        {
            let s = new_store(&dir, 1024)?;
            s.append(WRITE)?;
            s.append(WRITE)?;
            s.close()?;
        }

        let s = new_store(&dir, 1024)?;
        assert_eq!(WIDTH * 2, s.size()?);

        let span = s.append(b"foo")?;
        assert_eq!(WIDTH * 2, *span.offset());

        let meta = std::fs::metadata(s.path())?;
        assert_eq!(WIDTH * 2, meta.len(), "foo is still buffered");

        assert_eq!(WRITE.to_vec(), s.read(WIDTH)?);
        assert_eq!(b"foo".to_vec(), s.read(WIDTH * 2)?);

        let meta = std::fs::metadata(s.path())?;
        assert_eq!(WIDTH * 2 + 11, meta.len(), "read flushes the buffer");

        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_store_rejects_append_after_failed_write() -> Result<(), io::Error> {
        // Every write to /dev/full fails with ENOSPC.
        if !std::path::Path::new("/dev/full").exists() {
            return Ok(());
        }
        let s = Store::open("/dev/full", 4)?;

        // Larger than the buffer: written directly and fails.
        s.append(b"hello world").unwrap_err();
        assert_eq!(0, s.size()?);

        // Even a frame that would fit in the buffer is refused.
        let err = s.append(b"").unwrap_err();
        assert!(err.to_string().contains("after a failed write"), "{}", err);
        assert_eq!(0, s.size()?);

        Ok(())
    }

    #[test]
    fn test_store_large_payload_bypasses_small_buffer() -> Result<(), io::Error>
    {
        let dir = tempfile::tempdir()?;
        let s = new_store(&dir, 4)?;

        let big = vec![7u8; 10_000];
        s.append(&big)?;
        s.append(b"tail")?;

        assert_eq!(big, s.read(0)?);
        assert_eq!(b"tail".to_vec(), s.read(10_008)?);

        Ok(())
    }
}
