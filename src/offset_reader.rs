use std::io;

/// Counts the bytes read through it, so that the position of each decoded
/// frame is known without seeking.
pub(crate) struct OffsetReader<R> {
    inner: R,
    offset: u64,
}

impl<R: io::Read> OffsetReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: io::Read> io::Read for OffsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Read;

    use crate::offset_reader::OffsetReader;

    #[test]
    fn test_offset_reader_counts_frames() -> Result<(), io::Error> {
        let data = [0u8, 0, 0, 0, 0, 0, 0, 2, b'h', b'i', 0xff];
        let mut reader = OffsetReader::new(data.as_ref());

        let mut len = [0; 8];
        reader.read_exact(&mut len)?;
        assert_eq!(8, reader.offset());

        let mut payload = vec![0; u64::from_be_bytes(len) as usize];
        reader.read_exact(&mut payload)?;
        assert_eq!(10, reader.offset());

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        assert_eq!(11, reader.offset());

        Ok(())
    }
}
