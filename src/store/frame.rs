use std::io;
use std::io::Read;

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

/// Number of bytes of the length prefix of a frame.
pub const LEN_WIDTH: u64 = 8;

/// A length-prefixed record payload as stored in a store file.
///
/// Encoded as:
/// - 8 bytes: big-endian payload length
/// - variable bytes: payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(pub Vec<u8>);

impl Frame {
    pub(crate) fn encode_payload<W: io::Write>(
        mut w: W,
        payload: &[u8],
    ) -> Result<usize, io::Error> {
        w.write_u64::<BigEndian>(payload.len() as u64)?;
        w.write_all(payload)?;
        Ok(LEN_WIDTH as usize + payload.len())
    }
}

impl codeq::Encode for Frame {
    fn encode<W: io::Write>(&self, w: W) -> Result<usize, io::Error> {
        Self::encode_payload(w, &self.0)
    }
}

/// A length prefix larger than the remaining data is an `UnexpectedEof`; the
/// payload buffer only grows with the bytes actually read.
impl codeq::Decode for Frame {
    fn decode<R: io::Read>(mut r: R) -> Result<Self, io::Error> {
        let len = r.read_u64::<BigEndian>()?;

        let mut payload = Vec::new();
        let n = r.by_ref().take(len).read_to_end(&mut payload)?;

        if n as u64 != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("frame payload truncated: want {} bytes, got {}", len, n),
            ));
        }

        Ok(Frame(payload))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use codeq::Decode;
    use codeq::Encode;

    use super::Frame;

    #[test]
    fn test_frame_layout() -> Result<(), io::Error> {
        let mut b = Vec::new();
        let n = Frame(b"abc".to_vec()).encode(&mut b)?;

        assert_eq!(11, n);
        assert_eq!(vec![0, 0, 0, 0, 0, 0, 0, 3, b'a', b'b', b'c'], b);

        let got = Frame::decode(&mut b.as_slice())?;
        assert_eq!(Frame(b"abc".to_vec()), got);

        Ok(())
    }

    #[test]
    fn test_frame_decode_truncated() {
        let b = vec![0, 0, 0, 0, 0, 0, 0, 5, b'a', b'b'];
        let err = Frame::decode(&mut b.as_slice()).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());

        let b = vec![0, 0, 0];
        let err = Frame::decode(&mut b.as_slice()).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());
    }

    #[test]
    fn test_frame_decode_huge_length() {
        let b = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1, 2];
        let err = Frame::decode(&mut b.as_slice()).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());
    }
}
