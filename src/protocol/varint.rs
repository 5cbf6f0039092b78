use std::fmt::{Debug, Display, Formatter};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::err::ProtError;

pub(crate) const SEGMENT_BITS: u8 = 0x7f;
pub(crate) const CONTINUE_BIT: u8 = 0x80;

/// A signed 32-bit integer encoded 7 bits per byte, least significant group
/// first, with the high bit of each byte flagging a continuation.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Copy)]
pub(crate) struct VarInt {
    pub(crate) value: i32,
}

impl VarInt {
    /// The longest legal encoding of a VarInt.
    pub(crate) const MAX_BYTES: usize = 5;

    /// Number of bytes the canonical encoding of this value takes.
    pub(crate) fn size(self) -> usize {
        let bits = 32 - (self.value as u32 | 1).leading_zeros() as usize;
        (bits + 6) / 7
    }

    /// Encodes into `dst`, which must hold at least `self.size()` bytes.
    /// Returns the number of bytes written.
    pub(crate) fn encode(self, dst: &mut [u8]) -> usize {
        let mut x = self.value as u32;
        let mut i = 0;
        loop {
            let mut byte = (x & SEGMENT_BITS as u32) as u8;
            x >>= 7;
            if x != 0 {
                byte |= CONTINUE_BIT;
            }
            dst[i] = byte;
            i += 1;
            if x == 0 {
                break i;
            }
        }
    }

    /// Decodes a VarInt from the start of `src`, returning the value and the
    /// number of bytes consumed.
    pub(crate) fn decode(src: &[u8]) -> Result<(Self, usize), ProtError> {
        let mut value: i32 = 0;
        let mut pos: u32 = 0;
        for (i, &byte) in src.iter().enumerate() {
            value |= ((byte & SEGMENT_BITS) as i32) << pos;
            if byte & CONTINUE_BIT == 0 {
                return Ok((Self { value }, i + 1));
            }
            pos += 7;
            if pos >= 32 {
                return Err(ProtError::VarIntTooBig);
            }
        }
        Err(ProtError::UnexpectedEof)
    }

    /// Reads a VarInt directly off a stream, used for the size and id
    /// prefixes of a packet frame.
    pub(crate) async fn read(
        stream: &mut (impl AsyncRead + Unpin + Send),
    ) -> Result<Self, ProtError> {
        let mut value: i32 = 0;
        let mut pos: u32 = 0;
        loop {
            let byte = stream.read_u8().await?;
            value |= ((byte & SEGMENT_BITS) as i32) << pos;
            if byte & CONTINUE_BIT == 0 {
                return Ok(Self { value });
            }
            pos += 7;
            if pos >= 32 {
                return Err(ProtError::VarIntTooBig);
            }
        }
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        Self { value }
    }
}

impl From<usize> for VarInt {
    fn from(value: usize) -> Self {
        Self {
            value: value as i32,
        }
    }
}

impl Display for VarInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Debug for VarInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// The 64-bit sibling of [`VarInt`], up to 10 bytes on the wire.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Copy)]
pub(crate) struct VarLong {
    pub(crate) value: i64,
}

impl VarLong {
    pub(crate) fn size(self) -> usize {
        let bits = 64 - (self.value as u64 | 1).leading_zeros() as usize;
        (bits + 6) / 7
    }

    pub(crate) fn encode(self, dst: &mut [u8]) -> usize {
        let mut x = self.value as u64;
        let mut i = 0;
        loop {
            let mut byte = (x & SEGMENT_BITS as u64) as u8;
            x >>= 7;
            if x != 0 {
                byte |= CONTINUE_BIT;
            }
            dst[i] = byte;
            i += 1;
            if x == 0 {
                break i;
            }
        }
    }

    pub(crate) fn decode(src: &[u8]) -> Result<(Self, usize), ProtError> {
        let mut value: i64 = 0;
        let mut pos: u32 = 0;
        for (i, &byte) in src.iter().enumerate() {
            value |= ((byte & SEGMENT_BITS) as i64) << pos;
            if byte & CONTINUE_BIT == 0 {
                return Ok((Self { value }, i + 1));
            }
            pos += 7;
            if pos >= 64 {
                return Err(ProtError::VarLongTooBig);
            }
        }
        Err(ProtError::UnexpectedEof)
    }
}

impl From<i64> for VarLong {
    fn from(value: i64) -> Self {
        Self { value }
    }
}

impl Display for VarLong {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Debug for VarLong {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod test {
    use super::{VarInt, VarLong};
    use crate::err::ProtError;

    fn encoded(v: i32) -> Vec<u8> {
        let mut buf = [0u8; VarInt::MAX_BYTES];
        let n = VarInt::from(v).encode(&mut buf);
        buf[..n].to_vec()
    }

    #[test]
    fn varint_canonical_vectors() {
        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(1), [0x01]);
        assert_eq!(encoded(2), [0x02]);
        assert_eq!(encoded(127), [0x7f]);
        assert_eq!(encoded(128), [0x80, 0x01]);
        assert_eq!(encoded(255), [0xff, 0x01]);
        assert_eq!(encoded(25565), [0xdd, 0xc7, 0x01]);
        assert_eq!(encoded(2097151), [0xff, 0xff, 0x7f]);
        assert_eq!(encoded(2147483647), [0xff, 0xff, 0xff, 0xff, 0x07]);
        assert_eq!(encoded(-1), [0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(encoded(-2147483648), [0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn varint_round_trip() {
        let values = [
            0,
            1,
            2,
            127,
            128,
            255,
            25565,
            2097151,
            2147483647,
            -1,
            -2147483648,
        ];
        for v in values {
            let bytes = encoded(v);
            let (decoded, consumed) = VarInt::decode(&bytes).unwrap();
            assert_eq!(decoded.value, v);
            assert_eq!(consumed, VarInt::from(v).size());
        }
    }

    #[test]
    fn varint_too_big() {
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            VarInt::decode(&bytes),
            Err(ProtError::VarIntTooBig)
        ));
    }

    #[test]
    fn varint_truncated_input() {
        let bytes = [0x80u8, 0x80];
        assert!(matches!(
            VarInt::decode(&bytes),
            Err(ProtError::UnexpectedEof)
        ));
    }

    #[test]
    fn varlong_round_trip() {
        let values = [
            0i64,
            1,
            127,
            128,
            255,
            2147483647,
            9223372036854775807,
            -1,
            -2147483648,
            -9223372036854775808,
        ];
        for v in values {
            let mut buf = [0u8; 10];
            let n = VarLong::from(v).encode(&mut buf);
            assert_eq!(n, VarLong::from(v).size());
            let (decoded, consumed) = VarLong::decode(&buf[..n]).unwrap();
            assert_eq!(decoded.value, v);
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn varlong_negative_one_encoding() {
        let mut buf = [0u8; 10];
        let n = VarLong::from(-1i64).encode(&mut buf);
        assert_eq!(
            buf[..n],
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn varlong_too_big() {
        let bytes = [0x80u8; 11];
        assert!(matches!(
            VarLong::decode(&bytes),
            Err(ProtError::VarLongTooBig)
        ));
    }

    #[tokio::test]
    async fn varint_read_from_stream() {
        let mut data: &[u8] = &[0xdd, 0xc7, 0x01, 0xff];
        let v = VarInt::read(&mut data).await.unwrap();
        assert_eq!(v.value, 25565);
    }
}
