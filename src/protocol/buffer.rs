use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use crate::chat::Msg;
use crate::err::ProtError;
use crate::protocol::varint::{VarInt, VarLong};

/// Longest string the decoder will accept, in bytes.
pub(crate) const MAX_STRING_LEN: i32 = 1024;

/// A reusable cursor over packet data. Writes append to the end, reads
/// advance an independent position, and both sides share the same typed
/// vocabulary: big-endian integers, IEEE floats via their bit patterns,
/// VarInts and length-prefixed payloads.
///
/// Buffers are pooled; use [`PacketBuffer::acquire`] instead of constructing
/// one per packet on hot paths.
pub(crate) struct PacketBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl PacketBuffer {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// Takes a buffer from the shared pool. The buffer returns to the pool
    /// when the guard drops, so it cannot outlive its acquisition scope.
    pub(crate) fn acquire() -> PooledBuffer {
        let mut buf = POOL.lock().unwrap().pop().unwrap_or_else(PacketBuffer::new);
        buf.clear();
        PooledBuffer { inner: Some(buf) }
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Resets the buffer to hold exactly `n` bytes of body data and returns
    /// the writable region, for the framing layer to fill from the socket.
    pub(crate) fn body_mut(&mut self, n: usize) -> &mut [u8] {
        self.data.clear();
        self.data.resize(n, 0);
        self.pos = 0;
        &mut self.data
    }

    fn take(&mut self, n: usize) -> Result<&[u8], ProtError> {
        if self.data.len() - self.pos < n {
            return Err(ProtError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn put_bool(&mut self, v: bool) {
        self.data.push(v as u8);
    }

    pub(crate) fn get_bool(&mut self) -> Result<bool, ProtError> {
        Ok(self.get_u8()? == 0x01)
    }

    pub(crate) fn put_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub(crate) fn get_u8(&mut self) -> Result<u8, ProtError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn put_i8(&mut self, v: i8) {
        self.data.push(v as u8);
    }

    pub(crate) fn put_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn get_u16(&mut self) -> Result<u16, ProtError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    // Block cells are the one little-endian value in the protocol.
    pub(crate) fn put_u16_le(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn put_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    pub(crate) fn get_i32(&mut self) -> Result<i32, ProtError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn put_u64(&mut self, v: u64) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn get_u64(&mut self) -> Result<u64, ProtError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub(crate) fn put_i64(&mut self, v: i64) {
        self.put_u64(v as u64);
    }

    pub(crate) fn get_i64(&mut self) -> Result<i64, ProtError> {
        Ok(self.get_u64()? as i64)
    }

    pub(crate) fn put_f32(&mut self, v: f32) {
        self.put_u32(v.to_bits());
    }

    pub(crate) fn get_f32(&mut self) -> Result<f32, ProtError> {
        Ok(f32::from_bits(self.get_i32()? as u32))
    }

    pub(crate) fn put_f64(&mut self, v: f64) {
        self.put_u64(v.to_bits());
    }

    pub(crate) fn get_f64(&mut self) -> Result<f64, ProtError> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    pub(crate) fn put_varint(&mut self, v: VarInt) {
        let mut tmp = [0u8; VarInt::MAX_BYTES];
        let n = v.encode(&mut tmp);
        self.data.extend_from_slice(&tmp[..n]);
    }

    pub(crate) fn get_varint(&mut self) -> Result<VarInt, ProtError> {
        let (v, consumed) = VarInt::decode(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(v)
    }

    pub(crate) fn put_varlong(&mut self, v: VarLong) {
        let mut tmp = [0u8; 10];
        let n = v.encode(&mut tmp);
        self.data.extend_from_slice(&tmp[..n]);
    }

    pub(crate) fn get_varlong(&mut self) -> Result<VarLong, ProtError> {
        let (v, consumed) = VarLong::decode(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(v)
    }

    pub(crate) fn put_str(&mut self, s: &str) {
        self.put_varint(VarInt::from(s.len()));
        self.data.extend_from_slice(s.as_bytes());
    }

    pub(crate) fn get_str(&mut self) -> Result<String, ProtError> {
        let len = self.get_varint()?.value;
        if len < 0 {
            return Err(ProtError::StringNegativeLength(len));
        }
        if len > MAX_STRING_LEN {
            return Err(ProtError::StringTooBig(len));
        }
        let bytes = self.take(len as usize)?.to_vec();
        String::from_utf8(bytes).map_err(|err| ProtError::BadPacket(format!("UTF8 error: {err}")))
    }

    pub(crate) fn put_byte_array(&mut self, b: &[u8]) {
        self.put_varint(VarInt::from(b.len()));
        self.data.extend_from_slice(b);
    }

    pub(crate) fn put_bytes(&mut self, b: &[u8]) {
        self.data.extend_from_slice(b);
    }

    /// Packs block coordinates into the 26/12/26-bit position long.
    pub(crate) fn put_block_pos(&mut self, x: i32, y: i32, z: i32) {
        let v = ((x as u64 & 0x3ff_ffff) << 38)
            | ((y as u64 & 0xfff) << 26)
            | (z as u64 & 0x3ff_ffff);
        self.put_u64(v);
    }

    pub(crate) fn get_block_pos(&mut self) -> Result<(i32, i32, i32), ProtError> {
        let v = self.get_u64()? as i64;
        let x = (v >> 38) as i32;
        let y = ((v << 26) >> 52) as i32;
        let z = ((v << 38) >> 38) as i32;
        Ok((x, y, z))
    }

    /// Chat payloads travel as a length-prefixed JSON document.
    pub(crate) fn put_msg(&mut self, msg: &Msg) -> Result<(), ProtError> {
        let json = serde_json::to_vec(msg)
            .map_err(|err| ProtError::BadPacket(format!("chat encode: {err}")))?;
        self.put_byte_array(&json);
        Ok(())
    }
}

static POOL: Mutex<Vec<PacketBuffer>> = Mutex::new(Vec::new());

/// Scoped ownership of a pooled [`PacketBuffer`]. Dropping the guard is the
/// release; the borrow checker rules out any use after that point.
pub(crate) struct PooledBuffer {
    inner: Option<PacketBuffer>,
}

impl Deref for PooledBuffer {
    type Target = PacketBuffer;

    fn deref(&self) -> &PacketBuffer {
        self.inner.as_ref().unwrap()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut PacketBuffer {
        self.inner.as_mut().unwrap()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.inner.take() {
            POOL.lock().unwrap().push(buf);
        }
    }
}

#[cfg(test)]
mod test {
    use super::{PacketBuffer, MAX_STRING_LEN};
    use crate::err::ProtError;
    use crate::protocol::varint::VarInt;

    #[test]
    fn primitive_round_trip() {
        let mut buf = PacketBuffer::new();
        buf.put_bool(true);
        buf.put_u8(0xab);
        buf.put_u16(0xbeef);
        buf.put_i32(-123456);
        buf.put_i64(1234567890123);
        buf.put_f32(1.5);
        buf.put_f64(-2.25);
        buf.put_varint(VarInt::from(25565));

        assert!(buf.get_bool().unwrap());
        assert_eq!(buf.get_u8().unwrap(), 0xab);
        assert_eq!(buf.get_u16().unwrap(), 0xbeef);
        assert_eq!(buf.get_i32().unwrap(), -123456);
        assert_eq!(buf.get_i64().unwrap(), 1234567890123);
        assert_eq!(buf.get_f32().unwrap(), 1.5);
        assert_eq!(buf.get_f64().unwrap(), -2.25);
        assert_eq!(buf.get_varint().unwrap().value, 25565);
    }

    #[test]
    fn string_round_trip() {
        let mut buf = PacketBuffer::new();
        buf.put_str("Björn ✓ ᚱᚢᚾᛖ");
        assert_eq!(buf.get_str().unwrap(), "Björn ✓ ᚱᚢᚾᛖ");
    }

    #[test]
    fn string_too_big() {
        let mut buf = PacketBuffer::new();
        buf.put_varint(VarInt::from(MAX_STRING_LEN + 1));
        assert!(matches!(
            buf.get_str(),
            Err(ProtError::StringTooBig(n)) if n == MAX_STRING_LEN + 1
        ));
    }

    #[test]
    fn string_negative_length() {
        let mut buf = PacketBuffer::new();
        buf.put_varint(VarInt::from(-1));
        assert!(matches!(
            buf.get_str(),
            Err(ProtError::StringNegativeLength(-1))
        ));
    }

    #[test]
    fn string_truncated_payload() {
        let mut buf = PacketBuffer::new();
        buf.put_varint(VarInt::from(10));
        buf.put_bytes(b"short");
        assert!(matches!(buf.get_str(), Err(ProtError::UnexpectedEof)));
    }

    #[test]
    fn read_past_end() {
        let mut buf = PacketBuffer::new();
        buf.put_u8(1);
        buf.get_u8().unwrap();
        assert!(matches!(buf.get_u8(), Err(ProtError::UnexpectedEof)));
    }

    #[test]
    fn block_pos_round_trip() {
        let mut buf = PacketBuffer::new();
        buf.put_block_pos(-120, 255, 67108863 / 2);
        assert_eq!(buf.get_block_pos().unwrap(), (-120, 255, 67108863 / 2));

        buf.clear();
        buf.put_block_pos(8, 0, -8);
        assert_eq!(buf.get_block_pos().unwrap(), (8, 0, -8));
    }

    #[test]
    fn pooled_buffer_reuse() {
        {
            let mut buf = PacketBuffer::acquire();
            buf.put_u8(42);
        }
        // Whatever buffer we get back, it must start out empty.
        let buf = PacketBuffer::acquire();
        assert_eq!(buf.len(), 0);
    }
}
