use crate::err::ProtError;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::varint::{VarInt, VarLong};

/// A value that can be decoded from a packet body.
pub(crate) trait ReadProt {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError>
    where
        Self: Sized;
}

/// A value that can be encoded into a packet body.
pub(crate) trait WriteProt {
    fn write(&self, buf: &mut PacketBuffer);
}

impl ReadProt for bool {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_bool()
    }
}

impl WriteProt for bool {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_bool(*self);
    }
}

impl ReadProt for u8 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_u8()
    }
}

impl WriteProt for u8 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_u8(*self);
    }
}

impl WriteProt for i8 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_i8(*self);
    }
}

impl ReadProt for u16 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_u16()
    }
}

impl WriteProt for u16 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_u16(*self);
    }
}

impl ReadProt for i32 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_i32()
    }
}

impl WriteProt for i32 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_i32(*self);
    }
}

impl ReadProt for i64 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_i64()
    }
}

impl WriteProt for i64 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_i64(*self);
    }
}

impl ReadProt for f32 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_f32()
    }
}

impl WriteProt for f32 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_f32(*self);
    }
}

impl ReadProt for f64 {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_f64()
    }
}

impl WriteProt for f64 {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_f64(*self);
    }
}

impl ReadProt for VarInt {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_varint()
    }
}

impl WriteProt for VarInt {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_varint(*self);
    }
}

impl ReadProt for VarLong {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_varlong()
    }
}

impl WriteProt for VarLong {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_varlong(*self);
    }
}

impl ReadProt for String {
    fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
        buf.get_str()
    }
}

impl WriteProt for String {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_str(self);
    }
}

// A Vec<u8> on the wire is a VarInt-prefixed byte array.
impl WriteProt for Vec<u8> {
    fn write(&self, buf: &mut PacketBuffer) {
        buf.put_byte_array(self);
    }
}
