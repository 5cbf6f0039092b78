use crate::err::ProtError;
use crate::inbound_packet;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::traits::ReadProt;
use crate::protocol::varint::VarInt;
use crate::protocol::Version;

inbound_packet!(Handshake {
    protocol_version: VarInt,
    server_address: String,
    server_port: u16,
    next_state: VarInt,
});

inbound_packet!(StatusRequest {});

inbound_packet!(StatusPing { time: i64 });

inbound_packet!(LoginStart { username: String });

/// Keep-alive echo from the client. 1.8 encodes the id as a VarInt, 1.7 as a
/// plain int.
#[derive(Debug)]
pub(crate) struct KeepAlive {
    pub(crate) id: i32,
}

impl KeepAlive {
    pub(crate) fn read(buf: &mut PacketBuffer, version: Version) -> Result<Self, ProtError> {
        let id = match version {
            Version::V1_7_6 => buf.get_i32()?,
            Version::V1_8 => buf.get_varint()?.value,
        };
        Ok(Self { id })
    }
}

/// The serverbound movement family (ids 0x03 through 0x06): the same body
/// with position and/or look sections present depending on the id. 1.7
/// carries an extra head-Y double inside the position section, which is read
/// and dropped.
#[derive(Debug)]
pub(crate) struct Update {
    pub(crate) has_pos: bool,
    pub(crate) has_look: bool,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) z: f64,
    pub(crate) yaw: f32,
    pub(crate) pitch: f32,
    pub(crate) on_ground: bool,
}

impl Update {
    pub(crate) fn read(
        buf: &mut PacketBuffer,
        version: Version,
        has_pos: bool,
        has_look: bool,
    ) -> Result<Self, ProtError> {
        let mut pk = Self {
            has_pos,
            has_look,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
        };
        if has_pos {
            pk.x = buf.get_f64()?;
            pk.y = buf.get_f64()?;
            if version == Version::V1_7_6 {
                let _head_y = buf.get_f64()?;
            }
            pk.z = buf.get_f64()?;
        }
        if has_look {
            pk.yaw = buf.get_f32()?;
            pk.pitch = buf.get_f32()?;
        }
        pk.on_ground = buf.get_bool()?;
        Ok(pk)
    }
}

/// A dig action. In creative mode a started dig (status 0) breaks the block
/// immediately; status 2 is a finished dig in survival.
#[derive(Debug)]
pub(crate) struct PlayerDigging {
    pub(crate) status: u8,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) z: i32,
    pub(crate) face: u8,
}

impl PlayerDigging {
    pub(crate) fn read(buf: &mut PacketBuffer, version: Version) -> Result<Self, ProtError> {
        let status = buf.get_u8()?;
        let (x, y, z) = match version {
            Version::V1_7_6 => {
                let x = buf.get_i32()?;
                let y = buf.get_u8()? as i32;
                let z = buf.get_i32()?;
                (x, y, z)
            }
            Version::V1_8 => buf.get_block_pos()?,
        };
        let face = buf.get_u8()?;
        Ok(Self {
            status,
            x,
            y,
            z,
            face,
        })
    }
}
