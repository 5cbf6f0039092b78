use crate::chat::Msg;
use crate::err::ProtError;
use crate::outbound_packet;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::traits::WriteProt;
use crate::protocol::varint::VarInt;
use crate::protocol::Version;

outbound_packet!(StatusResponse { json: String });

outbound_packet!(StatusPong { time: i64 });

outbound_packet!(LoginSuccess {
    uuid: String,
    username: String,
});

#[derive(Debug)]
pub(crate) struct LoginDisconnect {
    pub(crate) reason: Msg,
}

impl LoginDisconnect {
    pub(crate) fn new(reason: Msg) -> Self {
        Self { reason }
    }

    pub(crate) fn encode(&self, buf: &mut PacketBuffer, _version: Version) -> Result<(), ProtError> {
        buf.put_msg(&self.reason)
    }
}

#[derive(Debug)]
pub(crate) struct JoinGame {
    pub(crate) entity_id: i32,
    pub(crate) gamemode: u8,
    pub(crate) dimension: i8,
    pub(crate) difficulty: u8,
    pub(crate) max_players: u8,
    pub(crate) level_type: String,
    pub(crate) reduced_debug_info: bool,
}

impl JoinGame {
    pub(crate) fn encode(&self, buf: &mut PacketBuffer, version: Version) -> Result<(), ProtError> {
        buf.put_i32(self.entity_id);
        buf.put_u8(self.gamemode);
        buf.put_i8(self.dimension);
        buf.put_u8(self.difficulty);
        buf.put_u8(self.max_players);
        buf.put_str(&self.level_type);
        // the reduced-debug-info flag only exists from 1.8 onwards
        if version == Version::V1_8 {
            buf.put_bool(self.reduced_debug_info);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct KeepAlive {
    pub(crate) id: i32,
}

impl KeepAlive {
    pub(crate) fn new(id: i32) -> Self {
        Self { id }
    }

    pub(crate) fn encode(&self, buf: &mut PacketBuffer, version: Version) -> Result<(), ProtError> {
        match version {
            Version::V1_7_6 => buf.put_i32(self.id),
            Version::V1_8 => buf.put_varint(VarInt::from(self.id)),
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct ChatMessage {
    pub(crate) msg: Msg,
}

impl ChatMessage {
    pub(crate) fn new(msg: Msg) -> Self {
        Self { msg }
    }

    pub(crate) fn encode(&self, buf: &mut PacketBuffer, version: Version) -> Result<(), ProtError> {
        buf.put_msg(&self.msg)?;
        // 1.8 added a position byte; 0 is the regular chat box
        if version == Version::V1_8 {
            buf.put_i8(0);
        }
        Ok(())
    }
}

/// Absolute teleport of the client's view. 1.8 trails a relative-bits flag
/// byte, 1.7 an on-ground bool.
#[derive(Debug)]
pub(crate) struct Position {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) z: f64,
    pub(crate) yaw: f32,
    pub(crate) pitch: f32,
    pub(crate) on_ground: bool,
}

impl Position {
    pub(crate) fn encode(&self, buf: &mut PacketBuffer, version: Version) -> Result<(), ProtError> {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        match version {
            // all fields absolute
            Version::V1_8 => buf.put_i8(0),
            Version::V1_7_6 => buf.put_bool(self.on_ground),
        }
        Ok(())
    }
}

outbound_packet!(ChunkData {
    x: i32,
    z: i32,
    full_chunk: bool,
    mask: u16,
    data: Vec<u8>,
});

/// Section mask and coordinates for one column inside a bulk transfer.
#[derive(Debug)]
pub(crate) struct BulkChunkMeta {
    pub(crate) x: i32,
    pub(crate) z: i32,
    pub(crate) mask: u16,
}

#[derive(Debug)]
pub(crate) struct BulkChunkData {
    pub(crate) sky_light: bool,
    pub(crate) meta: Vec<BulkChunkMeta>,
    pub(crate) data: Vec<u8>,
}

impl BulkChunkData {
    pub(crate) fn encode(&self, buf: &mut PacketBuffer, _version: Version) -> Result<(), ProtError> {
        buf.put_bool(self.sky_light);
        buf.put_varint(VarInt::from(self.meta.len()));
        for meta in &self.meta {
            buf.put_i32(meta.x);
            buf.put_i32(meta.z);
            buf.put_u16(meta.mask);
        }
        // unlike ChunkData, the bulk payload is raw, without a length prefix
        buf.put_bytes(&self.data);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct BlockChange {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) z: i32,
    pub(crate) block_id: u16,
    pub(crate) metadata: u8,
}

impl BlockChange {
    pub(crate) fn encode(&self, buf: &mut PacketBuffer, version: Version) -> Result<(), ProtError> {
        match version {
            Version::V1_8 => {
                buf.put_block_pos(self.x, self.y, self.z);
                buf.put_varint(VarInt::from(
                    ((self.block_id as i32) << 4) | (self.metadata as i32 & 15),
                ));
            }
            Version::V1_7_6 => {
                buf.put_i32(self.x);
                buf.put_u8(self.y as u8);
                buf.put_i32(self.z);
                buf.put_varint(VarInt::from(self.block_id as i32));
                buf.put_u8(self.metadata);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct Disconnect {
    pub(crate) reason: Msg,
}

impl Disconnect {
    pub(crate) fn new(reason: Msg) -> Self {
        Self { reason }
    }

    pub(crate) fn encode(&self, buf: &mut PacketBuffer, _version: Version) -> Result<(), ProtError> {
        buf.put_msg(&self.reason)
    }
}

#[cfg(test)]
mod test {
    use super::{BlockChange, JoinGame, KeepAlive};
    use crate::protocol::buffer::PacketBuffer;
    use crate::protocol::Version;

    #[test]
    fn join_game_omits_debug_flag_before_1_8() {
        let pk = JoinGame {
            entity_id: 1,
            gamemode: 1,
            dimension: 0,
            difficulty: 1,
            max_players: 0,
            level_type: "flat".into(),
            reduced_debug_info: false,
        };

        let mut v8 = PacketBuffer::new();
        pk.encode(&mut v8, Version::V1_8).unwrap();
        let mut v7 = PacketBuffer::new();
        pk.encode(&mut v7, Version::V1_7_6).unwrap();
        assert_eq!(v8.len(), v7.len() + 1);
    }

    #[test]
    fn keep_alive_id_width_depends_on_version() {
        let pk = KeepAlive::new(3);
        let mut v7 = PacketBuffer::new();
        pk.encode(&mut v7, Version::V1_7_6).unwrap();
        assert_eq!(v7.bytes(), [0, 0, 0, 3]);

        let mut v8 = PacketBuffer::new();
        pk.encode(&mut v8, Version::V1_8).unwrap();
        assert_eq!(v8.bytes(), [3]);
    }

    #[test]
    fn block_change_packs_state_for_1_8() {
        let pk = BlockChange {
            x: 8,
            y: 16,
            z: 8,
            block_id: 1,
            metadata: 0,
        };
        let mut buf = PacketBuffer::new();
        pk.encode(&mut buf, Version::V1_8).unwrap();
        let (x, y, z) = buf.get_block_pos().unwrap();
        assert_eq!((x, y, z), (8, 16, 8));
        assert_eq!(buf.get_varint().unwrap().value, 1 << 4);
    }
}
