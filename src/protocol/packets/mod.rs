pub(crate) mod client;
pub(crate) mod parse;
pub(crate) mod server;

use crate::err::ProtError;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::varint::VarInt;
use crate::protocol::Version;

/// Declares a serverbound packet: a plain struct whose fields decode in
/// order from the packet body.
#[macro_export]
macro_rules! inbound_packet {
    ($name:ident {
        $( $field:ident : $field_type:ty ),* $(,)?
    }) => {
        #[derive(Debug)]
        pub(crate) struct $name {
            $( pub(crate) $field: $field_type, )*
        }

        impl ReadProt for $name {
            fn read(buf: &mut PacketBuffer) -> Result<Self, ProtError> {
                Ok(Self {
                    $( $field: <$field_type as ReadProt>::read(buf)?, )*
                })
            }
        }
    };
}

/// Declares a clientbound packet whose encoding does not depend on the
/// protocol version: a struct, a constructor, and field-by-field encode.
#[macro_export]
macro_rules! outbound_packet {
    ($name:ident {
        $( $field:ident : $field_type:ty ),* $(,)?
    }) => {
        #[derive(Debug)]
        pub(crate) struct $name {
            $( pub(crate) $field: $field_type, )*
        }

        impl $name {
            pub(crate) fn new($( $field: $field_type, )*) -> Self {
                Self { $( $field, )* }
            }

            pub(crate) fn encode(
                &self,
                buf: &mut PacketBuffer,
                _version: Version,
            ) -> Result<(), ProtError> {
                $( self.$field.write(buf); )*
                Ok(())
            }
        }
    };
}

/// Every packet the server understands, one variant per (state, id) pair of
/// the decode table in [`parse`].
#[derive(Debug)]
pub(crate) enum Inbound {
    Handshake(server::Handshake),
    StatusRequest(server::StatusRequest),
    StatusPing(server::StatusPing),
    LoginStart(server::LoginStart),
    KeepAlive(server::KeepAlive),
    Update(server::Update),
    PlayerDigging(server::PlayerDigging),
}

/// Every packet the server can send. Each variant carries its fixed id and
/// encodes itself into a buffer; the id space is per connection state, which
/// is why ids repeat across variants.
#[derive(Debug)]
pub(crate) enum Outbound {
    StatusResponse(client::StatusResponse),
    StatusPong(client::StatusPong),
    LoginDisconnect(client::LoginDisconnect),
    LoginSuccess(client::LoginSuccess),
    JoinGame(client::JoinGame),
    KeepAlive(client::KeepAlive),
    ChatMessage(client::ChatMessage),
    Position(client::Position),
    ChunkData(client::ChunkData),
    BulkChunkData(client::BulkChunkData),
    BlockChange(client::BlockChange),
    Disconnect(client::Disconnect),
}

impl Outbound {
    pub(crate) fn packet_id(&self) -> VarInt {
        let id = match self {
            Outbound::StatusResponse(_) => 0x00,
            Outbound::StatusPong(_) => 0x01,
            Outbound::LoginDisconnect(_) => 0x00,
            Outbound::LoginSuccess(_) => 0x02,
            Outbound::JoinGame(_) => 0x01,
            Outbound::KeepAlive(_) => 0x00,
            Outbound::ChatMessage(_) => 0x02,
            Outbound::Position(_) => 0x08,
            Outbound::ChunkData(_) => 0x21,
            Outbound::BulkChunkData(_) => 0x26,
            Outbound::BlockChange(_) => 0x23,
            Outbound::Disconnect(_) => 0x40,
        };
        VarInt::from(id)
    }

    pub(crate) fn encode(
        &self,
        buf: &mut PacketBuffer,
        version: Version,
    ) -> Result<(), ProtError> {
        match self {
            Outbound::StatusResponse(pk) => pk.encode(buf, version),
            Outbound::StatusPong(pk) => pk.encode(buf, version),
            Outbound::LoginDisconnect(pk) => pk.encode(buf, version),
            Outbound::LoginSuccess(pk) => pk.encode(buf, version),
            Outbound::JoinGame(pk) => pk.encode(buf, version),
            Outbound::KeepAlive(pk) => pk.encode(buf, version),
            Outbound::ChatMessage(pk) => pk.encode(buf, version),
            Outbound::Position(pk) => pk.encode(buf, version),
            Outbound::ChunkData(pk) => pk.encode(buf, version),
            Outbound::BulkChunkData(pk) => pk.encode(buf, version),
            Outbound::BlockChange(pk) => pk.encode(buf, version),
            Outbound::Disconnect(pk) => pk.encode(buf, version),
        }
    }
}
