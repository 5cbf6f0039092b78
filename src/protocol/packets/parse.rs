use crate::err::ProtError;
use crate::protocol::buffer::PacketBuffer;
use crate::protocol::packets::{server, Inbound};
use crate::protocol::traits::ReadProt;
use crate::protocol::{State, Version};

/// The complete decode table: every (state, id) pair this server
/// understands, fixed at compile time. Unknown pairs decode to `None` and
/// are skipped by the framing layer, so unimplemented packets never break a
/// connection.
pub(crate) fn decode_packet(
    state: State,
    version: Version,
    id: i32,
    buf: &mut PacketBuffer,
) -> Result<Option<Inbound>, ProtError> {
    let pk = match (state, id) {
        (State::Handshake, 0x00) => Inbound::Handshake(server::Handshake::read(buf)?),

        (State::Status, 0x00) => Inbound::StatusRequest(server::StatusRequest::read(buf)?),
        (State::Status, 0x01) => Inbound::StatusPing(server::StatusPing::read(buf)?),

        (State::Login, 0x00) => Inbound::LoginStart(server::LoginStart::read(buf)?),

        (State::Play, 0x00) => Inbound::KeepAlive(server::KeepAlive::read(buf, version)?),
        (State::Play, 0x03) => Inbound::Update(server::Update::read(buf, version, false, false)?),
        (State::Play, 0x04) => Inbound::Update(server::Update::read(buf, version, true, false)?),
        (State::Play, 0x05) => Inbound::Update(server::Update::read(buf, version, false, true)?),
        (State::Play, 0x06) => Inbound::Update(server::Update::read(buf, version, true, true)?),
        (State::Play, 0x07) => {
            Inbound::PlayerDigging(server::PlayerDigging::read(buf, version)?)
        }

        _ => return Ok(None),
    };

    Ok(Some(pk))
}
