use serde_json::json;

use crate::err::ProtError;
use crate::protocol::packets::{client, Inbound, Outbound};
use crate::protocol::Version;
use crate::server::conn::Conn;
use crate::server::ServerConfig;

/// The fixed status exchange: Request, Response, Ping, Pong, close. Anything
/// out of order is a protocol error.
pub(crate) async fn handle_status(conn: &mut Conn, cfg: &ServerConfig) -> Result<(), ProtError> {
    match conn.read_packet().await? {
        Some(Inbound::StatusRequest(_)) => {}
        _ => return Err(ProtError::UnexpectedPacket("status request")),
    }

    let descriptor = json!({
        "version": { "name": "1.7.6-1.8.9", "protocol": Version::V1_8.protocol() },
        "players": { "max": cfg.max_players, "online": 0 },
        "description": { "text": cfg.motd },
    });
    conn.write_packet(Outbound::StatusResponse(client::StatusResponse::new(
        descriptor.to_string(),
    )))
    .await;

    let time = match conn.read_packet().await? {
        Some(Inbound::StatusPing(ping)) => ping.time,
        _ => return Err(ProtError::UnexpectedPacket("ping")),
    };
    conn.write_packet(Outbound::StatusPong(client::StatusPong::new(time)))
        .await;

    Ok(())
}
