use uuid::Uuid;

use crate::err::ProtError;
use crate::protocol::packets::{client, Inbound, Outbound};
use crate::server::conn::Conn;
use crate::server::uuid::generate_offline_uuid;

/// The login sequence in offline ('cracked') mode: LoginStart in,
/// LoginSuccess out. Returns the player's username and identity. The caller
/// has already validated the protocol version.
pub(crate) async fn handle_login(conn: &mut Conn) -> Result<(String, Uuid), ProtError> {
    let username = match conn.read_packet().await? {
        Some(Inbound::LoginStart(start)) => start.username,
        _ => return Err(ProtError::UnexpectedPacket("login start")),
    };

    let id = generate_offline_uuid(&username);
    conn.write_packet(Outbound::LoginSuccess(client::LoginSuccess::new(
        id.to_string(),
        username.clone(),
    )))
    .await;

    Ok((username, id))
}
