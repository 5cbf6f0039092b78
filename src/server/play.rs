use log::debug;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::err::ProtError;
use crate::game::chunk::SUBSCRIBER_BACKLOG;
use crate::game::entity::{Entity, EntityId};
use crate::game::player::{drain_chunk_updates, Player};
use crate::game::world::WorldHandle;
use crate::server::conn::Conn;

/// Hands a logged-in connection over to a world and becomes its read loop.
/// From here on every decoded packet is forwarded as a job; all further game
/// logic runs on the world's task, never on the connection's.
pub(crate) async fn handle_play(
    conn: &mut Conn,
    username: String,
    id: Uuid,
    world: &WorldHandle,
) -> Result<(), ProtError> {
    let (updates_tx, updates_rx) = mpsc::channel(SUBSCRIBER_BACKLOG);
    let player = Player::new(username, id, conn.sink(), conn.version(), updates_tx);
    let eid = player.entity_id();

    tokio::spawn(drain_chunk_updates(updates_rx, conn.sink()));
    world.schedule(move |w| w.add_player(player)).await;

    let result = read_loop(conn, world, eid).await;

    // entering and leaving the world are an explicit pair: the leave job
    // drops the world's half of the player no matter how the loop ended
    world.schedule(move |w| w.remove_player(eid)).await;
    result
}

async fn read_loop(
    conn: &mut Conn,
    world: &WorldHandle,
    eid: EntityId,
) -> Result<(), ProtError> {
    while conn.is_open() {
        match conn.read_packet().await? {
            Some(pk) => {
                debug!("inbound packet: {pk:?}");
                world.schedule(move |w| w.handle_packet(eid, pk)).await;
            }
            // unknown packet, skipped for forward compatibility
            None => {}
        }
    }
    Ok(())
}
