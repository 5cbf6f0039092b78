use std::collections::{HashMap, HashSet};

use log::debug;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::Msg;
use crate::game::chunk::{Chunk, ChunkPos, ChunkUpdate};
use crate::game::entity::{Entity, EntityId, Pos, ENTITY_IDS};
use crate::protocol::packets::{client, server, Outbound};
use crate::protocol::Version;
use crate::server::conn::PacketSink;

/// Offset between a player's feet and eyes; teleports position the camera.
pub(crate) const EYE_HEIGHT: f64 = 1.62;

/// The world-side half of a connected player: game state plus the sink that
/// turns state changes into outbound packets. The socket itself lives with
/// the connection; a slow peer therefore only ever backs up its own queue,
/// never the world task.
pub(crate) struct Player {
    id: EntityId,
    username: String,
    uid: Uuid,
    sink: PacketSink,
    version: Version,
    updates: mpsc::Sender<ChunkUpdate>,
    pos: Pos,
    on_ground: bool,
    known_chunks: HashSet<ChunkPos>,
    last_keep_alive: i32,
}

impl Player {
    pub(crate) fn new(
        username: String,
        uid: Uuid,
        sink: PacketSink,
        version: Version,
        updates: mpsc::Sender<ChunkUpdate>,
    ) -> Self {
        Self {
            id: ENTITY_IDS.next(),
            username,
            uid,
            sink,
            version,
            updates,
            pos: Pos::default(),
            on_ground: false,
            known_chunks: HashSet::new(),
            last_keep_alive: 0,
        }
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn uuid(&self) -> Uuid {
        self.uid
    }

    pub(crate) fn send_join_game(&self) {
        self.sink.send(Outbound::JoinGame(client::JoinGame {
            entity_id: self.id.0,
            gamemode: 1,
            dimension: 0,
            difficulty: 1,
            max_players: 0,
            level_type: "flat".into(),
            reduced_debug_info: false,
        }));
    }

    pub(crate) fn send_chat(&self, msg: &Msg) {
        self.sink
            .send(Outbound::ChatMessage(client::ChatMessage::new(msg.clone())));
    }

    /// Moves the player and tells the client, with the eye-height offset the
    /// protocol expects.
    pub(crate) fn teleport(&mut self, pos: Pos) {
        self.pos = pos;
        self.sink.send(Outbound::Position(client::Position {
            x: pos.x,
            y: pos.y + EYE_HEIGHT,
            z: pos.z,
            yaw: pos.yaw,
            pitch: pos.pitch,
            on_ground: self.on_ground,
        }));
    }

    pub(crate) fn handle_keep_alive(&self, pk: &server::KeepAlive) {
        if pk.id != self.last_keep_alive {
            // clients may still answer a superseded ping, not worth a kick
            debug!(
                "{}: keep-alive id mismatch: {} != {}",
                self.username, pk.id, self.last_keep_alive
            );
        }
    }

    /// Applies a movement update. Returns true when the player crossed a
    /// chunk border, in which case the caller should refresh its chunk
    /// subscriptions.
    pub(crate) fn handle_update(&mut self, pk: &server::Update) -> bool {
        let mut crossed = false;
        if pk.has_pos {
            let old = ChunkPos::from_world_coords(self.pos.x, self.pos.z);
            self.pos.x = pk.x;
            self.pos.y = pk.y;
            self.pos.z = pk.z;
            crossed = old != ChunkPos::from_world_coords(pk.x, pk.z);
        }
        if pk.has_look {
            self.pos.yaw = pk.yaw;
            self.pos.pitch = pk.pitch;
        }
        self.on_ground = pk.on_ground;
        crossed
    }

    /// Reconciles chunk subscriptions with the player's position: drops and
    /// unloads columns beyond the view distance, subscribes and sends newly
    /// visible ones. 1.8 clients get new columns batched in one bulk packet,
    /// 1.7 clients one packet per column.
    pub(crate) fn update_chunks(
        &mut self,
        chunks: &mut HashMap<ChunkPos, Chunk>,
        view_distance: i32,
    ) {
        let center = ChunkPos::from_world_coords(self.pos.x, self.pos.z);

        let stale: Vec<ChunkPos> = self
            .known_chunks
            .iter()
            .filter(|pos| pos.dist(center) > view_distance)
            .copied()
            .collect();
        for pos in stale {
            self.known_chunks.remove(&pos);
            if let Some(chunk) = chunks.get_mut(&pos) {
                chunk.unsubscribe(self.id.as_u32());
            }
            // a full chunk with an empty mask unloads the column client-side
            self.sink.send(Outbound::ChunkData(client::ChunkData::new(
                pos.x,
                pos.z,
                true,
                0,
                Vec::new(),
            )));
        }

        let mut fresh = Vec::new();
        for x in center.x - view_distance..=center.x + view_distance {
            for z in center.z - view_distance..=center.z + view_distance {
                let pos = ChunkPos { x, z };
                if self.known_chunks.contains(&pos) {
                    continue;
                }
                let Some(chunk) = chunks.get_mut(&pos) else {
                    continue;
                };
                chunk.subscribe(self.id.as_u32(), self.updates.clone());
                self.known_chunks.insert(pos);
                fresh.push(pos);
            }
        }
        if fresh.is_empty() {
            return;
        }

        match self.version {
            Version::V1_8 => {
                let mut meta = Vec::with_capacity(fresh.len());
                let mut data = Vec::new();
                for pos in &fresh {
                    let chunk = &chunks[pos];
                    meta.push(client::BulkChunkMeta {
                        x: pos.x,
                        z: pos.z,
                        mask: chunk.section_mask(),
                    });
                    chunk.write_data(&mut data);
                }
                self.sink
                    .send(Outbound::BulkChunkData(client::BulkChunkData {
                        sky_light: true,
                        meta,
                        data,
                    }));
            }
            Version::V1_7_6 => {
                for pos in &fresh {
                    let chunk = &chunks[pos];
                    let mut data = Vec::with_capacity(chunk.data_size());
                    chunk.write_data(&mut data);
                    self.sink.send(Outbound::ChunkData(client::ChunkData::new(
                        pos.x,
                        pos.z,
                        true,
                        chunk.section_mask(),
                        data,
                    )));
                }
            }
        }
    }

    /// Drops every chunk subscription, for when the player leaves the world.
    pub(crate) fn clear_chunks(&mut self, chunks: &mut HashMap<ChunkPos, Chunk>) {
        for pos in self.known_chunks.drain() {
            if let Some(chunk) = chunks.get_mut(&pos) {
                chunk.unsubscribe(self.id.as_u32());
            }
        }
    }
}

impl Entity for Player {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn tick(&mut self) {
        self.last_keep_alive = rand::random::<i32>();
        self.sink.send(Outbound::KeepAlive(client::KeepAlive::new(
            self.last_keep_alive,
        )));
    }
}

/// Converts chunk updates into packets on the player's write queue. Runs on
/// its own task so chunk broadcasts never touch the socket from the world
/// task.
pub(crate) async fn drain_chunk_updates(mut rx: mpsc::Receiver<ChunkUpdate>, sink: PacketSink) {
    while let Some(update) = rx.recv().await {
        match update {
            ChunkUpdate::Subscribed => {}
            ChunkUpdate::BlockChanged { x, y, z, data } => {
                sink.send(Outbound::BlockChange(client::BlockChange {
                    x,
                    y,
                    z,
                    block_id: data.id(),
                    metadata: data.metadata(),
                }));
            }
        }
    }
}
