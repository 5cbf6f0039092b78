use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;

use crate::chat::{Color, Msg};
use crate::game::chunk::{BlockData, Chunk, ChunkPos, ChunkUpdate, SECTION_EDGE};
use crate::game::entity::{Entity, EntityId, Pos};
use crate::game::player::Player;
use crate::game::GameConfig;
use crate::protocol::packets::Inbound;

/// Where new players appear.
const SPAWN_POS: Pos = Pos {
    x: 8.0,
    y: 16.0,
    z: 8.0,
    yaw: 0.0,
    pitch: 0.0,
};

/// A unit of work executed on the world's own task, with exclusive access to
/// the world's state.
pub(crate) type Job = Box<dyn FnOnce(&mut World) + Send>;

/// A world and everything in it. All fields are owned by the task spawned in
/// [`World::spawn`]; nothing outside that task may touch them, which is what
/// makes the lock-free mutation here sound.
pub(crate) struct World {
    chunks: HashMap<ChunkPos, Chunk>,
    players: HashMap<EntityId, Player>,
    view_distance: i32,
}

/// A cloneable reference to a running world. Scheduling a job is the only
/// way to reach the world's state from another task.
#[derive(Clone)]
pub(crate) struct WorldHandle {
    jobs: mpsc::Sender<Job>,
    shutdown: Arc<Notify>,
}

impl WorldHandle {
    /// Enqueues a job. Jobs sent through one handle run in FIFO order; jobs
    /// scheduled after [`WorldHandle::close`] are silently dropped.
    pub(crate) async fn schedule(&self, job: impl FnOnce(&mut World) + Send + 'static) {
        if self.jobs.send(Box::new(job)).await.is_err() {
            debug!("world is closed, dropping job");
        }
    }

    /// Stops the world's task after the job or tick in progress completes.
    /// May be called more than once.
    pub(crate) fn close(&self) {
        self.shutdown.notify_one();
    }
}

impl World {
    /// Creates a world with the given initial chunks and starts its task.
    pub(crate) fn spawn(chunks: HashMap<ChunkPos, Chunk>, cfg: GameConfig) -> WorldHandle {
        let (jobs_tx, jobs_rx) = mpsc::channel(cfg.max_jobs);
        let shutdown = Arc::new(Notify::new());
        let world = World {
            chunks,
            players: HashMap::new(),
            view_distance: cfg.view_distance,
        };
        tokio::spawn(world.handle(jobs_rx, shutdown.clone(), cfg.tick_interval));
        WorldHandle {
            jobs: jobs_tx,
            shutdown,
        }
    }

    /// The world's event loop: jobs, entity ticks and shutdown, whichever is
    /// ready. Runs until the handle closes the world or every handle is
    /// gone. In-flight jobs always run to completion.
    async fn handle(
        mut self,
        mut jobs: mpsc::Receiver<Job>,
        shutdown: Arc<Notify>,
        tick_interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick_entities(),
                job = jobs.recv() => match job {
                    Some(job) => job(&mut self),
                    None => break,
                },
                _ = shutdown.notified() => break,
            }
        }
    }

    // Iteration order of the map, and therefore tick order across entities,
    // is unspecified.
    fn tick_entities(&mut self) {
        for player in self.players.values_mut() {
            player.tick();
        }
    }

    /// Inserts a player and runs the join sequence: JoinGame, the initial
    /// chunks, the spawn teleport, then the announcement.
    pub(crate) fn add_player(&mut self, mut player: Player) {
        info!("{} ({}) joined the world", player.username(), player.uuid());
        player.send_join_game();
        player.update_chunks(&mut self.chunks, self.view_distance);
        player.teleport(SPAWN_POS);
        player.send_chat(&Msg::new("Welcome to ").append("oxmine!").bold());

        let announce =
            Msg::new(format!("{} joined the game", player.username())).color(Color::Yellow);
        self.players.insert(player.entity_id(), player);
        self.broadcast_chat(&announce);
    }

    /// Removes a player and its chunk subscriptions. Does nothing if the id
    /// is not present.
    pub(crate) fn remove_player(&mut self, id: EntityId) {
        if let Some(mut player) = self.players.remove(&id) {
            player.clear_chunks(&mut self.chunks);
            info!("{} left the world", player.username());
            let announce =
                Msg::new(format!("{} left the game", player.username())).color(Color::Yellow);
            self.broadcast_chat(&announce);
        }
    }

    /// Dispatches an inbound play packet to the owning player's handlers.
    pub(crate) fn handle_packet(&mut self, id: EntityId, pk: Inbound) {
        match pk {
            Inbound::KeepAlive(pk) => {
                if let Some(player) = self.players.get_mut(&id) {
                    player.handle_keep_alive(&pk);
                }
            }
            Inbound::Update(pk) => {
                if let Some(player) = self.players.get_mut(&id) {
                    if player.handle_update(&pk) {
                        player.update_chunks(&mut self.chunks, self.view_distance);
                    }
                }
            }
            Inbound::PlayerDigging(pk) => {
                debug!(
                    "dig status={} face={} at ({},{},{})",
                    pk.status, pk.face, pk.x, pk.y, pk.z
                );
                // creative mode: a started dig (0) breaks instantly; 2 is a
                // finished survival dig
                if pk.status == 0 || pk.status == 2 {
                    self.break_block(pk.x, pk.y, pk.z);
                }
            }
            // state-machine packets never reach a world
            _ => {}
        }
    }

    fn break_block(&mut self, x: i32, y: i32, z: i32) {
        match self.block_at(x, y, z) {
            Some(data) if data != BlockData::AIR => {
                self.set_block(x, y, z, BlockData::AIR);
            }
            _ => debug!("ignoring dig at ({x},{y},{z})"),
        }
    }

    /// Reads the block at the given world coordinates, or `None` when the
    /// chunk does not exist or y is out of range.
    pub(crate) fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockData> {
        let pos = ChunkPos {
            x: x.div_euclid(SECTION_EDGE as i32),
            z: z.div_euclid(SECTION_EDGE as i32),
        };
        let chunk = self.chunks.get(&pos)?;
        chunk.block_at(
            x.rem_euclid(SECTION_EDGE as i32) as u8,
            y,
            z.rem_euclid(SECTION_EDGE as i32) as u8,
        )
    }

    /// Changes the block at the given world coordinates and notifies the
    /// chunk's subscribers. Returns false when no chunk owns the position.
    pub(crate) fn set_block(&mut self, x: i32, y: i32, z: i32, data: BlockData) -> bool {
        let pos = ChunkPos {
            x: x.div_euclid(SECTION_EDGE as i32),
            z: z.div_euclid(SECTION_EDGE as i32),
        };
        let Some(chunk) = self.chunks.get_mut(&pos) else {
            return false;
        };
        let placed = chunk.set_block(
            x.rem_euclid(SECTION_EDGE as i32) as u8,
            y,
            z.rem_euclid(SECTION_EDGE as i32) as u8,
            data,
        );
        if placed {
            chunk.broadcast(&ChunkUpdate::BlockChanged { x, y, z, data });
        }
        placed
    }

    fn broadcast_chat(&self, msg: &Msg) {
        for player in self.players.values() {
            player.send_chat(msg);
        }
    }
}

/// The built-in flat-ish world: a 5x5 grid of chunks with stone layers every
/// five blocks of height.
pub(crate) fn default_chunks() -> HashMap<ChunkPos, Chunk> {
    let mut chunks = HashMap::new();
    for x in -2..=2 {
        for z in -2..=2 {
            let mut chunk = Chunk::new();
            for dx in 0..16u8 {
                for dz in 0..16u8 {
                    for dy in (1..100).step_by(5) {
                        chunk.set_block(dx, dy, dz, BlockData::new(BlockData::STONE_ID, 0));
                    }
                }
            }
            chunks.insert(ChunkPos { x, z }, chunk);
        }
    }
    chunks
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::sync::{mpsc, oneshot};
    use uuid::Uuid;

    use super::{default_chunks, World};
    use crate::game::chunk::{BlockData, Chunk, ChunkPos, ChunkUpdate, SUBSCRIBER_BACKLOG};
    use crate::game::entity::EntityId;
    use crate::game::player::Player;
    use crate::game::GameConfig;
    use crate::protocol::Version;
    use crate::server::conn::PacketSink;

    fn test_player(name: &str) -> Player {
        let (tx, _rx) = mpsc::channel(32);
        let (updates, _updates_rx) = mpsc::channel(SUBSCRIBER_BACKLOG);
        Player::new(
            name.to_string(),
            Uuid::nil(),
            PacketSink::new(tx),
            Version::V1_8,
            updates,
        )
    }

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let world = World::spawn(HashMap::new(), GameConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let seen = seen.clone();
            world.schedule(move |_| seen.lock().unwrap().push(i)).await;
        }

        let (done_tx, done_rx) = oneshot::channel();
        world
            .schedule(move |_| {
                let _ = done_tx.send(());
            })
            .await;
        done_rx.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..100).collect::<Vec<_>>());
        world.close();
    }

    #[tokio::test]
    async fn concurrent_jobs_and_membership_changes_stay_consistent() {
        let world = World::spawn(default_chunks(), GameConfig::default());

        let mut tasks = Vec::new();
        // a few tasks hammering block updates...
        for t in 0..4i32 {
            let world = world.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    world
                        .schedule(move |w| {
                            w.set_block(t, 200 + (i % 50), i % 16, BlockData::new(5, 1));
                        })
                        .await;
                }
            }));
        }
        // ...while others churn the player map through add/remove jobs
        let mut ids = Vec::new();
        for t in 0..4 {
            let player = test_player(&format!("player-{t}"));
            let (id_tx, id_rx) = oneshot::channel();
            world
                .schedule(move |w| {
                    let _ = id_tx.send(crate::game::entity::Entity::entity_id(&player));
                    w.add_player(player);
                })
                .await;
            ids.push(id_rx.await.unwrap());
        }
        for task in tasks {
            task.await.unwrap();
        }
        for id in &ids[..2] {
            let id = *id;
            world.schedule(move |w| w.remove_player(id)).await;
        }

        let (probe_tx, probe_rx) = oneshot::channel::<(usize, Option<BlockData>)>();
        world
            .schedule(move |w| {
                let _ = probe_tx.send((w.players.len(), w.block_at(0, 200, 0)));
            })
            .await;
        let (player_count, block) = probe_rx.await.unwrap();
        assert_eq!(player_count, 2);
        assert_eq!(block, Some(BlockData::new(5, 1)));

        // ids are unique even under concurrent construction
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        world.close();
    }

    #[tokio::test]
    async fn set_block_notifies_chunk_subscribers() {
        let mut chunks = HashMap::new();
        chunks.insert(ChunkPos { x: 0, z: 0 }, Chunk::new());
        let world = World::spawn(chunks, GameConfig::default());

        let (tx, mut rx) = mpsc::channel(SUBSCRIBER_BACKLOG);
        world
            .schedule(move |w| {
                w.chunks
                    .get_mut(&ChunkPos { x: 0, z: 0 })
                    .unwrap()
                    .subscribe(1, tx);
            })
            .await;
        world
            .schedule(|w| {
                assert!(w.set_block(4, 10, 4, BlockData::new(2, 0)));
            })
            .await;

        assert!(matches!(rx.recv().await, Some(ChunkUpdate::Subscribed)));
        match rx.recv().await {
            Some(ChunkUpdate::BlockChanged { x, y, z, data }) => {
                assert_eq!((x, y, z), (4, 10, 4));
                assert_eq!(data, BlockData::new(2, 0));
            }
            other => panic!("expected block change, got {other:?}"),
        }
        world.close();
    }

    #[tokio::test]
    async fn close_stops_the_world() {
        let world = World::spawn(HashMap::new(), GameConfig::default());
        let (alive_tx, alive_rx) = oneshot::channel();
        world
            .schedule(move |_| {
                let _ = alive_tx.send(());
            })
            .await;
        alive_rx.await.unwrap();

        world.close();
        // wait until the loop has actually exited and dropped its receiver
        while !world.jobs.is_closed() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        // jobs scheduled after close never run
        let (tx, rx) = oneshot::channel();
        world
            .schedule(move |_| {
                let _ = tx.send(());
            })
            .await;
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn remove_player_is_a_no_op_for_unknown_ids() {
        let world = World::spawn(HashMap::new(), GameConfig::default());
        world.schedule(|w| w.remove_player(EntityId(999))).await;

        let (probe_tx, probe_rx) = oneshot::channel();
        world
            .schedule(move |w| {
                let _ = probe_tx.send(w.players.len());
            })
            .await;
        assert_eq!(probe_rx.await.unwrap(), 0);
        world.close();
    }
}
