//! Game state: worlds, chunks and entities.
//!
//! To run game logic in parallel without fine-grained locking, every world
//! owns a single tokio task which is the only code allowed to touch that
//! world's chunks and entities. Anything running elsewhere (connection
//! tasks, other worlds) interacts with a world by scheduling a job closure
//! through its [`world::WorldHandle`]; the closure then runs on the world's
//! own task with exclusive access to its state. Jobs submitted through one
//! handle run in the order they were enqueued, interleaved with entity ticks
//! only at tick boundaries.
//!
//! Functions on world-owned types must only be called from the owning
//! world's task unless their documentation explicitly says otherwise.

pub(crate) mod chunk;
pub(crate) mod entity;
pub(crate) mod player;
pub(crate) mod world;

use std::time::Duration;

/// Tuning knobs for a world's job queue and tick loop.
#[derive(Debug, Clone)]
pub(crate) struct GameConfig {
    /// How many jobs can be queued at the same time.
    pub(crate) max_jobs: usize,
    /// How often entities are ticked.
    pub(crate) tick_interval: Duration,
    /// Chunks further than this (Chebyshev, in chunks) from a player are
    /// unloaded for them.
    pub(crate) view_distance: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_jobs: 100,
            tick_interval: Duration::from_secs(1),
            view_distance: 2,
        }
    }
}
