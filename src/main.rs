use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use log::{error, info};

use crate::game::world::{default_chunks, World};
use crate::game::GameConfig;
use crate::server::{Server, ServerConfig};

mod chat;
mod err;
mod game;
mod protocol;
mod server;

/// Reads `OXMINE_<key>` from the environment, falling back to the default
/// when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(format!("OXMINE_{key}"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn server_config() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        addr: env_or("ADDR", defaults.addr),
        max_packet_size: env_or("MAX_PACKET_SIZE", defaults.max_packet_size),
        timeout_secs: env_or("TIMEOUT_SECS", defaults.timeout_secs),
        motd: env_or("MOTD", defaults.motd),
        max_players: env_or("MAX_PLAYERS", defaults.max_players),
    }
}

fn game_config() -> GameConfig {
    let defaults = GameConfig::default();
    GameConfig {
        max_jobs: env_or("MAX_JOBS", defaults.max_jobs),
        tick_interval: Duration::from_millis(env_or(
            "TICK_INTERVAL_MS",
            defaults.tick_interval.as_millis() as u64,
        )),
        view_distance: env_or("VIEW_DISTANCE", defaults.view_distance),
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let world = World::spawn(default_chunks(), game_config());

    let server = match Server::new(server_config(), world.clone()).await {
        Ok(server) => server,
        Err(err) => {
            error!("failed to start: {err}");
            std::process::exit(1);
        }
    };
    match server.addr() {
        Ok(addr) => info!("server listening on {addr}"),
        Err(err) => info!("server listening (local addr unavailable: {err})"),
    }

    tokio::select! {
        result = server.listen_and_serve() => {
            if let Err(err) = result {
                error!("server execution failed: {err}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            server.close();
        }
    }

    world.close();
}
