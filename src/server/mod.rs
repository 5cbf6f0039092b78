pub(crate) mod conn;
pub(crate) mod login;
pub(crate) mod play;
pub(crate) mod status;
pub(crate) mod uuid;

use std::net::SocketAddr;

use log::debug;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::game::world::WorldHandle;
use crate::server::conn::Conn;

/// What the connection layer needs to know about the outside world. Built
/// once at startup by the startup collaborator and treated as read-only.
#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    /// Address to bind to, such as "127.0.0.1:25565".
    pub(crate) addr: String,
    /// Maximum size of a single inbound packet, in bytes.
    pub(crate) max_packet_size: i32,
    /// Seconds a read or write may stall before the connection is dropped.
    pub(crate) timeout_secs: u64,
    /// Text shown in the client's server list.
    pub(crate) motd: String,
    /// Player capacity shown in the client's server list.
    pub(crate) max_players: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:25565".to_string(),
            max_packet_size: 1 << 16,
            timeout_secs: 20,
            motd: "Hello world".to_string(),
            max_players: 20,
        }
    }
}

/// Accepts connections and spawns one task per client. The accept loop never
/// dies because of a single connection: connection errors are logged and the
/// socket closed, nothing else.
pub(crate) struct Server {
    cfg: ServerConfig,
    listener: TcpListener,
    world: WorldHandle,
    shutdown: Notify,
}

impl Server {
    pub(crate) async fn new(cfg: ServerConfig, world: WorldHandle) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&cfg.addr).await?;
        Ok(Self {
            cfg,
            listener,
            world,
            shutdown: Notify::new(),
        })
    }

    /// The address actually bound, which matters when the config asked for
    /// port 0.
    pub(crate) fn addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until [`Server::close`] is called or accepting fails.
    pub(crate) async fn listen_and_serve(&self) -> std::io::Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return Ok(()),
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!("new connection from {peer}");
                    let cfg = self.cfg.clone();
                    let world = self.world.clone();
                    // tokio contains a panicking task, so a connection that
                    // trips an invariant cannot take the process down
                    tokio::spawn(handle_conn(stream, peer, cfg, world));
                }
            }
        }
    }

    /// Stops the accept loop. Idempotent. Already-accepted connections keep
    /// running.
    pub(crate) fn close(&self) {
        self.shutdown.notify_one();
    }
}

async fn handle_conn(stream: TcpStream, peer: SocketAddr, cfg: ServerConfig, world: WorldHandle) {
    let mut conn = Conn::new(stream, peer, &cfg);
    match conn.handle(&cfg, &world).await {
        Ok(()) => debug!("connection closed src={peer}"),
        Err(err) if err.is_fatal() => debug!("connection error src={peer}: {err}"),
        Err(err) => debug!("connection error (recovered) src={peer}: {err}"),
    }
    conn.close();
}
