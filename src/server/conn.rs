use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::chat::{Color, Msg};
use crate::err::ProtError;
use crate::game::world::WorldHandle;
use crate::protocol::io::{PacketReader, PacketWriter};
use crate::protocol::packets::{client, Inbound, Outbound};
use crate::protocol::{State, Version};
use crate::server::{login, play, status, ServerConfig};

/// How many outbound packets may be queued per connection before the peer is
/// considered too slow and packets are dropped.
pub(crate) const OUTBOUND_QUEUE_SIZE: usize = 100;

/// A client connection: the read half plus the sending side of the write
/// queue. A dedicated task owns the write half and drains the queue, so
/// writes never block whoever produced the packet.
pub(crate) struct Conn {
    reader: PacketReader<BufReader<OwnedReadHalf>>,
    outbound: mpsc::Sender<Outbound>,
    state: State,
    version: Arc<AtomicI32>,
    timeout: Duration,
    closed: Arc<AtomicBool>,
    peer: SocketAddr,
}

impl Conn {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, cfg: &ServerConfig) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let version = Arc::new(AtomicI32::new(Version::V1_8.protocol()));
        let timeout = Duration::from_secs(cfg.timeout_secs);

        tokio::spawn(dispatch_packets(
            PacketWriter::new(BufWriter::new(write_half)),
            queue,
            version.clone(),
            timeout,
            peer,
        ));

        Self {
            reader: PacketReader::new(BufReader::new(read_half), cfg.max_packet_size),
            outbound,
            state: State::Handshake,
            version,
            timeout,
            closed: Arc::new(AtomicBool::new(false)),
            peer,
        }
    }

    /// Drives the connection through its entire lifecycle. Any error is
    /// fatal to this connection only.
    pub(crate) async fn handle(
        &mut self,
        cfg: &ServerConfig,
        world: &WorldHandle,
    ) -> Result<(), ProtError> {
        let hs = self.read_handshake().await?;
        debug!(
            "{}: handshake version={} address={}:{} next={}",
            self.peer, hs.protocol_version, hs.server_address, hs.server_port, hs.next_state
        );
        self.version.store(hs.protocol_version.value, Ordering::Relaxed);

        match hs.next_state.value {
            1 => {
                self.state = State::Status;
                status::handle_status(self, cfg).await
            }
            2 => {
                self.state = State::Login;
                if Version::from_protocol(hs.protocol_version.value).is_none() {
                    self.disconnect(Msg::new("Please use Minecraft 1.7.6-1.8.9!").color(Color::Red))
                        .await;
                    return Ok(());
                }

                let (username, id) = login::handle_login(self).await?;
                info!("player logged in name={username} id={id}");
                self.state = State::Play;

                let result = play::handle_play(self, username.clone(), id, world).await;
                info!("player disconnected name={username}");
                result
            }
            v => Err(ProtError::InvalidNextState(v)),
        }
    }

    async fn read_handshake(&mut self) -> Result<crate::protocol::packets::server::Handshake, ProtError> {
        match self.read_packet().await? {
            Some(Inbound::Handshake(hs)) => Ok(hs),
            _ => Err(ProtError::UnexpectedPacket("handshake")),
        }
    }

    /// Reads one packet under the configured deadline. `None` means a packet
    /// the decode table does not know; the connection stays healthy.
    pub(crate) async fn read_packet(&mut self) -> Result<Option<Inbound>, ProtError> {
        let version = self.version();
        match tokio::time::timeout(self.timeout, self.reader.read_packet(self.state, version))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProtError::Timeout),
        }
    }

    /// Queues a packet for the write-dispatch task. May be called
    /// concurrently.
    pub(crate) async fn write_packet(&self, pk: Outbound) {
        if self.outbound.send(pk).await.is_err() {
            debug!("{}: write queue is gone, packet dropped", self.peer);
        }
    }

    /// A cloneable handle for queueing packets from world tasks.
    pub(crate) fn sink(&self) -> PacketSink {
        PacketSink::new(self.outbound.clone())
    }

    pub(crate) fn version(&self) -> Version {
        Version::from_protocol(self.version.load(Ordering::Relaxed)).unwrap_or(Version::V1_8)
    }

    /// Kicks the client with a reason. The packet is queued before the close
    /// and the write queue drains fully, so the reason reaches the peer.
    pub(crate) async fn disconnect(&mut self, reason: Msg) {
        debug!("{}: disconnecting: {}", self.peer, reason);
        match self.state {
            State::Login => {
                self.write_packet(Outbound::LoginDisconnect(client::LoginDisconnect::new(
                    reason,
                )))
                .await;
            }
            State::Play => {
                self.write_packet(Outbound::Disconnect(client::Disconnect::new(reason)))
                    .await;
            }
            _ => {}
        }
        self.close();
    }

    /// Marks the connection closed. Only the first call has any effect. The
    /// socket itself closes once the write queue has drained: dropping every
    /// sender ends the dispatch task, which flushes and shuts the stream
    /// down, guaranteeing delivery of already-queued packets.
    pub(crate) fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("{}: connection closed", self.peer);
        }
    }

    /// Whether [`Conn::close`] has been called. May be called concurrently.
    pub(crate) fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// The write half of a connection, shareable with world tasks. Sends are
/// non-blocking: a peer that stops reading fills its queue and starts losing
/// packets instead of stalling the world.
#[derive(Clone)]
pub(crate) struct PacketSink {
    tx: mpsc::Sender<Outbound>,
}

impl PacketSink {
    pub(crate) fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, pk: Outbound) {
        match self.tx.try_send(pk) {
            Ok(()) => {}
            Err(TrySendError::Full(pk)) => {
                debug!("outbound queue full, dropping {:?}", pk.packet_id());
            }
            // the connection is gone; the leave job will clean us up
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Drains the outbound queue onto the socket until every sender is gone or a
/// write fails, then flushes and closes the stream. Queued packets are still
/// dispatched after the connection is marked closed, which is what makes
/// "write Disconnect, then close" reliable.
async fn dispatch_packets(
    mut writer: PacketWriter<BufWriter<OwnedWriteHalf>>,
    mut queue: mpsc::Receiver<Outbound>,
    version: Arc<AtomicI32>,
    timeout: Duration,
    peer: SocketAddr,
) {
    while let Some(pk) = queue.recv().await {
        let version =
            Version::from_protocol(version.load(Ordering::Relaxed)).unwrap_or(Version::V1_8);
        match tokio::time::timeout(timeout, writer.write_packet(&pk, version)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!("{peer}: failed to dispatch packet: {err}");
                break;
            }
            Err(_) => {
                debug!("{peer}: write deadline exceeded");
                break;
            }
        }
    }
    writer.shutdown().await;
}
