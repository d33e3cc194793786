//! Client transport and session pump
//!
//! The frame loop talks to the server only through [`EventChannel`]. The
//! UDP implementation runs the socket on background tokio tasks and hands
//! decoded packets across unbounded channels, so the frame loop never
//! blocks and all game-state mutation stays on one thread.

use crate::game::MoveInput;
use crate::sync::{PresentationHooks, SyncEngine};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ClientPacket, ServerPacket, CLIENT_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::sleep;

/// Upper bound on inbound packets applied per frame.
pub const MAX_PACKETS_PER_PUMP: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("transport channel closed")]
    Closed,
}

/// Typed, already-decoded packet stream to and from the server.
pub trait EventChannel {
    /// Next pending inbound packet, if any. Never blocks.
    fn try_recv(&mut self) -> Result<Option<ServerPacket>, ChannelError>;

    fn send(&mut self, packet: ClientPacket) -> Result<(), ChannelError>;
}

/// Client half of an in-process packet pipe.
pub struct PacketChannel {
    inbound: mpsc::UnboundedReceiver<ServerPacket>,
    outbound: mpsc::UnboundedSender<ClientPacket>,
}

/// Far half of a [`PacketChannel`]: whatever feeds server packets in and consumes client packets.
pub struct RemoteEnd {
    pub to_client: mpsc::UnboundedSender<ServerPacket>,
    pub from_client: mpsc::UnboundedReceiver<ClientPacket>,
}

impl PacketChannel {
    pub fn pair() -> (PacketChannel, RemoteEnd) {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        (
            PacketChannel { inbound, outbound },
            RemoteEnd {
                to_client,
                from_client,
            },
        )
    }
}

impl EventChannel for PacketChannel {
    fn try_recv(&mut self) -> Result<Option<ServerPacket>, ChannelError> {
        match self.inbound.try_recv() {
            Ok(packet) => Ok(Some(packet)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    fn send(&mut self, packet: ClientPacket) -> Result<(), ChannelError> {
        self.outbound.send(packet).map_err(|_| ChannelError::Closed)
    }
}

/// Binds a UDP socket and wires it to a [`PacketChannel`] on `runtime`.
///
/// `fake_ping_ms` adds half the given latency to each direction.
pub fn connect_udp(
    runtime: &Handle,
    server_addr: &str,
    fake_ping_ms: u64,
) -> Result<PacketChannel, Box<dyn std::error::Error>> {
    let server_addr: SocketAddr = server_addr.parse()?;
    let socket = Arc::new(runtime.block_on(UdpSocket::bind("0.0.0.0:0"))?);
    info!("Bound {} for server {}", socket.local_addr()?, server_addr);

    let (channel, remote) = PacketChannel::pair();
    let delay = Duration::from_millis(fake_ping_ms / 2);

    runtime.spawn(receive_loop(
        Arc::clone(&socket),
        server_addr,
        remote.to_client,
        delay,
    ));
    runtime.spawn(send_loop(socket, server_addr, remote.from_client, delay));

    Ok(channel)
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    to_client: mpsc::UnboundedSender<ServerPacket>,
    delay: Duration,
) {
    let mut buffer = [0u8; 65536];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, addr)) => {
                if addr != server_addr {
                    warn!("Dropping datagram from unexpected peer {}", addr);
                    continue;
                }

                let packet = match deserialize::<ServerPacket>(&buffer[0..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Failed to decode server packet: {}", e);
                        continue;
                    }
                };

                if !delay.is_zero() {
                    sleep(delay).await;
                }

                if to_client.send(packet).is_err() {
                    debug!("Client side closed, stopping receiver");
                    break;
                }
            }
            Err(e) => {
                error!("Error receiving packet: {}", e);
                sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn send_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    mut from_client: mpsc::UnboundedReceiver<ClientPacket>,
    delay: Duration,
) {
    while let Some(packet) = from_client.recv().await {
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let data = match serialize(&packet) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode {:?}: {}", packet, e);
                continue;
            }
        };

        if let Err(e) = socket.send_to(&data, server_addr).await {
            error!("Error sending packet: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected(u32),
    Disconnected,
}

/// Couples a [`SyncEngine`] with the channel that feeds it.
pub struct Session<C: EventChannel> {
    channel: C,
    engine: SyncEngine,
    status: ConnectionStatus,
}

impl<C: EventChannel> Session<C> {
    pub fn new(channel: C, engine: SyncEngine) -> Self {
        Self {
            channel,
            engine,
            status: ConnectionStatus::Connecting,
        }
    }

    /// Sends the connection handshake.
    pub fn start(&mut self) -> Result<(), ChannelError> {
        let profile = self.engine.profile();
        info!("Connecting as {} ({})...", profile.name, profile.color);

        let packet = ClientPacket::Connect {
            client_version: CLIENT_VERSION,
            name: profile.name.clone(),
            color: profile.color.clone(),
        };
        self.channel.send(packet)
    }

    /// Applies every pending inbound packet, up to [`MAX_PACKETS_PER_PUMP`].
    ///
    /// Returns how many packets were applied.
    pub fn pump<H>(&mut self, hooks: &mut H) -> usize
    where
        H: PresentationHooks + ?Sized,
    {
        let mut applied = 0;

        while applied < MAX_PACKETS_PER_PUMP {
            let packet = match self.channel.try_recv() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(e) => {
                    self.mark_disconnected(e);
                    break;
                }
            };

            match &packet {
                ServerPacket::Connected { client_id } => {
                    self.status = ConnectionStatus::Connected(*client_id);
                }
                ServerPacket::Disconnected { .. } => {
                    self.status = ConnectionStatus::Disconnected;
                }
                _ => {}
            }

            let outbound = self.engine.handle(packet, hooks);
            self.send_all(outbound);
            applied += 1;
        }

        applied
    }

    /// Runs one frame of local input and forwards what it produces.
    pub fn tick(&mut self, input: &MoveInput, dt: f32) {
        let outbound = self.engine.drive_local(input, dt);
        self.send_all(outbound);
    }

    /// Announces departure if still connected.
    pub fn shutdown(&mut self) {
        if let ConnectionStatus::Connected(_) = self.status {
            let _ = self.channel.send(ClientPacket::Disconnect);
            self.status = ConnectionStatus::Disconnected;
        }
    }

    fn send_all(&mut self, packets: Vec<ClientPacket>) {
        for packet in packets {
            if let Err(e) = self.channel.send(packet) {
                self.mark_disconnected(e);
                return;
            }
        }
    }

    fn mark_disconnected(&mut self, e: ChannelError) {
        if self.status != ConnectionStatus::Disconnected {
            error!("Lost connection: {}", e);
        }
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }
}
