use crate::game::LocalPlayer;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{EntryMode, LogCue, Packet, TileGrid, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, timeout};

/// Headless avatar client: joins a session host, runs entry processing and
/// reports its avatar state until it leaves.
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,
    rejected: bool,

    player: LocalPlayer,
    grid: TileGrid,
    save_path: Option<PathBuf>,
    cue: LogCue,

    fake_ping_ms: u64,
    tick_duration: Duration,
    state_interval: Duration,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        player: LocalPlayer,
        grid: TileGrid,
        save_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            rejected: false,
            player,
            grid,
            save_path,
            cue: LogCue,
            fake_ping_ms,
            tick_duration: Duration::from_micros(16_667),
            state_interval: Duration::from_millis(100),
        })
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut LocalPlayer {
        &mut self.player
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {}...", self.player.avatar.name);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            avatar_name: self.player.avatar.name.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected {
                client_id,
                session_persistence,
            } => {
                if self.connected {
                    debug!("Ignoring duplicate Connected for client {}", client_id);
                    return;
                }
                info!(
                    "Connected! Client ID: {} (session persistence: {})",
                    client_id, session_persistence
                );
                self.client_id = Some(client_id);
                self.connected = true;

                self.player.enter_world(&self.grid, session_persistence);
                if self.player.mode() == EntryMode::Local {
                    self.persist_local();
                }
            }

            Packet::Mod { payload } => {
                if !self.connected {
                    warn!("Mod message before connection was established");
                    return;
                }
                match self.player.handle_mod_message(&payload, &self.grid) {
                    Ok(Some(report)) => {
                        if let Some(notice) = report.notice() {
                            info!("Session position {}", notice);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Dropping malformed mod message: {}", e),
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.rejected = true;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Waits up to `wait` for one packet from the host and handles it.
    /// Returns whether a packet was handled.
    pub async fn poll(&mut self, wait: Duration) -> Result<bool, Box<dyn std::error::Error>> {
        let mut buffer = [0u8; 2048];
        match timeout(wait, self.socket.recv_from(&mut buffer)).await {
            Ok(result) => {
                let (len, _) = result?;
                let packet = deserialize::<Packet>(&buffer[..len])?;
                self.handle_packet(packet);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub async fn send_state(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        let avatar = &self.player.avatar;
        let packet = Packet::AvatarState {
            x: avatar.position.x,
            y: avatar.position.y,
            vel_x: avatar.velocity.x,
            vel_y: avatar.velocity.y,
            alive: avatar.alive,
        };
        self.send_packet(&packet).await
    }

    fn persist_local(&self) {
        let Some(path) = &self.save_path else {
            return;
        };
        if let Err(e) = self
            .player
            .local_exit()
            .persist(path, &self.player.avatar.name)
        {
            error!("Failed to write avatar save {}: {}", path.display(), e);
        }
    }

    /// Departure: capture the local exit record, write the avatar save and
    /// tell the host, which captures its own session record.
    pub async fn leave(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(record) = self.player.leave_world() {
            info!(
                "Saved exit position ({:.1}, {:.1})",
                record.position.x, record.position.y
            );
        }
        self.persist_local();

        if self.connected {
            self.send_packet(&Packet::Disconnect).await?;
            self.connected = false;
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut tick_interval = interval(self.tick_duration);
        let mut state_interval = interval(self.state_interval);

        let mut buffer = [0u8; 2048];

        while !self.rejected {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet);
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    self.player.advance(&mut self.cue);
                },

                _ = state_interval.tick() => {
                    if let Err(e) = self.send_state().await {
                        error!("Error sending avatar state: {}", e);
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Leaving world...");
                    break;
                }
            }
        }

        self.leave().await?;

        Ok(())
    }
}
