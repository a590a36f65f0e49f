//! Connection tracking for the session host
//!
//! This module handles the server-side bookkeeping of connected avatar clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Avatar name ownership, so one name maps to one live connection
//! - Connection health monitoring and automatic cleanup
//! - Client capacity management and address tracking
//!
//! Restore messages are routed through the address recorded here, which is
//! what keeps them addressed to a single connection instead of broadcast.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long a client may stay silent before it is dropped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents a connected client and the avatar it controls
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Avatar name, unique within the session
    pub avatar_name: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, avatar_name: String) -> Self {
        Self {
            id,
            addr,
            avatar_name,
            last_seen: Instant::now(),
        }
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no packets have been received from this client
    /// within the specified timeout duration, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Why a connection attempt was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    ServerFull,
    NameInUse,
}

impl JoinRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            JoinRejection::ServerFull => "Server full",
            JoinRejection::NameInUse => "Name already in use",
        }
    }
}

/// Manages all connected clients
///
/// The ClientManager provides centralized control over client connections,
/// enforces server capacity limits and keeps avatar names unique, since the
/// session's exit positions are keyed by name.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Fails if the server is at capacity or another live connection already
    /// controls an avatar with the same name.
    pub fn add_client(&mut self, addr: SocketAddr, avatar_name: &str) -> Result<u32, JoinRejection> {
        if self.clients.len() >= self.max_clients {
            return Err(JoinRejection::ServerFull);
        }
        if self.find_client_by_name(avatar_name).is_some() {
            return Err(JoinRejection::NameInUse);
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr, avatar_name.to_string());
        info!(
            "Client {} ({}) connected from {}",
            client_id, avatar_name, addr
        );
        self.clients.insert(client_id, client);

        Ok(client_id)
    }

    /// Removes a client from the server
    ///
    /// Returns true if the client was found and removed, false if they were
    /// already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.avatar_name);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn find_client_by_name(&self, avatar_name: &str) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.avatar_name == avatar_name)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Marks the client as recently heard from. Returns false for unknown IDs.
    pub fn touch(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
            true
        } else {
            false
        }
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed client IDs so the session can capture their
    /// avatars' last positions.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
