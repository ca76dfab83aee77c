//! Connection and player bookkeeping for the city server
//!
//! This module tracks every accepted socket and the player that joined on it:
//! - Connection lifecycle (accept, join, teardown)
//! - Per-connection outbound queues feeding each socket's writer task
//! - Liveness timestamps and forced closing of idle connections
//! - Player id ownership when a second connection claims the same id
//!
//! The manager lives inside the store lock together with the world, so a
//! broadcast enqueued while applying a mutation reaches every client in the
//! order the mutations were applied.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

/// Server-assigned identifier of an accepted socket.
pub type ConnId = u64;

/// Lines a connection may have waiting for its writer before it is treated
/// as stalled and closed. Must hold a full-state resend of a large city.
pub const OUTBOUND_QUEUE_LINES: usize = 65_536;

/// An accepted socket, joined or not
///
/// Holds the sending side of the connection's bounded outbound queue and the
/// signal its read loop selects on to close early.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned by the server
    pub id: ConnId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// Player id bound by `JOIN`, if any
    pub player_id: Option<String>,
    /// Last time any line arrived on this socket, joined or not
    pub last_seen: Instant,
    outbound: mpsc::Sender<String>,
    close: Arc<Notify>,
    /// Set once the queue overflowed; nothing is queued after that
    stalled: AtomicBool,
}

impl Connection {
    /// Queues one line for the writer task without waiting
    ///
    /// A full queue means the peer stopped reading; the connection is closed
    /// and the line dropped. Returns false whenever the line was not queued.
    pub fn send(&self, line: &str) -> bool {
        if self.stalled.load(Ordering::Relaxed) {
            return false;
        }
        match self.outbound.try_send(line.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.stalled.store(true, Ordering::Relaxed);
                warn!(
                    "Outbound queue of connection {} ({}) is full, closing it",
                    self.id, self.addr
                );
                self.close();
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    "Dropping message for connection {} ({}): writer closed",
                    self.id, self.addr
                );
                false
            }
        }
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// Asks the connection's read loop to tear the connection down.
    pub fn close(&self) {
        self.close.notify_one();
    }
}

/// A joined player
#[derive(Debug)]
pub struct Player {
    /// Client-asserted identifier, unique among live connections
    pub id: String,
    /// Display name attached to cursor broadcasts
    pub name: String,
    /// Connection currently owning this id
    pub conn: ConnId,
    /// Last time any message arrived from this player
    pub last_seen: Instant,
}

impl Player {
    /// Returns true if nothing arrived from this player within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// How a `JOIN` was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection now owns the id. `replaced` names the connection that
    /// owned it before and has been asked to close.
    Joined { replaced: Option<ConnId> },
    /// The connection had already joined; its binding is unchanged.
    AlreadyJoined,
    /// The connection is not registered (already torn down).
    UnknownConnection,
}

/// All open connections and the players bound to them
pub struct ClientManager {
    connections: HashMap<ConnId, Connection>,
    players: HashMap<String, Player>,
    next_conn_id: ConnId,
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            players: HashMap::new(),
            next_conn_id: 1,
        }
    }

    /// Registers a freshly accepted socket
    ///
    /// The connection receives no broadcasts until it joins.
    pub fn register(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
        close: Arc<Notify>,
    ) -> ConnId {
        let id = self.next_conn_id;
        self.next_conn_id += 1;

        self.connections.insert(
            id,
            Connection {
                id,
                addr,
                player_id: None,
                last_seen: Instant::now(),
                outbound,
                close,
                stalled: AtomicBool::new(false),
            },
        );
        id
    }

    /// Binds a player id and display name to a connection
    ///
    /// If the id is held by another live connection, that connection loses
    /// the id and is asked to close; its teardown will not announce a
    /// disconnect for an id it no longer owns.
    pub fn join(&mut self, conn: ConnId, id: &str, name: &str) -> JoinOutcome {
        let Some(connection) = self.connections.get_mut(&conn) else {
            return JoinOutcome::UnknownConnection;
        };
        if connection.player_id.is_some() {
            return JoinOutcome::AlreadyJoined;
        }
        connection.player_id = Some(id.to_string());
        let addr = connection.addr;

        let replaced = self
            .players
            .get(id)
            .map(|previous| previous.conn)
            .filter(|previous| *previous != conn);

        if let Some(previous) = replaced.and_then(|c| self.connections.get_mut(&c)) {
            warn!(
                "Player {} rejoined from {}, closing connection {}",
                id, addr, previous.id
            );
            previous.player_id = None;
            previous.close();
        }

        self.players.insert(
            id.to_string(),
            Player {
                id: id.to_string(),
                name: name.to_string(),
                conn,
                last_seen: Instant::now(),
            },
        );
        info!("Player {} ({}) joined from {}", id, name, addr);

        JoinOutcome::Joined { replaced }
    }

    /// Removes a connection and, if it still owns one, its player
    ///
    /// Returns the id of the removed player so the caller can announce the
    /// disconnect.
    pub fn remove_connection(&mut self, conn: ConnId) -> Option<String> {
        let connection = self.connections.remove(&conn)?;
        let player_id = connection.player_id?;

        match self.players.get(&player_id) {
            Some(player) if player.conn == conn => {
                self.players.remove(&player_id);
                info!("Player {} disconnected", player_id);
                Some(player_id)
            }
            _ => None,
        }
    }

    /// The player bound to a connection
    pub fn player_for(&self, conn: ConnId) -> Option<&Player> {
        let id = self.connections.get(&conn)?.player_id.as_ref()?;
        self.players.get(id)
    }

    /// Refreshes the liveness timestamps of `conn` and of the player on it
    pub fn touch(&mut self, conn: ConnId) {
        let Some(connection) = self.connections.get_mut(&conn) else {
            return;
        };
        connection.last_seen = Instant::now();
        let Some(id) = connection.player_id.as_ref() else {
            return;
        };
        if let Some(player) = self.players.get_mut(id) {
            player.last_seen = Instant::now();
        }
    }

    /// Asks every connection idle for longer than `timeout` to close
    ///
    /// Joined connections are judged by their player's timestamp, connections
    /// that never joined by their own. Entries are not removed here; the read
    /// loop of each closed connection performs the normal teardown. Returns
    /// the closed connection ids in ascending order.
    pub fn close_idle(&self, timeout: Duration) -> Vec<ConnId> {
        let mut closed = Vec::new();

        for connection in self.connections.values() {
            let owner = connection
                .player_id
                .as_ref()
                .and_then(|id| self.players.get(id))
                .filter(|player| player.conn == connection.id);

            let idle = match owner {
                Some(player) => player.is_timed_out(timeout),
                None => connection.is_idle(timeout),
            };
            if !idle {
                continue;
            }

            match owner {
                Some(player) => info!(
                    "Player {} idle for {:?}, closing connection",
                    player.id,
                    player.last_seen.elapsed()
                ),
                None => info!(
                    "Connection {} ({}) idle for {:?} without joining, closing it",
                    connection.id,
                    connection.addr,
                    connection.last_seen.elapsed()
                ),
            }
            connection.close();
            closed.push(connection.id);
        }

        closed.sort_unstable();
        closed
    }

    /// Closes every connection and forgets all players
    pub fn close_all(&mut self) {
        for connection in self.connections.values() {
            connection.close();
        }
        self.connections.clear();
        self.players.clear();
    }

    pub fn connection(&self, conn: ConnId) -> Option<&Connection> {
        self.connections.get(&conn)
    }

    /// Connections that completed `JOIN` and currently own their id
    pub fn joined(&self) -> impl Iterator<Item = &Connection> {
        self.players
            .values()
            .filter_map(|player| self.connections.get(&player.conn))
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Returns the number of joined players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Returns the number of open connections, joined or not
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
