//! Fan-out of outbound lines to joined connections.
//!
//! Sending only enqueues onto a connection's bounded outbound queue, so these
//! helpers never wait on a socket even though they run under the store lock.
//! A connection whose queue is full is closed and skipped; the others still
//! receive the line.

use crate::client_manager::{ClientManager, ConnId};
use crate::game::World;
use shared::ServerMessage;

impl ClientManager {
    /// Sends to every joined player.
    pub fn broadcast_all(&self, line: &str) {
        for connection in self.joined() {
            connection.send(line);
        }
    }

    /// Sends to every joined player except the one on `exclude`.
    pub fn broadcast_others(&self, line: &str, exclude: ConnId) {
        for connection in self.joined().filter(|c| c.id != exclude) {
            connection.send(line);
        }
    }

    pub fn send_to(&self, conn: ConnId, line: &str) {
        if let Some(connection) = self.connection(conn) {
            connection.send(line);
        }
    }

    pub fn broadcast_money(&self, money: f64) {
        self.broadcast_all(&ServerMessage::Money(money).to_string());
    }

    /// Sends the complete world to one connection, ending with `STATE_SYNCED`.
    pub fn send_full_state(&self, conn: ConnId, world: &World) {
        let Some(connection) = self.connection(conn) else {
            return;
        };
        for message in world.snapshot() {
            if !connection.send(&message.to_string()) {
                break;
            }
        }
    }

    /// `STATE_RESET` followed by a full resend, for every joined player.
    pub fn broadcast_full_resync(&self, world: &World) {
        let snapshot: Vec<String> = world.snapshot().iter().map(|m| m.to_string()).collect();
        let reset = ServerMessage::StateReset.to_string();

        for connection in self.joined() {
            if !connection.send(&reset) {
                continue;
            }
            for line in &snapshot {
                if !connection.send(line) {
                    break;
                }
            }
        }
    }
}
