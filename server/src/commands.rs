//! Applies decoded client commands to the store and announces the results.
//!
//! Malformed lines are dropped without a reply. Rule violations are answered
//! with a `STATUS` notice to the sending connection only. Everything else is
//! committed and broadcast.

use crate::client_manager::{ConnId, JoinOutcome};
use crate::error::Rejection;
use crate::game::Removed;
use crate::state::ServerState;
use log::{debug, warn};
use shared::{ClientCommand, InfraKind, Point, Segment, ServerMessage};

/// Handles one inbound line from `conn`. The caller holds the store lock.
pub fn handle_line(state: &mut ServerState, conn: ConnId, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    state.clients.touch(conn);

    let Some(command) = ClientCommand::parse(line) else {
        debug!("Dropping malformed line from connection {}: {:?}", conn, line);
        return;
    };

    match command {
        ClientCommand::Join { id, name } => join(state, conn, &id, &name),
        ClientCommand::Ping => {}
        command => {
            let Some(player) = state.clients.player_for(conn) else {
                debug!("Dropping command from unjoined connection {}", conn);
                return;
            };
            if command.player_id() != Some(player.id.as_str()) {
                warn!(
                    "Connection {} sent a command for {:?} while joined as {}",
                    conn,
                    command.player_id(),
                    player.id
                );
                return;
            }
            let player_id = player.id.clone();
            let player_name = player.name.clone();

            match command {
                ClientCommand::Cursor { position, .. } => {
                    cursor(state, conn, player_id, player_name, position)
                }
                ClientCommand::Infrastructure {
                    start, end, kind, ..
                } => add_infrastructure(state, conn, line, player_id, start, end, kind),
                ClientCommand::Building {
                    position,
                    kind_code,
                    ..
                } => add_building(state, conn, line, &player_id, position, kind_code),
                ClientCommand::BusRoute { nodes, .. } => {
                    add_bus_route(state, conn, line, &player_id, nodes)
                }
                ClientCommand::Delete { position, .. } => delete_object(state, conn, position),
                ClientCommand::Join { .. } | ClientCommand::Ping => {}
            }
        }
    }
}

fn join(state: &mut ServerState, conn: ConnId, id: &str, name: &str) {
    match state.clients.join(conn, id, name) {
        JoinOutcome::Joined { .. } | JoinOutcome::AlreadyJoined => {
            state.clients.send_full_state(conn, &state.world);
            state.clients.broadcast_money(state.world.money);
        }
        JoinOutcome::UnknownConnection => {
            debug!("JOIN from connection {} after teardown", conn);
        }
    }
}

fn cursor(state: &ServerState, conn: ConnId, id: String, name: String, position: Point) {
    let message = ServerMessage::Cursor { id, name, position };
    state.clients.broadcast_others(&message.to_string(), conn);
}

fn add_infrastructure(
    state: &mut ServerState,
    conn: ConnId,
    line: &str,
    owner: String,
    start: Point,
    end: Point,
    kind: InfraKind,
) {
    let segment = Segment {
        start,
        end,
        kind,
        owner,
    };

    match state.world.add_infrastructure(segment) {
        Ok(_) => {
            if kind == InfraKind::Road {
                state.clients.broadcast_money(state.world.money);
            }
            state.clients.broadcast_all(line);
        }
        Err(rejection) => reject(state, conn, rejection),
    }
}

fn add_building(
    state: &mut ServerState,
    conn: ConnId,
    line: &str,
    owner: &str,
    position: Point,
    kind_code: i32,
) {
    match state.world.add_building(owner, position, kind_code) {
        Ok(_) => {
            state.clients.broadcast_money(state.world.money);
            state.clients.broadcast_all(line);
        }
        Err(rejection) => reject(state, conn, rejection),
    }
}

fn add_bus_route(
    state: &mut ServerState,
    conn: ConnId,
    line: &str,
    owner: &str,
    nodes: Vec<Point>,
) {
    match state.world.add_bus_route(owner, nodes) {
        Ok(bus_index) => {
            state.clients.broadcast_all(line);
            if let Some(bus) = state.world.buses.get(bus_index) {
                let message = ServerMessage::Bus {
                    index: bus_index,
                    position: bus.position,
                };
                state.clients.broadcast_all(&message.to_string());
            }
        }
        Err(rejection) => reject(state, conn, rejection),
    }
}

fn delete_object(state: &mut ServerState, conn: ConnId, target: Point) {
    match state.world.delete_at(target) {
        Ok(deletion) => {
            debug!(
                "Connection {} deleted {:?} at ({:.0}, {:.0}), {} routes pruned",
                conn, deletion.removed, target.x, target.y, deletion.pruned_routes
            );
            let money_changed = matches!(
                deletion.removed,
                Removed::Building(_)
                    | Removed::Segment {
                        kind: InfraKind::Road,
                        ..
                    }
            );
            if money_changed {
                state.clients.broadcast_money(state.world.money);
            }
            state.clients.broadcast_full_resync(&state.world);
        }
        Err(rejection) => reject(state, conn, rejection),
    }
}

fn reject(state: &ServerState, conn: ConnId, rejection: Rejection) {
    debug!("Rejected command from connection {}: {}", conn, rejection);
    let message = ServerMessage::Status(rejection.to_string());
    state.clients.send_to(conn, &message.to_string());
}
