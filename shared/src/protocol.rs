//! Line protocol: colon-delimited ASCII fields, one message per `\n`-terminated line.
//!
//! Parsing is strict. A line with the wrong number of fields, an unparsable
//! or non-finite number, or an unknown infrastructure kind yields `None` and
//! is meant to be dropped without a reply.

use crate::geometry::Point;
use crate::model::{BuildingKind, InfraKind};
use std::fmt;

/// Commands a client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Join {
        id: String,
        name: String,
    },
    Ping,
    Cursor {
        id: String,
        position: Point,
    },
    Infrastructure {
        id: String,
        start: Point,
        end: Point,
        kind: InfraKind,
    },
    /// The kind stays a raw code so that an unknown kind can be rejected
    /// with a status notice instead of being dropped.
    Building {
        id: String,
        position: Point,
        kind_code: i32,
    },
    BusRoute {
        id: String,
        nodes: Vec<Point>,
    },
    Delete {
        id: String,
        position: Point,
    },
}

impl ClientCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(':').collect();

        match (parts[0], parts.len()) {
            ("JOIN", 3) => Some(ClientCommand::Join {
                id: parts[1].to_string(),
                name: parts[2].to_string(),
            }),
            ("PING", 1) => Some(ClientCommand::Ping),
            ("C", 4) => Some(ClientCommand::Cursor {
                id: parts[1].to_string(),
                position: parse_point(parts[2], parts[3])?,
            }),
            ("I", 7) => Some(ClientCommand::Infrastructure {
                id: parts[1].to_string(),
                start: parse_point(parts[2], parts[3])?,
                end: parse_point(parts[4], parts[5])?,
                kind: InfraKind::from_code(parts[6].parse().ok()?)?,
            }),
            ("B", 5) => Some(ClientCommand::Building {
                id: parts[1].to_string(),
                position: parse_point(parts[2], parts[3])?,
                kind_code: parts[4].parse().ok()?,
            }),
            ("R", n) if n >= 6 && n % 2 == 0 => Some(ClientCommand::BusRoute {
                id: parts[1].to_string(),
                nodes: parse_points(&parts[2..])?,
            }),
            ("D", 4) => Some(ClientCommand::Delete {
                id: parts[1].to_string(),
                position: parse_point(parts[2], parts[3])?,
            }),
            _ => None,
        }
    }

    /// The player id carried in the command, if it has one.
    pub fn player_id(&self) -> Option<&str> {
        match self {
            ClientCommand::Ping => None,
            ClientCommand::Join { id, .. }
            | ClientCommand::Cursor { id, .. }
            | ClientCommand::Infrastructure { id, .. }
            | ClientCommand::Building { id, .. }
            | ClientCommand::BusRoute { id, .. }
            | ClientCommand::Delete { id, .. } => Some(id),
        }
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Join { id, name } => write!(f, "JOIN:{id}:{name}"),
            ClientCommand::Ping => write!(f, "PING"),
            ClientCommand::Cursor { id, position } => {
                write!(f, "C:{id}:{:.0}:{:.0}", position.x, position.y)
            }
            ClientCommand::Infrastructure {
                id,
                start,
                end,
                kind,
            } => write!(
                f,
                "I:{id}:{:.0}:{:.0}:{:.0}:{:.0}:{}",
                start.x,
                start.y,
                end.x,
                end.y,
                kind.code()
            ),
            ClientCommand::Building {
                id,
                position,
                kind_code,
            } => write!(f, "B:{id}:{:.0}:{:.0}:{kind_code}", position.x, position.y),
            ClientCommand::BusRoute { id, nodes } => {
                write!(f, "R:{id}")?;
                write_nodes(f, nodes)
            }
            ClientCommand::Delete { id, position } => {
                write!(f, "D:{id}:{:.0}:{:.0}", position.x, position.y)
            }
        }
    }
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Discard the local mirror; a full resend terminated by `StateSynced` follows.
    StateReset,
    StateSynced,
    Money(f64),
    Status(String),
    Disconnect(String),
    Bus {
        index: usize,
        position: Point,
    },
    Cursor {
        id: String,
        name: String,
        position: Point,
    },
    Infrastructure {
        owner: String,
        start: Point,
        end: Point,
        kind: InfraKind,
    },
    Building {
        owner: String,
        position: Point,
        kind: BuildingKind,
    },
    BusRoute {
        owner: String,
        nodes: Vec<Point>,
    },
}

impl ServerMessage {
    pub fn parse(line: &str) -> Option<Self> {
        // Status text is free-form and may itself contain colons.
        if let Some(text) = line.strip_prefix("STATUS:") {
            return Some(ServerMessage::Status(text.to_string()));
        }

        let parts: Vec<&str> = line.split(':').collect();

        match (parts[0], parts.len()) {
            ("STATE_RESET", 1) => Some(ServerMessage::StateReset),
            ("STATE_SYNCED", 1) => Some(ServerMessage::StateSynced),
            ("MONEY", 2) => Some(ServerMessage::Money(parse_finite(parts[1])?)),
            ("DISCONNECT", 2) => Some(ServerMessage::Disconnect(parts[1].to_string())),
            ("BUS", 4) => Some(ServerMessage::Bus {
                index: parts[1].parse().ok()?,
                position: parse_point(parts[2], parts[3])?,
            }),
            ("C", 5) => Some(ServerMessage::Cursor {
                id: parts[1].to_string(),
                name: parts[2].to_string(),
                position: parse_point(parts[3], parts[4])?,
            }),
            ("I", 7) => Some(ServerMessage::Infrastructure {
                owner: parts[1].to_string(),
                start: parse_point(parts[2], parts[3])?,
                end: parse_point(parts[4], parts[5])?,
                kind: InfraKind::from_code(parts[6].parse().ok()?)?,
            }),
            ("B", 5) => Some(ServerMessage::Building {
                owner: parts[1].to_string(),
                position: parse_point(parts[2], parts[3])?,
                kind: BuildingKind::from_code(parts[4].parse().ok()?)?,
            }),
            ("R", n) if n >= 6 && n % 2 == 0 => Some(ServerMessage::BusRoute {
                owner: parts[1].to_string(),
                nodes: parse_points(&parts[2..])?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::StateReset => write!(f, "STATE_RESET"),
            ServerMessage::StateSynced => write!(f, "STATE_SYNCED"),
            ServerMessage::Money(amount) => write!(f, "MONEY:{amount:.2}"),
            ServerMessage::Status(text) => write!(f, "STATUS:{text}"),
            ServerMessage::Disconnect(id) => write!(f, "DISCONNECT:{id}"),
            ServerMessage::Bus { index, position } => {
                write!(f, "BUS:{index}:{:.0}:{:.0}", position.x, position.y)
            }
            ServerMessage::Cursor { id, name, position } => {
                write!(f, "C:{id}:{name}:{:.0}:{:.0}", position.x, position.y)
            }
            ServerMessage::Infrastructure {
                owner,
                start,
                end,
                kind,
            } => write!(
                f,
                "I:{owner}:{:.0}:{:.0}:{:.0}:{:.0}:{}",
                start.x,
                start.y,
                end.x,
                end.y,
                kind.code()
            ),
            ServerMessage::Building {
                owner,
                position,
                kind,
            } => write!(
                f,
                "B:{owner}:{:.0}:{:.0}:{}",
                position.x,
                position.y,
                kind.code()
            ),
            ServerMessage::BusRoute { owner, nodes } => {
                write!(f, "R:{owner}")?;
                write_nodes(f, nodes)
            }
        }
    }
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[Point]) -> fmt::Result {
    for node in nodes {
        write!(f, ":{:.0}:{:.0}", node.x, node.y)?;
    }
    Ok(())
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_point(x: &str, y: &str) -> Option<Point> {
    let point = Point::new(x.parse().ok()?, y.parse().ok()?);
    point.is_finite().then_some(point)
}

fn parse_points(fields: &[&str]) -> Option<Vec<Point>> {
    fields
        .chunks(2)
        .map(|pair| match pair {
            [x, y] => parse_point(x, y),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_and_ping() {
        assert_eq!(
            ClientCommand::parse("JOIN:abc:Alice"),
            Some(ClientCommand::Join {
                id: "abc".to_string(),
                name: "Alice".to_string()
            })
        );
        assert_eq!(ClientCommand::parse("PING"), Some(ClientCommand::Ping));
        assert_eq!(ClientCommand::parse("PING:extra"), None);
        assert_eq!(ClientCommand::parse("JOIN:abc"), None);
        assert_eq!(ClientCommand::parse("JOIN:abc:Al:ice"), None);
    }

    #[test]
    fn test_parse_infrastructure() {
        let cmd = ClientCommand::parse("I:p1:0:0:100:0:0").unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Infrastructure {
                id: "p1".to_string(),
                start: Point::new(0.0, 0.0),
                end: Point::new(100.0, 0.0),
                kind: InfraKind::Road,
            }
        );

        // Unknown infrastructure kind is malformed input
        assert_eq!(ClientCommand::parse("I:p1:0:0:100:0:7"), None);
        assert_eq!(ClientCommand::parse("I:p1:0:0:100:0"), None);
        assert_eq!(ClientCommand::parse("I:p1:0:0:100:0:0:9"), None);
        assert_eq!(ClientCommand::parse("I:p1:zero:0:100:0:0"), None);
    }

    #[test]
    fn test_parse_building_keeps_unknown_kind_code() {
        assert_eq!(
            ClientCommand::parse("B:p1:64:32:9"),
            Some(ClientCommand::Building {
                id: "p1".to_string(),
                position: Point::new(64.0, 32.0),
                kind_code: 9,
            })
        );
        assert_eq!(ClientCommand::parse("B:p1:64:32:x"), None);
    }

    #[test]
    fn test_parse_bus_route_field_counts() {
        let cmd = ClientCommand::parse("R:p1:0:0:100:0:100:100").unwrap();
        match cmd {
            ClientCommand::BusRoute { id, nodes } => {
                assert_eq!(id, "p1");
                assert_eq!(nodes.len(), 3);
                assert_eq!(nodes[2], Point::new(100.0, 100.0));
            }
            _ => panic!("Wrong command type"),
        }

        // Fewer than two nodes, or an odd number of coordinates
        assert_eq!(ClientCommand::parse("R:p1:0:0"), None);
        assert_eq!(ClientCommand::parse("R:p1:0:0:100"), None);
        assert_eq!(ClientCommand::parse("R:p1:0:0:100:0:5"), None);
        assert_eq!(ClientCommand::parse("R:p1:0:0:abc:0"), None);
    }

    #[test]
    fn test_parse_rejects_non_finite_numbers() {
        assert_eq!(ClientCommand::parse("C:p1:NaN:0"), None);
        assert_eq!(ClientCommand::parse("D:p1:0:inf"), None);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(ClientCommand::parse(""), None);
        assert_eq!(ClientCommand::parse("X:1:2"), None);
        assert_eq!(ClientCommand::parse("join:a:b"), None);
    }

    #[test]
    fn test_player_id() {
        assert_eq!(ClientCommand::Ping.player_id(), None);
        let cmd = ClientCommand::parse("D:p7:1:2").unwrap();
        assert_eq!(cmd.player_id(), Some("p7"));
    }

    #[test]
    fn test_client_command_encoding_rounds_coordinates() {
        let cmd = ClientCommand::BusRoute {
            id: "p1".to_string(),
            nodes: vec![Point::new(0.4, 10.6), Point::new(99.5, 0.0)],
        };
        assert_eq!(cmd.to_string(), "R:p1:0:11:100:0");

        let cmd = ClientCommand::Infrastructure {
            id: "p1".to_string(),
            start: Point::new(0.0, 0.0),
            end: Point::new(32.0, 64.0),
            kind: InfraKind::Water,
        };
        assert_eq!(cmd.to_string(), "I:p1:0:0:32:64:1");
    }

    #[test]
    fn test_server_message_encoding() {
        assert_eq!(ServerMessage::Money(1000.0).to_string(), "MONEY:1000.00");
        assert_eq!(ServerMessage::Money(987.456).to_string(), "MONEY:987.46");
        assert_eq!(
            ServerMessage::Bus {
                index: 2,
                position: Point::new(49.6, 0.2)
            }
            .to_string(),
            "BUS:2:50:0"
        );
        assert_eq!(
            ServerMessage::Cursor {
                id: "p1".to_string(),
                name: "Alice".to_string(),
                position: Point::new(10.4, 19.6),
            }
            .to_string(),
            "C:p1:Alice:10:20"
        );
        assert_eq!(ServerMessage::StateReset.to_string(), "STATE_RESET");
        assert_eq!(ServerMessage::StateSynced.to_string(), "STATE_SYNCED");
    }

    #[test]
    fn test_server_status_keeps_colons() {
        let line = "STATUS:Not enough money to build Industrial! Cost: 1000.00";
        assert_eq!(
            ServerMessage::parse(line),
            Some(ServerMessage::Status(
                "Not enough money to build Industrial! Cost: 1000.00".to_string()
            ))
        );
    }

    #[test]
    fn test_server_message_parse() {
        assert_eq!(
            ServerMessage::parse("MONEY:12.50"),
            Some(ServerMessage::Money(12.5))
        );
        assert_eq!(
            ServerMessage::parse("DISCONNECT:p9"),
            Some(ServerMessage::Disconnect("p9".to_string()))
        );
        assert_eq!(
            ServerMessage::parse("B:p1:10:20:2"),
            Some(ServerMessage::Building {
                owner: "p1".to_string(),
                position: Point::new(10.0, 20.0),
                kind: BuildingKind::Industrial,
            })
        );
        assert_eq!(ServerMessage::parse("BUS:-1:0:0"), None);
        assert_eq!(ServerMessage::parse("MONEY"), None);
        assert_eq!(ServerMessage::parse("PING"), None);
    }
}
