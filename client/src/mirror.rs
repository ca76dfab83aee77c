use log::{debug, info};
use shared::{Building, BusRoute, Point, Segment, ServerMessage};
use std::collections::HashMap;

/// Another player's pointer as last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub name: String,
    pub position: Point,
}

/// Read-only local copy of the city, built only from server messages.
///
/// The mirror never validates or simulates anything. After `STATE_RESET` it
/// is empty and `synced` stays false until the resend ends with
/// `STATE_SYNCED`.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    pub lines: Vec<Segment>,
    pub buildings: Vec<Building>,
    pub routes: Vec<BusRoute>,
    /// Bus positions by bus index.
    pub buses: Vec<Point>,
    pub money: f64,
    pub cursors: HashMap<String, RemoteCursor>,
    pub last_status: Option<String>,
    pub synced: bool,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::StateReset => {
                self.lines.clear();
                self.buildings.clear();
                self.routes.clear();
                self.buses.clear();
                self.synced = false;
            }
            ServerMessage::StateSynced => {
                self.synced = true;
                debug!(
                    "Mirror synced: {} lines, {} buildings, {} routes",
                    self.lines.len(),
                    self.buildings.len(),
                    self.routes.len()
                );
            }
            ServerMessage::Money(money) => self.money = money,
            ServerMessage::Status(text) => {
                info!("Server: {}", text);
                self.last_status = Some(text);
            }
            ServerMessage::Disconnect(id) => {
                self.cursors.remove(&id);
            }
            ServerMessage::Bus { index, position } => {
                if self.buses.len() <= index {
                    self.buses.resize(index + 1, Point::new(0.0, 0.0));
                }
                self.buses[index] = position;
            }
            ServerMessage::Cursor { id, name, position } => {
                self.cursors.insert(id, RemoteCursor { name, position });
            }
            ServerMessage::Infrastructure {
                owner,
                start,
                end,
                kind,
            } => self.lines.push(Segment {
                start,
                end,
                kind,
                owner,
            }),
            ServerMessage::Building {
                owner,
                position,
                kind,
            } => self.buildings.push(Building {
                position,
                kind,
                owner,
            }),
            ServerMessage::BusRoute { owner, nodes } => {
                self.routes.push(BusRoute::new(nodes, owner));
            }
        }
    }

    /// Parses and applies one line; returns false if the line was not understood.
    pub fn apply_line(&mut self, line: &str) -> bool {
        match ServerMessage::parse(line.trim()) {
            Some(message) => {
                self.apply(message);
                true
            }
            None => {
                debug!("Ignoring unknown server line: {:?}", line);
                false
            }
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "money {:.2}, {} lines, {} buildings, {} routes, {} buses, {} other players",
            self.money,
            self.lines.len(),
            self.buildings.len(),
            self.routes.len(),
            self.buses.len(),
            self.cursors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{BuildingKind, InfraKind};

    fn mirror_from(lines: &[&str]) -> Mirror {
        let mut mirror = Mirror::new();
        for line in lines {
            assert!(mirror.apply_line(line), "line not understood: {}", line);
        }
        mirror
    }

    #[test]
    fn test_full_state_is_mirrored() {
        let mirror = mirror_from(&[
            "I:p1:0:0:100:0:0",
            "I:p1:0:0:0:50:1",
            "B:p2:32:32:1",
            "R:p1:0:0:100:0",
            "BUS:0:0:0",
            "STATE_SYNCED",
            "MONEY:787.50",
        ]);

        assert!(mirror.synced);
        assert_eq!(mirror.lines.len(), 2);
        assert_eq!(mirror.lines[1].kind, InfraKind::Water);
        assert_eq!(mirror.buildings[0].kind, BuildingKind::Commercial);
        assert_eq!(mirror.buildings[0].owner, "p2");
        assert_approx_eq!(mirror.routes[0].length, 100.0);
        assert_eq!(mirror.buses, vec![Point::new(0.0, 0.0)]);
        assert_approx_eq!(mirror.money, 787.5);
    }

    #[test]
    fn test_state_reset_clears_world_but_keeps_money() {
        let mut mirror = mirror_from(&[
            "I:p1:0:0:100:0:0",
            "BUS:0:10:0",
            "STATE_SYNCED",
            "MONEY:950.00",
            "C:p2:Bob:5:5",
        ]);

        mirror.apply(ServerMessage::StateReset);

        assert!(!mirror.synced);
        assert!(mirror.lines.is_empty());
        assert!(mirror.buses.is_empty());
        assert_approx_eq!(mirror.money, 950.0);
        assert_eq!(mirror.cursors.len(), 1);
    }

    #[test]
    fn test_bus_index_grows_positions() {
        let mut mirror = mirror_from(&["BUS:2:40:8"]);
        assert_eq!(mirror.buses.len(), 3);
        assert_eq!(mirror.buses[2], Point::new(40.0, 8.0));

        mirror.apply_line("BUS:0:1:1");
        assert_eq!(mirror.buses[0], Point::new(1.0, 1.0));
        assert_eq!(mirror.buses.len(), 3);
    }

    #[test]
    fn test_cursor_and_disconnect() {
        let mut mirror = mirror_from(&["C:p2:Bob:10:20", "C:p3:Carol:1:2"]);
        assert_eq!(mirror.cursors["p2"].name, "Bob");

        mirror.apply_line("C:p2:Bob:11:21");
        assert_eq!(mirror.cursors["p2"].position, Point::new(11.0, 21.0));

        mirror.apply_line("DISCONNECT:p2");
        assert!(!mirror.cursors.contains_key("p2"));
        assert!(mirror.cursors.contains_key("p3"));
    }

    #[test]
    fn test_status_keeps_colons() {
        let mirror = mirror_from(&["STATUS:Not enough money to build Industrial! Cost: 1000.00"]);
        assert_eq!(
            mirror.last_status.as_deref(),
            Some("Not enough money to build Industrial! Cost: 1000.00")
        );
    }

    #[test]
    fn test_unknown_lines_are_ignored() {
        let mut mirror = Mirror::new();
        assert!(!mirror.apply_line("HELLO:world"));
        assert!(!mirror.apply_line("B:p1:0:0:9"));
        assert!(mirror.buildings.is_empty());
    }
}
