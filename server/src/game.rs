//! Authoritative city state and the rules that mutate it.
//!
//! Every operation here is validate-then-commit: a rejected call leaves the
//! world untouched. Nothing in this module performs I/O; callers turn the
//! returned outcomes into broadcasts.

use crate::error::Rejection;
use log::{debug, info};
use shared::geometry::{distance, lerp, point_segment_distance};
use shared::{
    Building, BuildingKind, Bus, BusRoute, Direction, InfraKind, Point, Segment, ServerMessage,
    BUS_SPEED, DELETE_RADIUS, LAP_REWARD_DIVISOR, ROAD_SNAP_DISTANCE, ROUTE_SAMPLES_PER_SEGMENT,
};

/// What a successful deletion removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Removed {
    Building(BuildingKind),
    Segment { kind: InfraKind, refund: f64 },
    Route { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub removed: Removed,
    /// Routes dropped because a removed road left them off the network.
    pub pruned_routes: usize,
}

/// Result of moving one bus for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BusUpdate {
    pub index: usize,
    pub position: Point,
    /// The bus reached an end of its route and turned around.
    pub lap_completed: bool,
    /// Balance right after this bus's lap reward was paid.
    pub money: f64,
}

#[derive(Debug, Clone)]
pub struct World {
    pub lines: Vec<Segment>,
    pub buildings: Vec<Building>,
    pub routes: Vec<BusRoute>,
    pub buses: Vec<Bus>,
    pub money: f64,
    pub income_rate: f64,
}

impl World {
    pub fn new(starting_money: f64) -> Self {
        Self {
            lines: Vec::new(),
            buildings: Vec::new(),
            routes: Vec::new(),
            buses: Vec::new(),
            money: starting_money,
            income_rate: 0.0,
        }
    }

    /// Adds a road or water segment. Returns the amount charged.
    pub fn add_infrastructure(&mut self, segment: Segment) -> Result<f64, Rejection> {
        let cost = segment.cost();
        if self.money < cost {
            return Err(Rejection::RoadUnaffordable);
        }

        self.money -= cost;
        debug!(
            "{} added {:?} segment ({:.0}, {:.0}) -> ({:.0}, {:.0}) for {:.2}",
            segment.owner,
            segment.kind,
            segment.start.x,
            segment.start.y,
            segment.end.x,
            segment.end.y,
            cost
        );
        self.lines.push(segment);
        Ok(cost)
    }

    pub fn add_building(
        &mut self,
        owner: &str,
        position: Point,
        kind_code: i32,
    ) -> Result<BuildingKind, Rejection> {
        let kind = BuildingKind::from_code(kind_code).ok_or(Rejection::UnknownBuildingKind)?;
        let cost = kind.cost();
        if self.money < cost {
            return Err(Rejection::BuildingUnaffordable { kind, cost });
        }

        self.money -= cost;
        self.income_rate += kind.income();
        self.buildings.push(Building {
            position,
            kind,
            owner: owner.to_string(),
        });
        debug!("{} built {} at ({:.0}, {:.0})", owner, kind.name(), position.x, position.y);
        Ok(kind)
    }

    /// Adds a route that lies on roads along its whole length, together with
    /// its bus. Returns the index of the new bus.
    pub fn add_bus_route(&mut self, owner: &str, nodes: Vec<Point>) -> Result<usize, Rejection> {
        if nodes.len() < 2 {
            return Err(Rejection::TooFewNodes);
        }
        if !self.is_route_on_roads(&nodes) {
            return Err(Rejection::RouteOffRoad);
        }

        let route = BusRoute::new(nodes, owner.to_string());
        let route_index = self.routes.len();
        let bus = Bus::at_start(route_index, &route);
        debug!(
            "{} added route {} with {} nodes, length {:.1}",
            owner,
            route_index,
            route.nodes.len(),
            route.length
        );

        self.routes.push(route);
        self.buses.push(bus);
        Ok(self.buses.len() - 1)
    }

    /// Removes at most one object near `target`.
    ///
    /// Buildings are searched first, then segments, then route nodes; within
    /// a category the newest object wins. Removing a road re-validates every
    /// remaining route.
    pub fn delete_at(&mut self, target: Point) -> Result<Deletion, Rejection> {
        if let Some(i) = self
            .buildings
            .iter()
            .rposition(|b| distance(b.position, target) <= DELETE_RADIUS)
        {
            let building = self.buildings.remove(i);
            self.income_rate = (self.income_rate - building.kind.income()).max(0.0);
            return Ok(Deletion {
                removed: Removed::Building(building.kind),
                pruned_routes: 0,
            });
        }

        if let Some(i) = self
            .lines
            .iter()
            .rposition(|l| point_segment_distance(target, l.start, l.end) <= DELETE_RADIUS)
        {
            let segment = self.lines.remove(i);
            let refund = segment.cost();
            self.money += refund;

            let pruned_routes = if segment.kind == InfraKind::Road {
                self.prune_invalid_routes()
            } else {
                0
            };
            return Ok(Deletion {
                removed: Removed::Segment {
                    kind: segment.kind,
                    refund,
                },
                pruned_routes,
            });
        }

        if let Some(i) = self.routes.iter().rposition(|r| {
            r.nodes
                .iter()
                .any(|node| distance(*node, target) <= DELETE_RADIUS)
        }) {
            self.remove_route(i);
            return Ok(Deletion {
                removed: Removed::Route { index: i },
                pruned_routes: 0,
            });
        }

        Err(Rejection::NothingToDelete)
    }

    pub fn is_point_on_road(&self, p: Point) -> bool {
        self.lines
            .iter()
            .filter(|line| line.kind == InfraKind::Road)
            .any(|line| point_segment_distance(p, line.start, line.end) <= ROAD_SNAP_DISTANCE)
    }

    /// Samples every route segment at evenly spaced points, endpoints
    /// included, and requires each sample to snap to some road.
    pub fn is_route_on_roads(&self, nodes: &[Point]) -> bool {
        nodes.windows(2).all(|pair| {
            (0..=ROUTE_SAMPLES_PER_SEGMENT).all(|step| {
                let t = step as f32 / ROUTE_SAMPLES_PER_SEGMENT as f32;
                self.is_point_on_road(lerp(pair[0], pair[1], t))
            })
        })
    }

    /// Removes a route and its bus, shifting higher route references down.
    fn remove_route(&mut self, index: usize) {
        self.routes.remove(index);
        self.buses.retain(|bus| bus.route != index);
        for bus in &mut self.buses {
            if bus.route > index {
                bus.route -= 1;
            }
        }
    }

    fn prune_invalid_routes(&mut self) -> usize {
        let invalid: Vec<usize> = self
            .routes
            .iter()
            .enumerate()
            .filter(|(_, route)| !self.is_route_on_roads(&route.nodes))
            .map(|(i, _)| i)
            .collect();

        // Highest first so earlier indices stay valid
        for &index in invalid.iter().rev() {
            info!("Route {} no longer lies on roads, removing it", index);
            self.remove_route(index);
        }
        invalid.len()
    }

    /// Advances every bus by `dt` seconds.
    ///
    /// A bus that finishes a segment starts the next one from progress 0; at
    /// either end of its route it turns around and pays the lap reward.
    pub fn step_buses(&mut self, dt: f32) -> Vec<BusUpdate> {
        let mut updates = Vec::with_capacity(self.buses.len());

        for (index, bus) in self.buses.iter_mut().enumerate() {
            let Some(route) = self.routes.get(bus.route) else {
                continue;
            };
            if route.nodes.len() < 2 {
                continue;
            }

            let (start, end) = segment_endpoints(route, bus);
            let segment_distance = distance(start, end);
            if segment_distance > 0.0 {
                bus.progress += (BUS_SPEED / segment_distance) * dt;
            } else {
                bus.progress = 1.0;
            }

            let mut lap_completed = false;
            if bus.progress >= 1.0 {
                bus.progress = 0.0;
                lap_completed = advance_segment(bus, route.segment_count());
                if lap_completed && route.length > 0.0 {
                    self.money += f64::from(route.length) / LAP_REWARD_DIVISOR;
                }
            }

            let (start, end) = segment_endpoints(route, bus);
            bus.position = lerp(start, end, bus.progress);
            updates.push(BusUpdate {
                index,
                position: bus.position,
                lap_completed,
                money: self.money,
            });
        }

        updates
    }

    /// Pays the passive income. Returns the new balance if anything was paid.
    pub fn collect_income(&mut self) -> Option<f64> {
        if self.income_rate > 0.0 {
            self.money += self.income_rate;
            Some(self.money)
        } else {
            None
        }
    }

    /// The full-state resend: every line, building, route and bus position,
    /// terminated by `STATE_SYNCED`.
    pub fn snapshot(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::with_capacity(
            self.lines.len() + self.buildings.len() + self.routes.len() + self.buses.len() + 1,
        );

        messages.extend(self.lines.iter().map(|l| ServerMessage::Infrastructure {
            owner: l.owner.clone(),
            start: l.start,
            end: l.end,
            kind: l.kind,
        }));
        messages.extend(self.buildings.iter().map(|b| ServerMessage::Building {
            owner: b.owner.clone(),
            position: b.position,
            kind: b.kind,
        }));
        messages.extend(self.routes.iter().map(|r| ServerMessage::BusRoute {
            owner: r.owner.clone(),
            nodes: r.nodes.clone(),
        }));
        messages.extend(
            self.buses
                .iter()
                .enumerate()
                .map(|(index, bus)| ServerMessage::Bus {
                    index,
                    position: bus.position,
                }),
        );
        messages.push(ServerMessage::StateSynced);
        messages
    }
}

/// Endpoints of the bus's current segment in travel order.
fn segment_endpoints(route: &BusRoute, bus: &Bus) -> (Point, Point) {
    let a = route.nodes[bus.segment];
    let b = route.nodes[bus.segment + 1];
    match bus.direction {
        Direction::Forward => (a, b),
        Direction::Backward => (b, a),
    }
}

/// Moves the bus onto its next segment. Returns true when it turned around.
fn advance_segment(bus: &mut Bus, segment_count: usize) -> bool {
    let at_end = match bus.direction {
        Direction::Forward => bus.segment + 1 >= segment_count,
        Direction::Backward => bus.segment == 0,
    };
    if at_end {
        bus.direction = bus.direction.reversed();
        bus.segment = bus.segment.min(segment_count - 1);
        return true;
    }

    match bus.direction {
        Direction::Forward => bus.segment += 1,
        Direction::Backward => bus.segment -= 1,
    }
    false
}
