//! World entities shared by the server store and the client mirror.

use crate::geometry::{distance, polyline_length, Point};
use crate::{
    COMMERCIAL_BUILDING_COST, COMMERCIAL_INCOME_INCREASE, INDUSTRIAL_BUILDING_COST,
    INDUSTRIAL_INCOME_INCREASE, RESIDENTIAL_BUILDING_COST, ROAD_COST_PER_UNIT,
};

/// Kind of an infrastructure segment. Wire codes: Road = 0, Water = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraKind {
    Road,
    Water,
}

impl InfraKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(InfraKind::Road),
            1 => Some(InfraKind::Water),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            InfraKind::Road => 0,
            InfraKind::Water => 1,
        }
    }
}

/// Kind of a building. Wire codes: Residential = 0, Commercial = 1, Industrial = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingKind {
    Residential,
    Commercial,
    Industrial,
}

impl BuildingKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(BuildingKind::Residential),
            1 => Some(BuildingKind::Commercial),
            2 => Some(BuildingKind::Industrial),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            BuildingKind::Residential => 0,
            BuildingKind::Commercial => 1,
            BuildingKind::Industrial => 2,
        }
    }

    /// One-off creation cost.
    pub fn cost(&self) -> f64 {
        match self {
            BuildingKind::Residential => RESIDENTIAL_BUILDING_COST,
            BuildingKind::Commercial => COMMERCIAL_BUILDING_COST,
            BuildingKind::Industrial => INDUSTRIAL_BUILDING_COST,
        }
    }

    /// Contribution to the global income rate while the building stands.
    pub fn income(&self) -> f64 {
        match self {
            BuildingKind::Residential => 0.0,
            BuildingKind::Commercial => COMMERCIAL_INCOME_INCREASE,
            BuildingKind::Industrial => INDUSTRIAL_INCOME_INCREASE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuildingKind::Residential => "Residential",
            BuildingKind::Commercial => "Commercial",
            BuildingKind::Industrial => "Industrial",
        }
    }
}

/// A straight road or water edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub kind: InfraKind,
    pub owner: String,
}

impl Segment {
    pub fn length(&self) -> f32 {
        distance(self.start, self.end)
    }

    /// Money charged on creation and refunded on deletion. Water is free.
    pub fn cost(&self) -> f64 {
        match self.kind {
            InfraKind::Road => f64::from(self.length()) * ROAD_COST_PER_UNIT,
            InfraKind::Water => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub position: Point,
    pub kind: BuildingKind,
    pub owner: String,
}

/// An ordered polyline of at least two nodes that a bus shuttles along.
#[derive(Debug, Clone, PartialEq)]
pub struct BusRoute {
    pub nodes: Vec<Point>,
    pub owner: String,
    /// Sum of segment lengths, computed once on creation.
    pub length: f32,
}

impl BusRoute {
    pub fn new(nodes: Vec<Point>, owner: String) -> Self {
        let length = polyline_length(&nodes);
        Self {
            nodes,
            owner,
            length,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Travel direction of a bus along its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub position: Point,
    /// Index into the route list; kept dense when routes are removed.
    pub route: usize,
    pub segment: usize,
    /// Fraction of the current segment covered, in `[0, 1)` between ticks.
    pub progress: f32,
    pub direction: Direction,
}

impl Bus {
    /// A bus parked on the first node of `route`, heading forward.
    pub fn at_start(route_index: usize, route: &BusRoute) -> Self {
        Self {
            position: route.nodes.first().copied().unwrap_or_default(),
            route: route_index,
            segment: 0,
            progress: 0.0,
            direction: Direction::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_kind_codes() {
        for kind in [InfraKind::Road, InfraKind::Water] {
            assert_eq!(InfraKind::from_code(kind.code()), Some(kind));
        }
        for kind in [
            BuildingKind::Residential,
            BuildingKind::Commercial,
            BuildingKind::Industrial,
        ] {
            assert_eq!(BuildingKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(InfraKind::from_code(2), None);
        assert_eq!(BuildingKind::from_code(-1), None);
        assert_eq!(BuildingKind::from_code(3), None);
    }

    #[test]
    fn test_building_economics() {
        assert_eq!(BuildingKind::Residential.cost(), 100.0);
        assert_eq!(BuildingKind::Residential.income(), 0.0);
        assert_eq!(BuildingKind::Commercial.cost(), 250.0);
        assert_eq!(BuildingKind::Commercial.income(), 5.0);
        assert_eq!(BuildingKind::Industrial.cost(), 1000.0);
        assert_eq!(BuildingKind::Industrial.income(), 25.0);
    }

    #[test]
    fn test_segment_cost() {
        let road = Segment {
            start: Point::new(0.0, 0.0),
            end: Point::new(30.0, 40.0),
            kind: InfraKind::Road,
            owner: "p1".to_string(),
        };
        assert_approx_eq!(road.length(), 50.0);
        assert_approx_eq!(road.cost(), 25.0);

        let water = Segment {
            kind: InfraKind::Water,
            ..road
        };
        assert_eq!(water.cost(), 0.0);
    }

    #[test]
    fn test_route_length_and_bus_start() {
        let route = BusRoute::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)],
            "p1".to_string(),
        );
        assert_approx_eq!(route.length, 200.0);
        assert_eq!(route.segment_count(), 2);

        let bus = Bus::at_start(3, &route);
        assert_eq!(bus.position, Point::new(0.0, 0.0));
        assert_eq!(bus.route, 3);
        assert_eq!(bus.segment, 0);
        assert_eq!(bus.progress, 0.0);
        assert_eq!(bus.direction, Direction::Forward);
    }

    #[test]
    fn test_direction_reversed() {
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Backward.reversed(), Direction::Forward);
    }
}
