//! Types, constants and the wire codec shared by the city server and its clients.

pub mod geometry;
pub mod model;
pub mod protocol;

pub use geometry::Point;
pub use model::{Building, BuildingKind, Bus, BusRoute, Direction, InfraKind, Segment};
pub use protocol::{ClientCommand, ServerMessage};

pub const GRID_SIZE: f32 = 32.0;
pub const ROAD_COST_PER_UNIT: f64 = 0.5;
/// Bus travel speed in world units per second.
pub const BUS_SPEED: f32 = 200.0;
/// Maximum distance from a sampled route point to the nearest road.
pub const ROAD_SNAP_DISTANCE: f32 = 8.0;
/// Interpolation intervals per route segment; endpoints are sampled too.
pub const ROUTE_SAMPLES_PER_SEGMENT: usize = 4;
pub const DELETE_RADIUS: f32 = GRID_SIZE * 0.75;
/// A completed traversal pays `route length / LAP_REWARD_DIVISOR`.
pub const LAP_REWARD_DIVISOR: f64 = 16.0;

pub const RESIDENTIAL_BUILDING_COST: f64 = 100.0;
pub const COMMERCIAL_BUILDING_COST: f64 = 250.0;
pub const INDUSTRIAL_BUILDING_COST: f64 = 1000.0;
pub const COMMERCIAL_INCOME_INCREASE: f64 = 5.0;
pub const INDUSTRIAL_INCOME_INCREASE: f64 = 25.0;

pub const STARTING_MONEY: f64 = 1000.0;
pub const DEFAULT_PORT: u16 = 7777;
