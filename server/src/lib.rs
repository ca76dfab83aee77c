//! # City Builder Server Library
//!
//! This library provides the authoritative server for the multiplayer city
//! builder. It owns the single copy of the city (roads, water, buildings, bus
//! routes, buses and the shared treasury), validates every edit players send,
//! and keeps all connected clients in sync through a line-oriented TCP protocol.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Clients never mutate the city themselves. They send requests such as
//! "build a road from A to B"; the server checks the rules (funds, building
//! kinds, routes lying on roads), commits the change and echoes it to every
//! player. Rejected requests are answered with a `STATUS` notice to the
//! requester only.
//!
//! ### Simulation
//! Three periodic jobs run next to the connection tasks:
//! - Bus motion every 50 ms, paying a reward whenever a bus finishes a lap
//! - Passive income from commercial and industrial buildings every 10 s
//! - Idle-player cleanup every 10 s
//!
//! ### Client Management
//! Each TCP connection joins with a player id and a display name. Joining
//! sends the full world followed by `STATE_SYNCED`. Players that stay silent
//! for longer than the idle timeout are disconnected, and everybody else is
//! told with `DISCONNECT:<id>`.
//!
//! ## Architecture
//!
//! ### Single Store Lock
//! The world and the player table live together in [`state::ServerState`]
//! behind one `tokio::sync::Mutex`. Command handling and every scheduler tick
//! hold that lock for their whole critical section, so each mutation and the
//! broadcasts it produces are observed in one order by all clients.
//!
//! ### Outbound Queues
//! Every connection has a bounded queue drained by its own writer task.
//! Broadcasting only enqueues, so a slow client never stalls the lock holder;
//! a client whose queue fills up is closed instead of buffering without end.
//!
//! ### Cancellation
//! A `watch` channel carries the server-wide shutdown signal to the accept
//! loop, the scheduler and every connection. Individual connections are
//! closed through a per-connection `Notify`.
//!
//! ## Module Organization
//!
//! - `game`: the world model and its rules, free of I/O
//! - `commands`: turns one inbound line into mutations and broadcasts
//! - `client_manager`: connections, joined players and idle tracking
//! - `simulation`: the periodic jobs
//! - `network`: listener, connection tasks and the server lifecycle
//! - `config`: server settings loaded from TOML
//! - `error`: server failures and rule rejections
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::start(ServerConfig::default()).await?;
//!     println!("Listening on {}", server.local_addr());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

mod broadcast;
pub mod client_manager;
pub mod commands;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod simulation;
pub mod state;

pub use config::ServerConfig;
pub use error::{Rejection, ServerError};
pub use network::Server;
