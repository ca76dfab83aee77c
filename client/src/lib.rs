//! # City Builder Client Library
//!
//! A headless client for the city builder server. It speaks the line
//! protocol, keeps a read-only mirror of the shared city, and exposes typed
//! senders for the edits a player can request.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client never applies an edit locally;
//! it sends the request and waits for the server's echo, which is the only
//! thing that changes the mirror. A rejected request comes back as a
//! `STATUS` notice, kept as plain text in [`mirror::Mirror::last_status`].
//!
//! ### Resynchronization
//! When the server announces `STATE_RESET`, the mirror drops its lines,
//! buildings, routes and buses and waits for the full resend that ends with
//! `STATE_SYNCED`. Money and other players' cursors survive a reset.
//!
//! ### Keep-alive
//! The server disconnects players that stay silent for 15 seconds, so the
//! writer task sends `PING` every 5 seconds even when the player is idle.
//!
//! ## Module Organization
//!
//! - `mirror`: the local copy of the city and how server messages update it
//! - `network`: the TCP connection, its reader and writer tasks, and the
//!   typed command senders
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::{InfraKind, Point};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:7777", "Alice").await?;
//!     client.wait_for(Duration::from_secs(5), |m| m.synced).await;
//!
//!     client.build_infrastructure(Point::new(0.0, 0.0), Point::new(128.0, 0.0), InfraKind::Road)?;
//!     client.wait_for(Duration::from_secs(5), |m| !m.lines.is_empty()).await;
//!
//!     println!("{}", client.snapshot().await.summary());
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod mirror;
pub mod network;

pub use mirror::Mirror;
pub use network::Client;
