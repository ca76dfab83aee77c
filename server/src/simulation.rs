//! Periodic jobs: bus motion, passive income and idle-player cleanup.
//!
//! Each job is its own task. A tick takes the store lock for its whole
//! critical section and releases it before waiting for the next tick.

use crate::client_manager::ConnId;
use crate::config::ServerConfig;
use crate::state::{ServerState, SharedState};
use log::debug;
use shared::ServerMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Moves every bus by one tick and broadcasts its position.
///
/// Money is announced after each lap reward, before that bus's position.
pub fn bus_tick(state: &mut ServerState, dt: f32) {
    let updates = state.world.step_buses(dt);
    for update in updates {
        if update.lap_completed {
            state.clients.broadcast_money(update.money);
        }
        let message = ServerMessage::Bus {
            index: update.index,
            position: update.position,
        };
        state.clients.broadcast_all(&message.to_string());
    }
}

pub fn income_tick(state: &mut ServerState) {
    if let Some(money) = state.world.collect_income() {
        debug!("Paid income of {:.2}, balance {:.2}", state.world.income_rate, money);
        state.clients.broadcast_money(money);
    }
}

/// Closes every connection idle for longer than `idle_timeout`; their read
/// loops perform the teardown and announce the disconnect. Returns the
/// closed connections.
pub fn cleanup_tick(state: &mut ServerState, idle_timeout: Duration) -> Vec<ConnId> {
    let closed = state.clients.close_idle(idle_timeout);
    if !closed.is_empty() {
        debug!(
            "Cleanup closed {} idle connection(s), {} remain open",
            closed.len(),
            state.clients.len() - closed.len()
        );
    }
    closed
}

/// Starts the three scheduler tasks. They stop when `shutdown` flips.
pub fn spawn_scheduler(
    state: &SharedState,
    config: &ServerConfig,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let dt = config.bus_tick().as_secs_f32();
    let idle_timeout = config.idle_timeout();

    vec![
        spawn_periodic(
            "bus motion",
            config.bus_tick(),
            Arc::clone(state),
            shutdown.clone(),
            move |s| bus_tick(s, dt),
        ),
        spawn_periodic(
            "income",
            config.income_interval(),
            Arc::clone(state),
            shutdown.clone(),
            income_tick,
        ),
        spawn_periodic(
            "cleanup",
            config.cleanup_interval(),
            Arc::clone(state),
            shutdown.clone(),
            move |s| {
                cleanup_tick(s, idle_timeout);
            },
        ),
    ]
}

fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(&mut ServerState) + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let mut guard = state.lock().await;
                    tick(&mut *guard);
                }
                _ = shutdown.changed() => break,
            }
        }

        debug!("{} task stopped", name);
    })
}
