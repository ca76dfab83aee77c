use crate::client_manager::ClientManager;
use crate::game::World;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything guarded by the single store lock: the world and the player table.
pub struct ServerState {
    pub world: World,
    pub clients: ClientManager,
}

impl ServerState {
    pub fn new(starting_money: f64) -> Self {
        Self {
            world: World::new(starting_money),
            clients: ClientManager::new(),
        }
    }
}

/// Handle shared by the accept loop, every connection task and the scheduler.
pub type SharedState = Arc<Mutex<ServerState>>;
