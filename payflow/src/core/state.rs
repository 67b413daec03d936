use std::sync::Arc;
use tokio::sync::broadcast;

use super::{
    clock::{Clock, MonotonicClock},
    config::Config,
    random::{self, RandomSource},
};
use crate::{
    domain::prelude::*,
    gateway::GatewaySimulator,
    settlement::Simulator,
    store::{InMemoryRepository, TransactionRepository, TransactionStore},
    stream::{heartbeat, transactions::TransactionEvents},
};

#[derive(Clone)]
pub struct AppState {
    /// Transaction records and their lifecycle rules.
    pub store: Arc<TransactionStore>,

    /// Timers that settle transfers in the background.
    pub simulator: Arc<Simulator>,

    /// Mock card and M-Pesa gateways.
    pub gateways: GatewaySimulator,

    /// The sender for the heartbeat channel.
    /// Used to broadcast heartbeats to the websocket clients.
    pub heartbeat_tx: broadcast::Sender<Heartbeat>,
}

impl AppState {
    /// Wires the services around the given storage, clock and randomness.
    ///
    /// Spawns the heartbeat task, so it must be called inside a tokio
    /// runtime.
    pub fn new(
        config: &Config,
        repo: Arc<dyn TransactionRepository>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let events = TransactionEvents::new(config.broadcast_buffer_size);
        let store = Arc::new(TransactionStore::new(repo, clock.clone(), events));
        let simulator = Arc::new(Simulator::new(
            store.clone(),
            random.clone(),
            config.settlement.clone(),
        ));

        Self {
            store,
            simulator,
            gateways: GatewaySimulator::new(random),
            heartbeat_tx: heartbeat::channel(config.heartbeat_interval, clock),
        }
    }

    /// In-memory store, monotonic clock, and the configured random source.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryRepository::default()),
            Arc::new(MonotonicClock::new()),
            random::from_seed(config.rng_seed),
        )
    }
}
