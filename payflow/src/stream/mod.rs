pub mod heartbeat;
pub mod transactions;
