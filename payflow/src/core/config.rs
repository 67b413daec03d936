use std::{net::SocketAddr, str::FromStr, time::Duration};
use tracing::warn;

use crate::settlement::SettlementConfig;

/// Runtime configuration, read once from the environment at startup.
///
/// Every setting has a default; values that fail to parse fall back to the
/// default with a warning.
///
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on (`PAYFLOW_ADDR`).
    pub addr: SocketAddr,
    /// Log filter used when `RUST_LOG` is unset (`PAYFLOW_LOG_LEVEL`).
    pub log_level: String,
    /// Capacity of the transaction updates channel (`BROADCAST_BUFFER_SIZE`).
    pub broadcast_buffer_size: usize,
    /// Period of websocket heartbeats (`PAYFLOW_HEARTBEAT_SECS`).
    pub heartbeat_interval: Duration,
    pub settlement: SettlementConfig,
    /// Fixed RNG seed for reproducible runs (`PAYFLOW_RNG_SEED`).
    pub rng_seed: Option<u64>,
    /// Insert the demo data set at startup (`PAYFLOW_SEED_DEMO`).
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 9999)),
            log_level: "info".to_string(),
            broadcast_buffer_size: 100,
            heartbeat_interval: Duration::from_secs(10),
            settlement: SettlementConfig::default(),
            rng_seed: None,
            seed_demo: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str, default: String| lookup(key).unwrap_or(default);

        let millis = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(key, lookup(key), default.as_millis() as u64))
        };

        let settlement = SettlementConfig {
            gateway_delay: millis("PAYFLOW_GATEWAY_DELAY_MS", defaults.settlement.gateway_delay),
            settlement_delay: millis(
                "PAYFLOW_SETTLEMENT_DELAY_MS",
                defaults.settlement.settlement_delay,
            ),
            completion_delay: millis(
                "PAYFLOW_COMPLETION_DELAY_MS",
                defaults.settlement.completion_delay,
            ),
            success_rate: parse_or(
                "PAYFLOW_SETTLEMENT_SUCCESS_RATE",
                lookup("PAYFLOW_SETTLEMENT_SUCCESS_RATE"),
                defaults.settlement.success_rate,
            )
            .clamp(0.0, 1.0),
        };

        Self {
            addr: parse_or("PAYFLOW_ADDR", lookup("PAYFLOW_ADDR"), defaults.addr),
            log_level: get("PAYFLOW_LOG_LEVEL", defaults.log_level),
            broadcast_buffer_size: parse_or(
                "BROADCAST_BUFFER_SIZE",
                lookup("BROADCAST_BUFFER_SIZE"),
                defaults.broadcast_buffer_size,
            )
            .max(1),
            heartbeat_interval: Duration::from_secs(
                parse_or(
                    "PAYFLOW_HEARTBEAT_SECS",
                    lookup("PAYFLOW_HEARTBEAT_SECS"),
                    defaults.heartbeat_interval.as_secs(),
                )
                .max(1),
            ),
            settlement,
            rng_seed: lookup("PAYFLOW_RNG_SEED").and_then(|raw| match raw.parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!(key = "PAYFLOW_RNG_SEED", value = %raw, "ignoring unparseable setting");
                    None
                }
            }),
            seed_demo: parse_or(
                "PAYFLOW_SEED_DEMO",
                lookup("PAYFLOW_SEED_DEMO"),
                defaults.seed_demo,
            ),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
    }
}
