//! Engine configuration, sourced from `FEIRA_*` environment variables with sane defaults for
//! every knob. Missing variables are logged at the level matching their importance and replaced
//! by the default rather than aborting startup.

use std::{env, time::Duration};

use feira_common::Secret;
use log::*;

use crate::sqlite::db::db_url;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INITIAL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_POLL_MAX_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_GATEWAY_URL: &str = "https://pix-gateway.local";

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub poll: PollPolicy,
    pub gateway: GatewayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            poll: PollPolicy::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = db_url();
        let max_connections = env::var("FEIRA_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_else(|| {
                info!("🪛️ FEIRA_MAX_CONNECTIONS is not set or invalid. Using the default, {DEFAULT_MAX_CONNECTIONS}.");
                DEFAULT_MAX_CONNECTIONS
            });
        Self {
            database_url,
            max_connections,
            poll: PollPolicy::from_env_or_default(),
            gateway: GatewayConfig::from_env_or_default(),
        }
    }
}

/// Back-off schedule for polling the gateway after a checkout.
///
/// Intervals double on each attempt, capped at `max_interval`. With the defaults the engine
/// polls for roughly 90 seconds before giving up on an intent.
#[derive(Clone, Copy, Debug)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            initial_interval: Duration::from_millis(DEFAULT_POLL_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_POLL_MAX_INTERVAL_MS),
        }
    }
}

impl PollPolicy {
    pub fn from_env_or_default() -> Self {
        let max_attempts = env::var("FEIRA_POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS);
        let initial_interval = env::var("FEIRA_POLL_INITIAL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_POLL_INITIAL_INTERVAL_MS));
        let max_interval = env::var("FEIRA_POLL_MAX_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_POLL_MAX_INTERVAL_MS));
        Self { max_attempts, initial_interval, max_interval }
    }

    /// The wait before attempt `attempt` (1-based). Attempt 1 has no wait.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let doubled = self.initial_interval.saturating_mul(1u32 << (attempt - 2).min(16));
        doubled.min(self.max_interval)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("FEIRA_GATEWAY_URL").unwrap_or_else(|_| {
            info!("🪛️ FEIRA_GATEWAY_URL is not set. Using the default, {DEFAULT_GATEWAY_URL}.");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let api_key = env::var("FEIRA_GATEWAY_API_KEY").map(Secret::from).unwrap_or_else(|_| {
            warn!(
                "🪛️ FEIRA_GATEWAY_API_KEY is not set. Gateway calls will be unauthenticated, which only works \
                 against a sandbox."
            );
            Secret::default()
        });
        Self { base_url, api_key }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn poll_delays_double_and_cap() {
        let policy = PollPolicy {
            max_attempts: 6,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(450),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(450));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_millis(450));
    }
}
