use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration for the engine's ambient surface (HTTP bind
/// address, entropy-source cadence, reseed cadence). The core Fortuna
/// constants from the specification (32 pools, 32-byte minimum pool-0 size,
/// 100ms reseed gate) are the defaults here; overriding them is meant for
/// tests and deployment tuning, not for changing the cryptographic design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub default_source_tick_ms: u64,
    pub reseed_interval_ms: u64,
    pub min_pool_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".parse().expect("valid default address"),
            default_source_tick_ms: 100,
            reseed_interval_ms: 100,
            min_pool_size: 32,
        }
    }
}

impl AppConfig {
    /// Layers compiled-in defaults, an optional `fortuna.toml`, then
    /// `FORTUNA_*` environment variables, in that precedence order.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let builder = Config::builder()
            .set_default("http_addr", defaults.http_addr.to_string())?
            .set_default("default_source_tick_ms", defaults.default_source_tick_ms)?
            .set_default("reseed_interval_ms", defaults.reseed_interval_ms)?
            .set_default("min_pool_size", defaults.min_pool_size as i64)?
            .add_source(File::with_name("fortuna").required(false))
            .add_source(Environment::with_prefix("FORTUNA"));
        builder.build()?.try_deserialize()
    }

    pub fn default_source_tick(&self) -> Duration {
        Duration::from_millis(self.default_source_tick_ms)
    }

    pub fn reseed_interval(&self) -> Duration {
        Duration::from_millis(self.reseed_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.min_pool_size, 32);
        assert_eq!(cfg.reseed_interval(), Duration::from_millis(100));
        assert_eq!(cfg.default_source_tick(), Duration::from_millis(100));
    }
}
