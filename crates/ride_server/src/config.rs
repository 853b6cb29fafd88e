use std::net::SocketAddr;
use std::time::Duration;

use ride_core::matching::MatcherConfig;
use ride_core::routing::RoutingConfig;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline for a ride search, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON file of ride records used to seed the catalog
    #[serde(default)]
    pub catalog_path: Option<String>,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub matching: MatcherConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            catalog_path: None,
            routing: RoutingConfig::default(),
            matching: MatcherConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `rideshare.*` file, overridden by
    /// `RIDESHARE__*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("rideshare").required(false))
            .add_source(config::Environment::with_prefix("RIDESHARE").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.enable_cors);
        assert!(cfg.catalog_path.is_none());
        assert_eq!(cfg.matching.default_tolerance_m, 1_000.0);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().expect("valid address");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_nested_sections_deserialize() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"port": 9000,
                "routing": {"provider": {"kind": "osrm", "endpoint": "http://osrm:5000"}, "cache_ttl_secs": 60},
                "matching": {"route_timeout_ms": 2500}}"#,
        )
        .expect("config");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.routing.cache_ttl_secs, 60);
        assert_eq!(cfg.matching.route_timeout_ms, 2_500);
        assert_eq!(cfg.matching.max_concurrent_route_fetches, 8);
    }
}
