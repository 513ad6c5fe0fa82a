//! Broker connection settings.
//!
//! Settings come from an optional JSON file in the working directory
//! (overridable with `--config <FILE>`) with individual CLI flags taking
//! precedence. A missing file just means defaults; a malformed one is an
//! error rather than a silent fallback.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "flowdeck.json";

/// Client identifier presented to the broker.
pub const DEFAULT_CLIENT_ID: &str = "flowdeck-config";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9001,
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl BrokerConfig {
    /// Websocket endpoint for the broker. The `/mqtt` path matches the
    /// conventional MQTT-over-websocket listener path.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}:{}/mqtt", self.host, self.port)
    }

    /// Load from a JSON file if it exists, otherwise defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    /// Resolve the effective configuration: config file first, then CLI flag
    /// overrides.
    pub fn resolve(matches: &clap::ArgMatches) -> Result<Self> {
        let path = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut cfg = Self::load(&path)?;

        if let Some(host) = matches.get_one::<String>("host") {
            cfg.host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("port") {
            cfg.port = *port;
        }
        if let Some(client_id) = matches.get_one::<String>("client-id") {
            cfg.client_id = client_id.clone();
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BrokerConfig::default();
        assert_eq!(cfg.websocket_url(), "ws://localhost:9001/mqtt");
        assert_eq!(cfg.client_id, DEFAULT_CLIENT_ID);
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let cfg = BrokerConfig::load(Path::new("definitely-not-here.json")).unwrap();
        assert_eq!(cfg.host, "localhost");
    }

    #[test]
    fn test_partial_json() {
        let cfg: BrokerConfig = serde_json::from_str(r#"{"host":"broker.lan"}"#).unwrap();
        assert_eq!(cfg.host, "broker.lan");
        assert_eq!(cfg.port, 9001);
    }
}
