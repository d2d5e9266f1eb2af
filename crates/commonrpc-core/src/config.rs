//! Centralized configuration for commonrpc.
//!
//! Constant tables hold protocol and runtime defaults. `ServerConfig` and
//! `ClientConfig` are the file-loadable configuration surfaces of a server
//! process and a calling process respectively.

use crate::registry::Endpoint;
use crate::{Result, RpcError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Protocol and runtime defaults.
pub struct RpcConfig;

impl RpcConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 6565;
    pub const DEFAULT_MAX_WORKERS: usize = 10;

    /// Serialization tag meaning "payload is UTF-8 JSON".
    pub const SERIALIZE_JSON: i32 = 3;

    /// Serialized results above this size are logged as a truncated preview.
    pub const LOG_PREVIEW_BYTES: usize = 4096;
    pub const LOG_TRUNCATION_MARKER: &'static str = "...";
    pub const LOG_TARGET: &'static str = "rpc_log";

    /// Maximum accepted frame size (64 MiB).
    pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Idle streams kept per connection handle.
    pub const MAX_IDLE_STREAMS: usize = 16;
}

/// Server process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: RpcConfig::DEFAULT_HOST.to_string(),
            port: RpcConfig::DEFAULT_PORT,
            max_workers: RpcConfig::DEFAULT_MAX_WORKERS,
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(RpcError::configuration("max_workers must be at least 1"));
        }
        if self.host.is_empty() {
            return Err(RpcError::configuration("host must not be empty"));
        }
        Ok(())
    }
}

/// Calling process configuration: the servers an endpoint registry is loaded with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub servers: Vec<Endpoint>,
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| RpcError::Io {
        message: format!("Failed to read config {}: {}", path.display(), e),
        source: Some(e),
    })?;
    serde_json::from_str(&raw).map_err(|e| RpcError::Configuration {
        message: format!("Invalid config {}: {}", path.display(), e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:6565");
        assert_eq!(config.max_workers, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 7000}}"#).unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_workers, 10);
    }

    #[test]
    fn test_server_config_rejects_zero_workers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_workers": 0}}"#).unwrap();

        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RpcError::Configuration { .. }));
    }

    #[test]
    fn test_client_config_lists_servers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"servers": [{{"name": "math", "host": "10.0.0.1", "port": 6565}}]}}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].addr(), "10.0.0.1:6565");
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = ClientConfig::from_file("/nonexistent/commonrpc.json").unwrap_err();
        assert!(matches!(err, RpcError::Io { .. }));
    }
}
