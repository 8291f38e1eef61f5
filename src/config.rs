//! Configuration types for the DataDome relay.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default validation endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://api.datadome.co/validate-request/";

/// Main configuration for the DataDome relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDomeConfig {
    /// Server-side API key sent as `Key`
    pub server_key: String,

    /// Validation API settings
    pub api: ApiConfig,

    /// Identity reported to the service
    pub module: ModuleConfig,

    /// Response relay settings
    pub relay: RelayConfig,
}

impl Default for DataDomeConfig {
    fn default() -> Self {
        Self {
            server_key: String::new(),
            api: ApiConfig::default(),
            module: ModuleConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl DataDomeConfig {
    /// Create a configuration with the given server key and default settings.
    pub fn with_server_key(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
            ..Self::default()
        }
    }
}

/// Validation API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Validation endpoint URL
    pub endpoint: String,

    /// Hard deadline for one validation exchange in milliseconds
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 500,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Static identity fields sent with every validation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// `RequestModuleName`
    pub name: String,

    /// `ModuleVersion`
    pub version: String,

    /// `ServerName`
    pub server_name: String,

    /// `ServerRegion`
    pub server_region: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: "Rust".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            server_name: "zentinel".to_string(),
            server_region: "sfo1".to_string(),
        }
    }
}

/// Response relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Cookie carrying the DataDome client identifier
    pub client_id_cookie: String,

    /// Public suffix the service wrongly scopes cookies to.
    /// `Domain=<suffix>` is rewritten to the request host.
    pub public_suffix: String,

    /// Attach `x-datadome-latency` on the edge path
    pub latency_header: bool,

    /// Answer 429 on the edge path when a bot verdict has no redirect URL.
    /// When false the request is passed through with the verdict headers.
    pub block_unredirected_bots: bool,

    /// Deadline for fetching a rewrite target in milliseconds
    pub rewrite_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            client_id_cookie: "datadome".to_string(),
            public_suffix: ".vercel.app".to_string(),
            latency_header: true,
            block_unredirected_bots: false,
            rewrite_timeout_ms: 2000,
        }
    }
}

impl RelayConfig {
    pub fn rewrite_timeout(&self) -> Duration {
        Duration::from_millis(self.rewrite_timeout_ms)
    }
}
