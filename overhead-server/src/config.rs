use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use overhead_core::sat::{DEFAULT_CATALOG_URL, DEFAULT_TARGET_COUNT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding the selection document and the position snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory of static frontend assets, served at the root path
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Working set size (tracked objects)
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Upstream satellite catalog endpoint
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Served via /api/maps/key; the GOOGLE_MAPS_API_KEY env var wins
    #[serde(default)]
    pub maps_api_key: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_target_count() -> usize {
    DEFAULT_TARGET_COUNT
}

fn default_upstream_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
            target_count: default_target_count(),
            upstream_url: default_upstream_url(),
            maps_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;

        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Environment variable takes precedence over the config file
    pub fn resolved_maps_api_key(&self) -> Option<String> {
        std::env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.maps_api_key.clone())
    }
}
