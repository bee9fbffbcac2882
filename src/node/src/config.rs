//! Configuration for the overlay node.

use anyhow::Result;
use postboard_core::post::{POSTBOARD_PROVIDER, POSTBOARD_TOPIC};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Configuration for the overlay node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// HTTP configuration
    pub http: HttpConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Overlay services configuration
    pub overlay: OverlayConfig,
}

/// HTTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address for the HTTP server
    pub listen_addr: String,
    /// CORS allowed origins, `*` for any
    pub cors_domains: Vec<String>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to enable the metrics server
    pub enabled: bool,
    /// Listen address for the metrics server
    pub listen_addr: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the data directory
    pub data_dir: String,
}

/// Overlay services configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Topic the topic manager admits outputs under
    pub topic: String,
    /// Name the lookup service answers to
    pub provider: String,
    /// Most messages a single box may hold
    pub max_messages_per_box: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                listen_addr: "127.0.0.1:3103".to_string(),
                cors_domains: vec!["*".to_string()],
                max_body_bytes: 1024 * 1024,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_addr: "127.0.0.1:9090".to_string(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            overlay: OverlayConfig {
                topic: POSTBOARD_TOPIC.to_string(),
                provider: POSTBOARD_PROVIDER.to_string(),
                max_messages_per_box: 1000,
            },
        }
    }
}

impl NodeConfig {
    /// Loads configuration from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
