//! Configuration for the Postboard client.

use anyhow::Result;
use postboard_core::post::{POSTBOARD_PROVIDER, POSTBOARD_TOPIC};
use postboard_core::wire::TIPS_MESSAGE_BOX;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Environment variable that overrides the overlay URL.
pub const OVERLAY_URL_ENV: &str = "POSTBOARD_OVERLAY_URL";

/// Which overlay deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// A node on this machine
    Local,
    /// The staging deployment
    Testnet,
    /// The production deployment
    Mainnet,
}

impl NetworkMode {
    /// Detects the network mode from an overlay URL's host.
    pub fn detect(url: &str) -> Self {
        let host = url
            .split("://")
            .nth(1)
            .unwrap_or(url)
            .split(|c| c == '/' || c == ':')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        if host == "localhost" || host == "127.0.0.1" || host == "0.0.0.0" {
            NetworkMode::Local
        } else if host.contains("staging") {
            NetworkMode::Testnet
        } else {
            NetworkMode::Mainnet
        }
    }

    /// The overlay URL used when none is configured.
    pub fn default_overlay_url(&self) -> &'static str {
        match self {
            NetworkMode::Local => "http://localhost:3103",
            NetworkMode::Testnet => "https://staging-overlay.babbage.systems",
            NetworkMode::Mainnet => "https://overlay.babbage.systems",
        }
    }
}

/// Configuration for the Postboard client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the overlay node
    pub overlay_url: String,
    /// Network mode, derived from the overlay host
    pub network: NetworkMode,
    /// Topic new posts are submitted under
    pub topic: String,
    /// Lookup provider that lists posts
    pub provider: String,
    /// Message box tips are delivered to
    pub message_box: String,
    /// Amount locked into a new post when none is given
    pub default_amount: u64,
    /// Whether to drop posts whose identity linkage does not verify
    pub verify_linkage: bool,
    /// Seconds between refreshes in watch mode
    pub poll_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            overlay_url: NetworkMode::Local.default_overlay_url().to_string(),
            network: NetworkMode::Local,
            topic: POSTBOARD_TOPIC.to_string(),
            provider: POSTBOARD_PROVIDER.to_string(),
            message_box: TIPS_MESSAGE_BOX.to_string(),
            default_amount: 1000,
            verify_linkage: true,
            poll_interval_secs: 30,
        }
    }
}

impl ClientConfig {
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

    /// Points the client at another overlay, re-detecting the network mode.
    pub fn set_overlay_url(&mut self, url: &str) {
        self.overlay_url = url.trim_end_matches('/').to_string();
        self.network = NetworkMode::detect(&self.overlay_url);
    }

    /// Applies overrides from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(OVERLAY_URL_ENV) {
            if !url.is_empty() {
                self.set_overlay_url(&url);
            }
        }
    }
}
