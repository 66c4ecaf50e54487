use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "launcher.toml";

/// Launcher configuration, optionally loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub cluster: Cluster,

    /// Overrides the cluster's public RPC endpoint
    pub rpc_url: Option<String>,

    pub token: TokenConfig,

    pub metadata: MetadataConfig,

    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

/// The token created by the launch flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub decimals: u8,
    /// Whole tokens minted to the creator
    pub amount: u64,
    pub image: PathBuf,
}

/// Images used by the standalone metadata commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub create_image: PathBuf,
    pub update_image: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bundlr/Irys node that accepts uploads
    pub address: String,
    pub timeout_ms: u64,
    /// Prefix for the URIs handed back after an upload
    pub gateway: String,
    /// Headroom applied to the node's quoted price before funding
    pub price_multiplier: f64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Hidan_WR".to_string(),
            symbol: "HW".to_string(),
            description: "Welcome to Hidan clubbb".to_string(),
            decimals: 2,
            amount: 10_000,
            image: PathBuf::from("assets/hidan.png"),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            create_image: PathBuf::from("assets/kunai.png"),
            update_image: PathBuf::from("assets/minato.png"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            address: "https://devnet.irys.xyz".to_string(),
            timeout_ms: 60_000,
            gateway: "https://arweave.net".to_string(),
            price_multiplier: 1.5,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Cluster {
    pub fn url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://localhost:8899",
        }
    }

    /// Query string the Solana explorer needs to look at this cluster.
    pub fn explorer_query(&self) -> &'static str {
        match self {
            Cluster::Devnet => "?cluster=devnet",
            Cluster::Testnet => "?cluster=testnet",
            Cluster::MainnetBeta => "",
            Cluster::Localnet => "?cluster=custom&customUrl=http%3A%2F%2Flocalhost%3A8899",
        }
    }
}

impl Config {
    /// Reads `path`, or `launcher.toml` when it exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Config::default()),
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.cluster.url().to_string())
    }
}
