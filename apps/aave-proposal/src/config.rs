use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};
use tracing::{info, warn};
use utils::errors::{
    AAVE_CHAINS_PARSE_FAILED, CONFIG_PARSE_FAILED, CONFIG_READ_FAILED, GRAPH_API_KEY_NOT_SET,
};

pub const DEFAULT_SUBGRAPH_URL: &str =
    "https://gateway.thegraph.com/api/subgraphs/id/A7QMszgomC9cnnfpAcqZVLr2DffvkGNfimD8iUSMiurK";
pub const AAVE_GOVERNANCE_V3_ADDRESS: &str = "0xEC568fffba86c094cf06b22134B23074DFE2252c";
pub const CONFIG_PATH_ENV: &str = "AAVE_PROPOSAL_CONFIG";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub subgraph: SubgraphConfig,
    pub onchain: OnchainConfig,
    pub ipfs: IpfsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubgraphConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SUBGRAPH_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// One governance deployment to try for the direct contract read.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub contract_address: String,
    pub rpc_url: String,
}

impl ChainConfig {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnchainConfig {
    /// Tried in this order; the first chain with a valid proposal wins.
    pub chains: Vec<ChainConfig>,
    pub timeout_secs: u64,
}

impl Default for OnchainConfig {
    fn default() -> Self {
        let chain = |name: &str, display_name: &str, rpc_url: &str| ChainConfig {
            name: name.to_string(),
            display_name: Some(display_name.to_string()),
            contract_address: AAVE_GOVERNANCE_V3_ADDRESS.to_string(),
            rpc_url: rpc_url.to_string(),
        };

        Self {
            chains: vec![
                chain("ethereum", "Ethereum Mainnet", "https://eth.llamarpc.com"),
                chain("polygon", "Polygon", "https://polygon-rpc.com"),
                chain(
                    "avalanche",
                    "Avalanche",
                    "https://api.avax.network/ext/bc/C/rpc",
                ),
            ],
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    pub gateway_urls: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            gateway_urls: vec![
                "https://ipfs.io/ipfs".to_string(),
                "https://gateway.pinata.cloud/ipfs".to_string(),
                "https://cloudflare-ipfs.com/ipfs".to_string(),
            ],
            timeout_secs: 5,
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file (explicit path or `AAVE_PROPOSAL_CONFIG`), then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match env::var(CONFIG_PATH_ENV) {
                Ok(path) => Self::from_file(Path::new(&path))?,
                Err(_) => AppConfig::default(),
            },
        };

        config.apply_env_overrides()?;

        if config.subgraph.api_key.is_none() {
            warn!("{}", GRAPH_API_KEY_NOT_SET);
        }

        info!(
            endpoint = %config.subgraph.endpoint,
            chains = config.onchain.chains.len(),
            gateways = config.ipfs.gateway_urls.len(),
            "Config loaded"
        );

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("{}: {}", CONFIG_READ_FAILED, path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("{}: {}", CONFIG_PARSE_FAILED, path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("GRAPH_API_KEY") {
            if !value.trim().is_empty() {
                self.subgraph.api_key = Some(value.trim().to_string());
            }
        }

        if let Ok(value) = env::var("SUBGRAPH_URL") {
            self.subgraph.endpoint = value;
        }

        if let Ok(value) = env::var("AAVE_CHAINS") {
            self.onchain.chains = serde_json::from_str::<Vec<ChainConfig>>(&value)
                .context(AAVE_CHAINS_PARSE_FAILED)?;
        }

        if let Ok(value) = env::var("IPFS_GATEWAYS") {
            self.ipfs.gateway_urls = value
                .split(',')
                .map(str::trim)
                .filter(|gateway| !gateway.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }
}
