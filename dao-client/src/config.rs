//! Endpoints and contract addresses of a deployment.
//!
//! Each supported network comes with default endpoints. A configuration
//! read from JSON only needs to name the network and the values it
//! overrides.
use dao_encoding::Address;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

const GRAPHQL_URL_PREFIX: &str = "https://subgraph.satsuma-prod.com/qHR2wGfc5RLi6/aragon/osx-";

const IPFS_PROD_NODES: &[&str] = &[
    "https://ipfs-0.aragon.network",
    "https://ipfs-1.aragon.network",
];

const IPFS_TEST_NODES: &[&str] = &["https://testing-ipfs-0.aragon.network"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid client configuration")]
    Json(#[from] serde_json::Error),

    #[error("unknown network `{0}`")]
    UnknownNetwork(String),

    #[error("no {0} endpoint configured")]
    NoEndpoint(&'static str),

    #[error("no address configured for the `{0}` contract")]
    NoContract(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Goerli,
    Polygon,
    Mumbai,
}

impl Network {
    pub fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Goerli => "goerli",
            Network::Polygon => "polygon",
            Network::Mumbai => "mumbai",
        }
    }

    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Goerli | Network::Mumbai)
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "goerli" => Ok(Network::Goerli),
            "polygon" => Ok(Network::Polygon),
            "mumbai" => Ok(Network::Mumbai),
            _ => Err(ConfigError::UnknownNetwork(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpfsNode {
    pub url: String,
    /// Extra headers sent with every request, API keys typically.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl IpfsNode {
    pub fn new(url: impl Into<String>) -> Self {
        IpfsNode {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }
}

/// Addresses of the framework contracts. Unknown until configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractAddresses {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_setup_processor: Option<Address>,
}

impl ContractAddresses {
    pub fn plugin_setup_processor(&self) -> Result<Address, ConfigError> {
        self.plugin_setup_processor
            .ok_or(ConfigError::NoContract("pluginSetupProcessor"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PartialConfig")]
pub struct ClientConfig {
    pub network: Network,
    pub graphql_urls: Vec<String>,
    pub ipfs_nodes: Vec<IpfsNode>,
    pub contracts: ContractAddresses,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    #[serde(default)]
    network: Network,
    graphql_urls: Option<Vec<String>>,
    ipfs_nodes: Option<Vec<IpfsNode>>,
    #[serde(default)]
    contracts: ContractAddresses,
}

impl From<PartialConfig> for ClientConfig {
    fn from(partial: PartialConfig) -> Self {
        let defaults = ClientConfig::for_network(partial.network);
        ClientConfig {
            network: partial.network,
            graphql_urls: partial.graphql_urls.unwrap_or(defaults.graphql_urls),
            ipfs_nodes: partial.ipfs_nodes.unwrap_or(defaults.ipfs_nodes),
            contracts: partial.contracts,
        }
    }
}

impl ClientConfig {
    /// The public endpoints serving `network`.
    pub fn for_network(network: Network) -> Self {
        let ipfs_nodes = if network.is_testnet() {
            IPFS_TEST_NODES
        } else {
            IPFS_PROD_NODES
        };
        ClientConfig {
            network,
            graphql_urls: vec![format!("{}{}/api", GRAPHQL_URL_PREFIX, network)],
            ipfs_nodes: ipfs_nodes.iter().map(|url| IpfsNode::new(*url)).collect(),
            contracts: ContractAddresses::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graphql_urls.is_empty() {
            return Err(ConfigError::NoEndpoint("GraphQL"));
        }
        if self.ipfs_nodes.is_empty() {
            return Err(ConfigError::NoEndpoint("IPFS"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::for_network(Network::default())
    }
}
