//! Ambient node configuration types shared across the three engines.

use serde::{Deserialize, Serialize};

pub type Timestamp = u32;
pub type BlockHeight = u64;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
    Regtest,
}

/// Node-wide configuration loaded from CLI flags or a config file. Never
/// read from process-wide global state inside consensus code — every
/// engine constructor takes its own `NetworkParams`/collaborators instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub network: NetworkType,
    pub p2p_port: u16,
    pub rpc_port: u16,
    pub bind_address: String,
    pub bootstrap_peers: Vec<String>,
    pub data_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Devnet,
            p2p_port: 8333,
            rpc_port: 8332,
            bind_address: "127.0.0.1".to_string(),
            bootstrap_peers: vec![],
            data_dir: "./data".to_string(),
        }
    }
}

/// P2P peer metadata, populated by the (out-of-core) transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: String,
    pub address: String,
    pub height: BlockHeight,
    pub protocol_version: u32,
    pub last_seen: Timestamp,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_config_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.network, NetworkType::Devnet);
        assert_eq!(config.p2p_port, 8333);
        assert_eq!(config.rpc_port, 8332);
    }
}
