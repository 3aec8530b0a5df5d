pub mod block;
pub mod blockchain;
pub mod consensus;
pub mod error;
pub mod finality;
pub mod mempool;
pub mod mining;
pub mod p2p;
pub mod transaction;
pub mod utxo;

// Re-exports for downstream crates (the root binary in particular).
pub use block::{calculate_merkle_root, Block, BlockHeader};
pub use blockchain::{Blockchain, BlockchainStats, BlockIndex};
pub use error::{Result, TalantonError};
pub use finality::{validate_l2_commit, AnchorState};
pub use mempool::{Mempool, MempoolEntry};
pub use mining::{Miner, MinerConfig, MiningResult};
pub use transaction::{Transaction, TxInput, TxOutput};
pub use utxo::{BlockUndo, Coin, OutPoint, UtxoSet};

// Re-exports of shared types used throughout this crate's public API.
pub use shared::{Hash256, NetworkParams};
