//! Block assembly and proof-of-work search (§4.2, §5). Mining is a
//! read-then-propose loop: snapshot the tip, assemble a candidate
//! block, search the nonce space, submit for connection. Threads check
//! a shared cancellation flag between nonce trials so a new tip (or an
//! explicit stop) can abort the search promptly (Design Notes §9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use shared::{AssetAmount, AssetId, Hash256, NetworkParams};

use crate::block::{calculate_merkle_root, Block, BlockHeader};
use crate::consensus::{difficulty::Target256, issuance};
use crate::error::{Result, TalantonError};
use crate::transaction::Transaction;

/// Miner configuration: where block rewards are paid and how many
/// worker threads search the nonce space.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub reward_script: Vec<u8>,
    pub threads: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            reward_script: vec![0x51],
            threads: thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(1),
        }
    }
}

/// A successfully mined block plus how many nonces were tried.
#[derive(Debug, Clone)]
pub struct MiningResult {
    pub block: Block,
    pub attempts: u64,
}

/// Assembles the coinbase transaction paying the full per-asset
/// issuance schedule for `height` to `reward_script` (§4.1: "all three
/// assets may appear in one L1 coinbase").
#[must_use]
pub fn build_coinbase(height: u64, reward_script: Vec<u8>) -> Transaction {
    let rewards: Vec<AssetAmount> = AssetId::ALL
        .into_iter()
        .map(|asset| AssetAmount::new(asset, issuance::reward(height, asset)))
        .filter(|aa| aa.amount > 0)
        .collect();
    let rewards = if rewards.is_empty() {
        vec![AssetAmount::new(AssetId::Talanton, 0)]
    } else {
        rewards
    };
    Transaction::coinbase(height, rewards, reward_script)
}

/// Searches for a nonce that satisfies `bits`, splitting the `u32`
/// nonce space evenly across `config.threads` worker threads. Returns
/// as soon as any thread finds a solution or `cancel` is set.
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    #[must_use]
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    /// Mines a block extending `prev_hash` at `height`, including
    /// `mempool_transactions` alongside the coinbase (§4.2).
    pub fn mine_block(
        &self,
        prev_hash: Hash256,
        height: u64,
        mempool_transactions: Vec<Transaction>,
        timestamp: u32,
        bits: u32,
        params: &NetworkParams,
        cancel: &AtomicBool,
    ) -> Result<MiningResult> {
        let coinbase = build_coinbase(height, self.config.reward_script.clone());
        let mut transactions = vec![coinbase];
        transactions.extend(mempool_transactions);

        let merkle_root = calculate_merkle_root(&transactions);
        let header = BlockHeader::new(
            1,
            prev_hash,
            merkle_root,
            timestamp,
            bits,
            0,
            params.min_relay_fee_rate,
            0,
            u64::try_from(params.max_block_size).unwrap_or(u64::MAX),
        );

        self.search(header, transactions, cancel)
    }

    fn search(&self, header: BlockHeader, transactions: Vec<Transaction>, cancel: &AtomicBool) -> Result<MiningResult> {
        let target = Target256::from_compact(header.bits)?;
        let threads = self.config.threads.max(1);
        let found: Arc<Mutex<Option<(u32, u64)>>> = Arc::new(Mutex::new(None));
        let attempts = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let span = u64::from(u32::MAX) / threads as u64 + 1;

        thread::scope(|scope| {
            for thread_index in 0..threads {
                let start = (thread_index as u64 * span).min(u64::from(u32::MAX));
                let end = ((thread_index as u64 + 1) * span).min(u64::from(u32::MAX) + 1);
                let mut candidate = header;
                let found = Arc::clone(&found);
                let attempts = Arc::clone(&attempts);
                scope.spawn(move || {
                    let mut local_attempts = 0u64;
                    for nonce in start..end {
                        if cancel.load(Ordering::Relaxed) || found.lock().unwrap().is_some() {
                            break;
                        }
                        candidate.nonce = nonce as u32;
                        local_attempts += 1;
                        if target.meets(&candidate.hash()) {
                            *found.lock().unwrap() = Some((candidate.nonce, local_attempts));
                            break;
                        }
                    }
                    attempts.fetch_add(local_attempts, Ordering::Relaxed);
                });
            }
        });

        let (winning_nonce, _) = found.lock().unwrap().take().ok_or(TalantonError::BadProofOfWork)?;
        let mut final_header = header;
        final_header.nonce = winning_nonce;
        let block = Block::new(final_header, transactions);
        Ok(MiningResult {
            block,
            attempts: attempts.load(Ordering::Relaxed),
        })
    }
}
