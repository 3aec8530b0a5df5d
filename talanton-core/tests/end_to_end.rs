//! Black-box end-to-end scenarios exercised against the public API
//! only (no `pub(crate)` access), covering scenarios 1, 2, 3, and 5.

use shared::commitment::decode_commitment;
use shared::{AssetAmount, AssetId, Hash256, NetworkParams};
use talanton_core::consensus::difficulty::Target256;
use talanton_core::consensus::issuance;
use talanton_core::transaction::{TxInput, TxOutput, Transaction};
use talanton_core::utxo::{Coin, OutPoint, UtxoSet};
use talanton_core::{block::BlockHeader, block::Block, finality::AnchorState, Blockchain, Mempool, TalantonError};

fn mined_block(prev_hash: Hash256, height: u64, timestamp: u32, params: &NetworkParams) -> Block {
    let coinbase = Transaction::coinbase(
        height,
        vec![AssetAmount::new(AssetId::Talanton, issuance::reward(height, AssetId::Talanton))],
        vec![1],
    );
    let merkle_root = talanton_core::block::calculate_merkle_root(std::slice::from_ref(&coinbase));
    let mut header = BlockHeader::new(1, prev_hash, merkle_root, timestamp, params.initial_bits, 0, 0, 0, 30_000_000);
    while !header.meets_proof_of_work().unwrap() {
        header.nonce += 1;
    }
    Block::new(header, vec![coinbase])
}

/// Scenario 1: genesis then 5 empty-of-user-tx blocks reaches height 6
/// with supply equal to the sum of rewards 0..5; disconnecting the
/// last block restores height 4 and supply 0..4.
#[test]
fn genesis_plus_five_blocks_then_disconnect() {
    let params = NetworkParams::regtest();
    let genesis = mined_block(Hash256::zero(), 0, 0, &params);
    let mut chain = Blockchain::new(params, &genesis).unwrap();

    let mut blocks = vec![genesis];
    for height in 1..=5u64 {
        let block = mined_block(chain.tip_hash(), height, height as u32 * 600, &params);
        chain.connect_block(&block, height as u32 * 600).unwrap();
        blocks.push(block);
    }

    assert_eq!(chain.height(), 5);
    let expected_full: u64 = (0..=5).map(|h| issuance::reward(h, AssetId::Talanton)).sum();
    assert_eq!(chain.supply_of(AssetId::Talanton), expected_full);

    let last = blocks.pop().unwrap();
    chain.disconnect_tip(&last).unwrap();

    assert_eq!(chain.height(), 4);
    let expected_partial: u64 = (0..=4).map(|h| issuance::reward(h, AssetId::Talanton)).sum();
    assert_eq!(chain.supply_of(AssetId::Talanton), expected_partial);
    assert_eq!(chain.tip_hash(), blocks.last().unwrap().hash());
}

/// Scenario 2: the exact commitment string validates against active
/// stake 150; replaying it once `anchor.last_finalized_height` already
/// equals 42 is rejected as non-monotonic.
#[test]
fn drachma_commitment_validates_then_rejects_as_non_monotonic() {
    let encoded = format!(
        "DRACHMA:2:42:{}:{}:{}:{}:val1|70|sig-a,val2|40|sig-b",
        "a".repeat(64),
        "b".repeat(64),
        "c".repeat(64),
        "d".repeat(64),
    );
    let commitment = decode_commitment(&encoded).unwrap();

    let fresh_anchor = AnchorState::new();
    talanton_core::finality::validate_l2_commit(&commitment, &fresh_anchor, 150).unwrap();

    let stale_anchor = AnchorState { last_finalized_height: 42 };
    assert!(talanton_core::finality::validate_l2_commit(&commitment, &stale_anchor, 150).is_err());
}

/// Scenario 3: an RBF replacement carrying fee 2100 (>= the 1000-unit
/// bump and >= 1.1x fee-rate) evicts the original; one carrying 1999
/// does not.
#[test]
fn mempool_rbf_replacement_threshold() {
    let mut params = NetworkParams::regtest();
    params.min_relay_fee_rate = 0;
    params.max_mempool_size = 1_000_000;

    let mut utxo_set = UtxoSet::new();
    let outpoint = OutPoint::new(Hash256::sha256(b"scenario-3"), 0);
    utxo_set.add_coin(
        outpoint,
        Coin::new(TxOutput::new(AssetAmount::new(AssetId::Talanton, 10_000), vec![1]), 0, false),
    );

    let spend = |fee: u64| {
        Transaction::new(
            1,
            vec![TxInput::new(outpoint, vec![], 0)],
            vec![TxOutput::new(AssetAmount::new(AssetId::Talanton, 10_000 - fee), vec![2])],
            0,
        )
    };

    let mut pool = Mempool::new(params);
    let original = pool.admit(spend(1000), &utxo_set, 1, 100, 0).unwrap();

    assert!(matches!(
        pool.admit(spend(1999), &utxo_set, 1, 100, 1),
        Err(TalantonError::InsufficientReplacementFee)
    ));
    assert!(pool.contains(&original));

    let replacement = pool.admit(spend(2100), &utxo_set, 1, 100, 2).unwrap();
    assert!(!pool.contains(&original));
    assert!(pool.contains(&replacement));
}

/// Scenario 5: a block hash equal to the decoded target is accepted; a
/// hash one unit greater is rejected. Regtest's `0x207f_ffff` decodes
/// (big-endian) to `0x7f 0xff 0xff` followed by 29 zero bytes — derived
/// here from the same compact-bits rule `from_compact` implements,
/// independent of its private byte layout.
#[test]
fn proof_of_work_boundary_is_strict() {
    let params = NetworkParams::regtest();
    let target = Target256::from_compact(params.initial_bits).unwrap();

    let mut at_boundary = [0u8; 32];
    at_boundary[0] = 0x7f;
    at_boundary[1] = 0xff;
    at_boundary[2] = 0xff;
    assert!(target.meets(&Hash256::from_bytes(at_boundary)));

    // Adding 1 to the 256-bit big-endian number touches its
    // least-significant byte, the last element of the array.
    let mut one_above = at_boundary;
    one_above[31] = 1;
    assert!(!target.meets(&Hash256::from_bytes(one_above)));
}
