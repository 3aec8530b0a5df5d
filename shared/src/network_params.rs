//! Consensus-affecting constants bundled into a single value, passed into
//! every engine constructor instead of being read from global state
//! (Design Notes §9: "Global-ish configuration").

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// 4-byte magic identifying the network on the wire (§4.8).
    pub magic: [u8; 4],
    /// Initial compact-bits difficulty target for a fresh chain.
    pub initial_bits: u32,
    /// Target seconds between blocks.
    pub target_spacing_secs: u32,
    /// Blocks between difficulty retargets.
    pub difficulty_adjustment_interval: u32,
    /// Blocks a coinbase output must wait before becoming spendable.
    pub coinbase_maturity: u32,
    /// Blocks between each halving of the per-asset issuance schedule.
    pub halving_interval: u64,
    /// Maximum serialized block size in bytes.
    pub max_block_size: usize,
    /// Maximum mempool size in bytes before eviction kicks in.
    pub max_mempool_size: usize,
    /// Minimum fee rate (base units per byte) accepted for relay.
    pub min_relay_fee_rate: u64,
}

impl NetworkParams {
    pub const TARGET_TIMESPAN_SECS: u32 = 2016 * 600;

    #[must_use]
    pub const fn regtest() -> Self {
        Self {
            magic: [0xfa, 0xbf, 0xb5, 0xda],
            initial_bits: 0x207f_ffff,
            target_spacing_secs: 600,
            difficulty_adjustment_interval: 2016,
            coinbase_maturity: 100,
            halving_interval: 210_000,
            max_block_size: 4 * 1024 * 1024,
            max_mempool_size: 300 * 1024 * 1024,
            min_relay_fee_rate: 1,
        }
    }

    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            magic: [0xf9, 0xbe, 0xb4, 0xd9],
            initial_bits: 0x1d00_ffff,
            ..Self::regtest()
        }
    }

    #[must_use]
    pub const fn testnet() -> Self {
        Self {
            magic: [0x0b, 0x11, 0x09, 0x07],
            initial_bits: 0x1d00_ffff,
            ..Self::regtest()
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::regtest()
    }
}
