use shared::PantheonError;
use thiserror::Error;

/// Layer-1 (TALANTON) error kinds (§7): structural, consensus, and
/// mempool-policy failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TalantonError {
    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("truncated input")]
    Truncated,

    #[error("non-canonical encoding")]
    NonCanonical,

    #[error("broken asset conservation for transaction")]
    BrokenConservation,

    #[error("supply overflow for asset")]
    SupplyOverflow,

    #[error("supply exceeds cap for asset")]
    SupplyExceedsCap,

    #[error("proof-of-work target not met")]
    BadProofOfWork,

    #[error("merkle root mismatch")]
    BadMerkleRoot,

    #[error("coinbase output not yet mature")]
    ImmatureCoinbase,

    #[error("missing or already-spent input")]
    MissingOrSpentInput,

    #[error("duplicate input within transaction")]
    DuplicateInput,

    #[error("invalid coinbase reward")]
    InvalidCoinbaseReward,

    #[error("block exceeds maximum size")]
    BlockTooLarge,

    #[error("block structurally invalid: {0}")]
    InvalidBlockStructure(String),

    #[error("cannot disconnect genesis block")]
    CannotDisconnectGenesis,

    #[error("block is not the current tip")]
    NotTip,

    #[error("mismatched undo data")]
    MismatchedUndo,

    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("conflicts with an existing mempool entry without signalling RBF")]
    ConflictWithoutRbf,

    #[error("insufficient replacement fee")]
    InsufficientReplacementFee,

    #[error("mempool size cap exhausted")]
    MempoolFull,

    #[error("fee rate below minimum relay rate")]
    BelowRelayRate,

    #[error("bad network magic")]
    BadMagic,

    #[error("payload exceeds the maximum frame size")]
    OversizePayload,

    #[error("checksum mismatch in wire frame")]
    ChecksumMismatch,

    #[error("peer timed out")]
    Timeout,

    #[error(transparent)]
    Commitment(#[from] shared::commitment::CommitmentError),

    #[error(transparent)]
    Shared(#[from] PantheonError),
}

pub type Result<T> = std::result::Result<T, TalantonError>;
