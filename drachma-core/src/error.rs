use shared::PantheonError;
use thiserror::Error;

/// Layer-2 (DRACHMA) error kinds (§7): the proof-of-stake validator set,
/// proposer selection, slashing, and the L3-commitment validation path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrachmaError {
    #[error("validator set is empty")]
    EmptyValidatorSet,

    #[error("total active stake is zero")]
    ZeroActiveStake,

    #[error("invalid slash ratio: {numerator}/{denominator}")]
    InvalidSlashRatio { numerator: u64, denominator: u64 },

    #[error(transparent)]
    Commitment(#[from] shared::commitment::CommitmentError),

    #[error(transparent)]
    Shared(#[from] PantheonError),
}

pub type Result<T> = std::result::Result<T, DrachmaError>;
