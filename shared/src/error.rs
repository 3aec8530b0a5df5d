use thiserror::Error;

/// Crate-wide error type shared by every PantheonChain engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PantheonError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("checked arithmetic overflow")]
    ArithmeticOverflow,

    #[error("checked arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("amount {amount} exceeds supply cap {cap} for asset {asset}")]
    AmountExceedsCap {
        asset: String,
        amount: u64,
        cap: u64,
    },

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("truncated or malformed input")]
    Truncated,

    #[error("non-canonical encoding")]
    NonCanonical,
}

pub type Result<T> = std::result::Result<T, PantheonError>;
