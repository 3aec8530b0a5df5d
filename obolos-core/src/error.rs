//! Layer-3 (OBOLOS) error kinds (§7). Execution outcomes that are part
//! of normal EVM control flow (out-of-gas, stack over/underflow, an
//! invalid jump, ...) are represented as `vm::ExecResult` variants, not
//! as `Err`s here — `ObolosError` is reserved for inputs the execution
//! loop cannot even begin to interpret.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObolosError {
    #[error("address must be exactly 20 bytes, got {0}")]
    InvalidAddressLength(usize),

    #[error("invalid hex encoding: {0}")]
    InvalidHexEncoding(String),

    #[error(transparent)]
    Shared(#[from] shared::PantheonError),
}

impl From<hex::FromHexError> for ObolosError {
    fn from(err: hex::FromHexError) -> Self {
        ObolosError::InvalidHexEncoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ObolosError>;
