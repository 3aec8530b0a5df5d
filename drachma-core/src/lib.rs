//! Layer-2 DRACHMA: the proof-of-stake validator set (deterministic
//! proposer selection, double-sign slashing), anchor-state tracking,
//! and validation of OBOLOS-produced finality commitments before they
//! anchor into DRACHMA (§4.7). DRACHMA's own commitments, in turn, are
//! validated at TALANTON by `talanton_core::finality::validate_l2_commit`,
//! completing the OBOLOS -> DRACHMA -> TALANTON anchoring chain.

pub mod anchor;
pub mod error;
pub mod validator;

pub use anchor::{validate_l3_commit, AnchorState};
pub use error::{DrachmaError, Result};
pub use validator::{select_deterministic_proposer, slash_double_sign, total_active_stake, SlashingEvent, Validator};
