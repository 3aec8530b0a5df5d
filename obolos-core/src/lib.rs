//! Layer-3 OBOLOS: an EVM-compatible execution core (§4.6) —
//! 256-bit word arithmetic, a fixed gas-cost opcode table, a
//! byte-addressable expanding memory, persistent contract storage,
//! and a deterministic world-state with snapshot/restore. Grounded in
//! `original_source/layer1/evm/vm.h/.cpp` and `state.h/.cpp`.
//!
//! OBOLOS itself produces the finality commitments that anchor into
//! DRACHMA (`drachma_core::anchor::validate_l3_commit`), which in turn
//! anchor into TALANTON (`talanton_core::finality::validate_l2_commit`)
//! — this crate is deliberately self-contained and does not depend on
//! either of the other two layer crates.

pub mod error;
pub mod opcode;
pub mod state;
pub mod uint256;
pub mod vm;

pub use error::{ObolosError, Result};
pub use opcode::Opcode;
pub use state::{Account, Address, Snapshot, WorldState};
pub use uint256::U256;
pub use vm::{ExecResult, ExecutionContext, Vm, MAX_CALL_DEPTH, MAX_STACK_SIZE};
