//! The execution loop (§4.6): stack, byte-addressable memory, gas
//! metering, and opcode dispatch over a `WorldState`. Grounded in
//! `original_source/layer1/evm/vm.h/.cpp`'s `VM`/`Execute`/
//! `ExecuteOpcode`; the original's C++ exceptions for stack
//! under/overflow become `ExecResult` return values here rather than
//! panics, matching this crate's no-`unwrap`-in-consensus-paths style.

use crate::opcode::Opcode;
use crate::state::{Address, WorldState};
use crate::uint256::U256;

pub const MAX_STACK_SIZE: usize = 1024;
pub const MAX_CALL_DEPTH: u32 = 1024;

/// Outcome of a single `Vm::execute` call (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Success,
    Returned,
    Revert,
    OutOfGas,
    StackUnderflow,
    StackOverflow,
    InvalidJump,
    InvalidOpcode,
    StaticCallViolation,
    DepthExceeded,
}

/// Internal control-flow signal from a single opcode back to the main
/// loop, distinct from `ExecResult`: `Jumped` must skip the ordinary
/// `pc += 1` advance since the opcode already repointed `pc` itself.
enum Step {
    Advance,
    Jumped,
    Terminal(ExecResult),
}

/// Inputs to a contract execution: the calling convention, the block
/// environment, and call data (§3's Execution Context).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub origin: Address,
    pub caller: Address,
    pub address: Address,
    pub value: U256,
    pub input_data: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub block_number: u64,
    pub timestamp: u64,
    pub coinbase: Address,
    pub difficulty: u64,
    pub gas_limit_block: u64,
    pub chain_id: u64,
    pub base_fee: u64,
    pub is_static: bool,
    pub depth: u32,
}

/// Executes EVM bytecode against a `WorldState`, accumulating gas
/// usage and producing an `ExecResult` plus any returned/reverted data.
pub struct Vm<'a> {
    state: &'a mut WorldState,
    ctx: ExecutionContext,
    stack: Vec<U256>,
    memory: Vec<u8>,
    return_data: Vec<u8>,
    gas_used: u64,
}

impl<'a> Vm<'a> {
    #[must_use]
    pub fn new(state: &'a mut WorldState, ctx: ExecutionContext) -> Self {
        Self {
            state,
            ctx,
            stack: Vec::with_capacity(MAX_STACK_SIZE),
            memory: Vec::new(),
            return_data: Vec::new(),
            gas_used: 0,
        }
    }

    #[must_use]
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    #[must_use]
    pub fn gas_remaining(&self) -> u64 {
        self.ctx.gas_limit.saturating_sub(self.gas_used)
    }

    fn use_gas(&mut self, amount: u64) -> bool {
        match self.gas_used.checked_add(amount) {
            Some(total) if total <= self.ctx.gas_limit => {
                self.gas_used = total;
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, value: U256) -> Result<(), ExecResult> {
        if self.stack.len() >= MAX_STACK_SIZE {
            return Err(ExecResult::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<U256, ExecResult> {
        self.stack.pop().ok_or(ExecResult::StackUnderflow)
    }

    fn peek(&self, depth: usize) -> Result<U256, ExecResult> {
        if depth >= self.stack.len() {
            return Err(ExecResult::StackUnderflow);
        }
        Ok(self.stack[self.stack.len() - 1 - depth])
    }

    fn dup(&mut self, depth: u8) -> Result<(), ExecResult> {
        if depth == 0 || depth as usize > self.stack.len() {
            return Err(ExecResult::StackUnderflow);
        }
        let value = self.peek(depth as usize - 1)?;
        self.push(value)
    }

    fn swap(&mut self, depth: u8) -> Result<(), ExecResult> {
        if depth == 0 || depth as usize >= self.stack.len() {
            return Err(ExecResult::StackUnderflow);
        }
        let top = self.stack.len() - 1;
        let other = self.stack.len() - 1 - depth as usize;
        self.stack.swap(top, other);
        Ok(())
    }

    /// Grows memory to at least `size` bytes, charging 3 gas per new
    /// 32-byte word (§4.6). Returns `false` on out-of-gas.
    fn expand_memory(&mut self, size: u64) -> bool {
        let size = size as usize;
        if size > self.memory.len() {
            let old_words = (self.memory.len() as u64 + 31) / 32;
            let new_words = (size as u64 + 31) / 32;
            let expansion_cost = (new_words - old_words) * 3;
            if !self.use_gas(expansion_cost) {
                return false;
            }
            self.memory.resize(size, 0);
        }
        true
    }

    fn memory_store(&mut self, offset: u64, value: &U256) -> bool {
        if !self.expand_memory(offset + 32) {
            return false;
        }
        let start = offset as usize;
        self.memory[start..start + 32].copy_from_slice(value.as_bytes());
        true
    }

    fn memory_store8(&mut self, offset: u64, value: u8) -> bool {
        if !self.expand_memory(offset + 1) {
            return false;
        }
        self.memory[offset as usize] = value;
        true
    }

    fn memory_load(&mut self, offset: u64) -> Option<U256> {
        if !self.expand_memory(offset + 32) {
            return None;
        }
        let start = offset as usize;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.memory[start..start + 32]);
        Some(U256::from_bytes(bytes))
    }

    /// Runs `code` to completion or to a terminating/fatal condition.
    /// Pre-scans for JUMPDEST positions, skipping PUSH-N immediate
    /// data, then charges per-opcode gas and dispatches.
    pub fn execute(&mut self, code: &[u8]) -> (ExecResult, Vec<u8>) {
        let jump_dests = prescan_jump_dests(code);

        let mut pc: usize = 0;
        while pc < code.len() {
            let byte = code[pc];
            let Some(op) = Opcode::decode(byte) else {
                return (ExecResult::InvalidOpcode, Vec::new());
            };

            if !self.use_gas(op.gas_cost()) {
                return (ExecResult::OutOfGas, Vec::new());
            }

            match self.execute_opcode(op, code, &mut pc, &jump_dests) {
                Ok(Step::Advance) => pc += 1,
                Ok(Step::Jumped) => {} // pc already repointed at the jump destination.
                Ok(Step::Terminal(result)) => {
                    tracing::debug!(?result, gas_used = self.gas_used, "contract execution finished");
                    return (result, std::mem::take(&mut self.return_data));
                }
                Err(fatal) => {
                    tracing::debug!(result = ?fatal, gas_used = self.gas_used, "contract execution aborted");
                    return (fatal, Vec::new());
                }
            }
        }
        tracing::debug!(gas_used = self.gas_used, "contract execution finished");
        (ExecResult::Success, Vec::new())
    }

    fn execute_opcode(
        &mut self,
        op: Opcode,
        code: &[u8],
        pc: &mut usize,
        jump_dests: &[bool],
    ) -> Result<Step, ExecResult> {
        use Opcode::*;
        match op {
            Stop => return Ok(Step::Terminal(ExecResult::Success)),

            Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a + b)?;
            }
            Mul => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a * b)?;
            }
            Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a - b)?;
            }
            Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a / b)?;
            }
            Mod => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a % b)?;
            }
            Exp => {
                let exponent = self.pop()?;
                let base = self.pop()?;
                self.push(base.pow(&exponent))?;
            }
            Lt => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_word(a < b))?;
            }
            Gt => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_word(a > b))?;
            }
            Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(bool_word(a == b))?;
            }
            IsZero => {
                let a = self.pop()?;
                self.push(bool_word(a.is_zero()))?;
            }
            And => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a & b)?;
            }
            Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a | b)?;
            }
            Xor => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a ^ b)?;
            }
            Not => {
                let a = self.pop()?;
                self.push(!a)?;
            }
            Shl => {
                // Pop order matches `original_source`'s VM::Shl call site
                // (value popped before shift), not the mainnet ordering.
                let value = self.pop()?;
                let shift = self.pop()?;
                self.push(value.shift_left(shift.low_u64()))?;
            }
            Shr => {
                let value = self.pop()?;
                let shift = self.pop()?;
                self.push(value.shift_right(shift.low_u64()))?;
            }

            CallDataLoad => {
                let offset = self.pop()?.low_u64() as usize;
                let mut bytes = [0u8; 32];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = self.ctx.input_data.get(offset + i).copied().unwrap_or(0);
                }
                self.push(U256::from_bytes(bytes))?;
            }
            CallDataSize => {
                self.push(U256::from_u64(self.ctx.input_data.len() as u64))?;
            }
            CallDataCopy => {
                let dest_offset = self.pop()?.low_u64();
                let data_offset = self.pop()?.low_u64() as usize;
                let length = self.pop()?.low_u64();
                if !self.expand_memory(dest_offset + length) {
                    return Err(ExecResult::OutOfGas);
                }
                let dest = dest_offset as usize;
                for i in 0..length as usize {
                    self.memory[dest + i] = self.ctx.input_data.get(data_offset + i).copied().unwrap_or(0);
                }
            }

            MLoad => {
                let offset = self.pop()?.low_u64();
                match self.memory_load(offset) {
                    Some(value) => self.push(value)?,
                    None => return Err(ExecResult::OutOfGas),
                }
            }
            MStore => {
                let offset = self.pop()?.low_u64();
                let value = self.pop()?;
                if !self.memory_store(offset, &value) {
                    return Err(ExecResult::OutOfGas);
                }
            }
            MStore8 => {
                let offset = self.pop()?.low_u64();
                let value = self.pop()?;
                if !self.memory_store8(offset, (value.low_u64() & 0xff) as u8) {
                    return Err(ExecResult::OutOfGas);
                }
            }

            SLoad => {
                let key = self.pop()?;
                let value = self.state.get_storage(&self.ctx.address, &key);
                self.push(value)?;
            }
            SStore => {
                if self.ctx.is_static {
                    return Ok(Step::Terminal(ExecResult::StaticCallViolation));
                }
                let key = self.pop()?;
                let value = self.pop()?;
                self.state.set_storage(self.ctx.address, key, value);
            }

            Pop => {
                self.pop()?;
            }

            op if op.is_push() => {
                let size = op.push_size();
                let mut bytes = [0u8; 32];
                for i in 0..size as usize {
                    if *pc + 1 + i < code.len() {
                        bytes[32 - size as usize + i] = code[*pc + 1 + i];
                    }
                }
                self.push(U256::from_bytes(bytes))?;
                *pc += size as usize;
            }

            op if matches!(op as u8, 0x80..=0x8f) => self.dup(op.dup_depth())?,
            op if matches!(op as u8, 0x90..=0x9f) => self.swap(op.swap_depth())?,

            Address => self.push(address_word(&self.ctx.address))?,
            Caller => self.push(address_word(&self.ctx.caller))?,
            CallValue => self.push(self.ctx.value)?,
            Gas => self.push(U256::from_u64(self.gas_remaining()))?,
            GasPrice => self.push(U256::from_u64(self.ctx.gas_price))?,
            Timestamp => self.push(U256::from_u64(self.ctx.timestamp))?,
            Number => self.push(U256::from_u64(self.ctx.block_number))?,
            Difficulty => self.push(U256::from_u64(self.ctx.difficulty))?,
            GasLimit => self.push(U256::from_u64(self.ctx.gas_limit_block))?,
            ChainId => self.push(U256::from_u64(self.ctx.chain_id))?,
            BaseFee => self.push(U256::from_u64(self.ctx.base_fee))?,

            Jump => {
                let dest = self.pop()?.low_u64() as usize;
                if dest >= jump_dests.len() || !jump_dests[dest] {
                    return Err(ExecResult::InvalidJump);
                }
                *pc = dest;
                return Ok(Step::Jumped);
            }
            JumpI => {
                let dest = self.pop()?.low_u64() as usize;
                let cond = self.pop()?;
                if !cond.is_zero() {
                    if dest >= jump_dests.len() || !jump_dests[dest] {
                        return Err(ExecResult::InvalidJump);
                    }
                    *pc = dest;
                    return Ok(Step::Jumped);
                }
            }
            JumpDest => {}

            Return => {
                let offset = self.pop()?.low_u64();
                let length = self.pop()?.low_u64();
                if !self.expand_memory(offset + length) {
                    return Err(ExecResult::OutOfGas);
                }
                let start = offset as usize;
                self.return_data = self.memory[start..start + length as usize].to_vec();
                return Ok(Step::Terminal(ExecResult::Returned));
            }
            Revert => {
                let offset = self.pop()?.low_u64();
                let length = self.pop()?.low_u64();
                if !self.expand_memory(offset + length) {
                    return Err(ExecResult::OutOfGas);
                }
                let start = offset as usize;
                self.return_data = self.memory[start..start + length as usize].to_vec();
                return Ok(Step::Terminal(ExecResult::Revert));
            }
        }
        Ok(Step::Advance)
    }
}

fn bool_word(value: bool) -> U256 {
    if value {
        U256::ONE
    } else {
        U256::ZERO
    }
}

fn address_word(addr: &Address) -> U256 {
    let mut bytes = [0u8; 32];
    bytes[12..32].copy_from_slice(&addr.0);
    U256::from_bytes(bytes)
}

/// Marks every JUMPDEST position reachable as an instruction boundary
/// (not inside a PUSH-N's immediate data), per §4.6's execution loop.
fn prescan_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        if let Some(op) = Opcode::decode(code[i]) {
            if op == Opcode::JumpDest {
                dests[i] = true;
            }
            if op.is_push() {
                i += op.push_size() as usize;
            }
        }
        i += 1;
    }
    dests
}
