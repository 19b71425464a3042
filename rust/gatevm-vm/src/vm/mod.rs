//! Register/stack VM dispatch loop.

mod ops;

pub use ops::{OperandStack, STACK_SIZE};

use crate::latch::{Latch, UnlockAttempt, SECRET_PAYLOAD};
use gatevm_core::decode::{decode, DecodeError, Instruction};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Type alias for debug callback to simplify type signatures
pub type DebugCallback = Option<Box<dyn FnMut(&DebugEvent)>>;

/// Debug events emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// About to execute the instruction at `ip`
    Step { ip: usize, instruction: String },
    /// The latch opened with `key`
    Unlock { key: u8 },
    /// HALT reached
    Halt { unlocked: bool },
}

/// Errors that stop the interpreter. `Display` is the one-line diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("JUMP OOB")]
    JumpOutOfBounds { target: i64, len: usize },
    #[error("Step limit exceeded")]
    StepLimitExceeded(u64),
}

impl VmError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, VmError::Decode(DecodeError::Truncated(_)))
    }

    pub fn is_bad_opcode(&self) -> bool {
        matches!(self, VmError::Decode(DecodeError::UnknownOpcode(_)))
    }

    pub fn is_stack_overflow(&self) -> bool {
        matches!(self, VmError::StackOverflow)
    }

    pub fn is_stack_underflow(&self) -> bool {
        matches!(self, VmError::StackUnderflow)
    }

    pub fn is_jump_oob(&self) -> bool {
        matches!(self, VmError::JumpOutOfBounds { .. })
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// HALT with the latch open; carries the unmasked payload.
    Revealed(Vec<u8>),
    /// HALT with the latch still closed.
    Locked,
    /// Ran off the end of the program without HALT.
    Exhausted,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        0
    }

    /// The report line as raw bytes, without the trailing newline.
    ///
    /// The revealed payload is written verbatim up to its first NUL byte, so
    /// non-UTF-8 payloads survive. `Display` is lossy and only meant for logs.
    pub fn report_bytes(&self) -> Vec<u8> {
        match self {
            Outcome::Revealed(payload) => {
                let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
                let mut line = b"SUCCESS: FLAG{".to_vec();
                line.extend_from_slice(&payload[..end]);
                line.push(b'}');
                line
            }
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Revealed(payload) => {
                write!(f, "SUCCESS: FLAG{{{}}}", String::from_utf8_lossy(payload))
            }
            Outcome::Locked => write!(f, "FAIL"),
            Outcome::Exhausted => write!(f, "EOF without HALT"),
        }
    }
}

/// Result of a single [`Machine::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished(Outcome),
}

/// The gatevm interpreter state.
pub struct Machine {
    pub(crate) ip: usize,
    pub(crate) registers: [i8; 4],
    pub(crate) stack: OperandStack,
    pub(crate) zero_flag: bool,
    latch: Latch,
    secret: Vec<u8>,
    step_limit: Option<u64>,
    steps: u64,
    /// Optional debug callback for step tracing
    pub debug_callback: DebugCallback,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            ip: 0,
            registers: [0; 4],
            stack: OperandStack::new(),
            zero_flag: false,
            latch: Latch::new(),
            secret: SECRET_PAYLOAD.to_vec(),
            step_limit: None,
            steps: 0,
            debug_callback: None,
        }
    }

    /// Stop with [`VmError::StepLimitExceeded`] after `limit` instructions.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Replace the masked secret revealed on unlock.
    pub fn with_secret(mut self, masked: impl Into<Vec<u8>>) -> Self {
        self.secret = masked.into();
        self
    }

    pub fn set_debug_callback(&mut self, callback: impl FnMut(&DebugEvent) + 'static) {
        self.debug_callback = Some(Box::new(callback));
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn registers(&self) -> [i8; 4] {
        self.registers
    }

    pub fn zero_flag(&self) -> bool {
        self.zero_flag
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn latch(&self) -> &Latch {
        &self.latch
    }

    fn emit_debug_event(&mut self, event: DebugEvent) {
        if let Some(cb) = self.debug_callback.as_mut() {
            cb(&event);
        }
    }

    /// Run until HALT, an error, or the end of `code`.
    pub fn execute(&mut self, code: &[u8]) -> Result<Outcome, VmError> {
        loop {
            if let Step::Finished(outcome) = self.step(code)? {
                return Ok(outcome);
            }
        }
    }

    /// Fetch, decode and execute one instruction.
    pub fn step(&mut self, code: &[u8]) -> Result<Step, VmError> {
        if self.ip >= code.len() {
            return Ok(Step::Finished(Outcome::Exhausted));
        }
        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(VmError::StepLimitExceeded(limit));
            }
        }

        let Some(decoded) = decode(code, self.ip)? else {
            return Ok(Step::Finished(Outcome::Exhausted));
        };
        self.steps += 1;
        trace!(ip = self.ip, instr = %decoded.instr, "step");
        if self.debug_callback.is_some() {
            self.emit_debug_event(DebugEvent::Step {
                ip: self.ip,
                instruction: decoded.instr.to_string(),
            });
        }

        // Advance past opcode and operands; jumps are relative to this point.
        self.ip += decoded.width;

        match decoded.instr {
            Instruction::Nop => {}
            Instruction::PushImm(v) => self.stack.push(v as i16)?,
            Instruction::PopReg(r) => {
                let v = self.stack.pop()?;
                self.registers[r as usize] = v as i8;
            }
            Instruction::Mov(p) => self.registers[p.dst as usize] = self.registers[p.src as usize],
            Instruction::Add(p) => self.add_rr(p),
            Instruction::Sub(p) => self.sub_rr(p),
            Instruction::CmpRegImm { reg, imm } => {
                self.zero_flag = self.registers[reg as usize] == imm;
            }
            Instruction::Jz(off) => {
                if self.zero_flag {
                    self.jump(off, code.len())?;
                }
            }
            Instruction::Jmp(off) => self.jump(off, code.len())?,
            Instruction::Call(selector) => {
                let attempt = self.latch.try_unlock(&self.registers, selector, &self.secret);
                if let UnlockAttempt::Unlocked { key } = attempt {
                    self.emit_debug_event(DebugEvent::Unlock { key });
                }
            }
            Instruction::Halt => {
                let unlocked = self.latch.is_unlocked();
                debug!(unlocked, steps = self.steps, "halt");
                self.emit_debug_event(DebugEvent::Halt { unlocked });
                let outcome = match self.latch.revealed() {
                    Some(payload) => Outcome::Revealed(payload.to_vec()),
                    None => Outcome::Locked,
                };
                return Ok(Step::Finished(outcome));
            }
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatevm_core::asm::Assembler;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(code: &[u8]) -> (Machine, Result<Outcome, VmError>) {
        let mut vm = Machine::new();
        let result = vm.execute(code);
        (vm, result)
    }

    #[test]
    fn empty_program_is_exhausted() {
        let (vm, result) = run(&[]);
        assert_eq!(result, Ok(Outcome::Exhausted));
        assert_eq!(vm.ip(), 0);
    }

    #[test]
    fn halt_alone_fails() {
        let (vm, result) = run(&[0xF9]);
        assert_eq!(result, Ok(Outcome::Locked));
        assert!(!vm.latch().is_unlocked());
    }

    #[test]
    fn pop_into_folded_register() {
        let code = Assembler::new().push_imm(-5).pop_reg(6).halt().finish();
        let (vm, _) = run(&code);
        assert_eq!(vm.registers(), [0, 0, -5, 0]);
        assert_eq!(vm.stack_depth(), 0);
    }

    #[test]
    fn cmp_sets_and_clears_zero_flag() {
        let code = Assembler::new().push_imm(9).pop_reg(3).cmp(3, 9).finish();
        let (vm, _) = run(&code);
        assert!(vm.zero_flag());

        let code = Assembler::new().cmp(0, 1).finish();
        let (vm, _) = run(&code);
        assert!(!vm.zero_flag());
    }

    #[test]
    fn jz_skips_when_flag_set() {
        // cmp r0,0 -> Z; jz +2 skips "push 1"; halt
        let code = Assembler::new().cmp(0, 0).jz(2).push_imm(1).halt().finish();
        let (vm, result) = run(&code);
        assert_eq!(result, Ok(Outcome::Locked));
        assert_eq!(vm.stack_depth(), 0);
    }

    #[test]
    fn jz_falls_through_when_flag_clear() {
        let code = Assembler::new().cmp(0, 1).jz(2).push_imm(1).halt().finish();
        let (vm, _) = run(&code);
        assert_eq!(vm.stack_depth(), 1);
    }

    #[test]
    fn jz_with_clear_flag_ignores_bad_target() {
        let code = Assembler::new().cmp(0, 1).jz(-100).halt().finish();
        assert_eq!(run(&code).1, Ok(Outcome::Locked));
    }

    #[test]
    fn jump_to_end_exhausts() {
        let code = Assembler::new().jmp(1).halt().finish();
        let (vm, result) = run(&code);
        assert_eq!(result, Ok(Outcome::Exhausted));
        assert_eq!(vm.ip(), code.len());
    }

    #[test]
    fn jump_past_end_is_oob() {
        let code = Assembler::new().jmp(2).halt().finish();
        let err = run(&code).1.unwrap_err();
        assert_eq!(err, VmError::JumpOutOfBounds { target: 5, len: 4 });
        assert_eq!(err.to_string(), "JUMP OOB");
    }

    #[test]
    fn call_never_changes_control_flow() {
        let code = Assembler::new().call(0x42).nop().finish();
        let (vm, result) = run(&code);
        assert_eq!(result, Ok(Outcome::Exhausted));
        assert_eq!(vm.ip(), 3);
    }

    #[test]
    fn step_limit_stops_infinite_loop() {
        let code = Assembler::new().jmp(-3).finish();
        let mut vm = Machine::new().with_step_limit(100);
        let err = vm.execute(&code).unwrap_err();
        assert_eq!(err, VmError::StepLimitExceeded(100));
        assert_eq!(vm.steps(), 100);
    }

    #[test]
    fn debug_callback_sees_steps_unlock_and_halt() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let code = Assembler::new().push_imm(0x7A).pop_reg(0).call(0x42).halt().finish();
        let mut vm = Machine::new();
        vm.set_debug_callback(move |e| sink.borrow_mut().push(e.clone()));
        vm.execute(&code).expect("runs");

        let events = events.borrow();
        assert_eq!(
            events[0],
            DebugEvent::Step {
                ip: 0,
                instruction: "PUSH_IMM 122".to_string()
            }
        );
        assert!(events.contains(&DebugEvent::Unlock { key: 0xE6 }));
        assert_eq!(events.last(), Some(&DebugEvent::Halt { unlocked: true }));
    }

    #[test]
    fn custom_secret_is_revealed() {
        let key = gatevm_core::mask::derive_unlock_key(0x7A, 0, 0x42);
        let masked = gatevm_core::mask::xor_mask(b"hi", key);
        let code = Assembler::new().push_imm(0x7A).pop_reg(0).call(0x42).halt().finish();
        let mut vm = Machine::new().with_secret(masked);
        assert_eq!(vm.execute(&code), Ok(Outcome::Revealed(b"hi".to_vec())));
    }

    #[test]
    fn outcome_lines() {
        assert_eq!(Outcome::Revealed(b"abc".to_vec()).to_string(), "SUCCESS: FLAG{abc}");
        assert_eq!(Outcome::Locked.to_string(), "FAIL");
        assert_eq!(Outcome::Exhausted.to_string(), "EOF without HALT");
    }

    #[test]
    fn report_bytes_keep_high_bytes_and_stop_at_nul() {
        let outcome = Outcome::Revealed(vec![0x41, 0xC4, 0xFF, 0x00, 0x42]);
        assert_eq!(outcome.report_bytes(), b"SUCCESS: FLAG{A\xC4\xFF}".to_vec());
        assert_eq!(Outcome::Locked.report_bytes(), b"FAIL".to_vec());
    }
}
