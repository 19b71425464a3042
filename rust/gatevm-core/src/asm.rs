//! Programmatic bytecode builder.

use crate::decode::RegPair;
use crate::isa::OpCode;

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    code: Vec<u8>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset, i.e. where the next instruction will be placed.
    pub fn here(&self) -> usize {
        self.code.len()
    }

    pub fn nop(&mut self) -> &mut Self {
        self.op(OpCode::Nop)
    }

    pub fn push_imm(&mut self, value: i8) -> &mut Self {
        self.op(OpCode::PushImm).byte(value as u8)
    }

    pub fn pop_reg(&mut self, reg: u8) -> &mut Self {
        self.op(OpCode::PopReg).byte(reg)
    }

    pub fn mov(&mut self, dst: u8, src: u8) -> &mut Self {
        self.op(OpCode::MovRR).byte(RegPair { dst, src }.to_byte())
    }

    pub fn add(&mut self, dst: u8, src: u8) -> &mut Self {
        self.op(OpCode::AddRR).byte(RegPair { dst, src }.to_byte())
    }

    pub fn sub(&mut self, dst: u8, src: u8) -> &mut Self {
        self.op(OpCode::SubRR).byte(RegPair { dst, src }.to_byte())
    }

    pub fn cmp(&mut self, reg: u8, imm: i8) -> &mut Self {
        self.op(OpCode::CmpRegImm).byte(reg).byte(imm as u8)
    }

    /// Conditional jump; `offset` is relative to the end of this instruction.
    pub fn jz(&mut self, offset: i16) -> &mut Self {
        self.op(OpCode::Jz).word(offset)
    }

    pub fn jmp(&mut self, offset: i16) -> &mut Self {
        self.op(OpCode::Jmp).word(offset)
    }

    pub fn call(&mut self, selector: u8) -> &mut Self {
        self.op(OpCode::Call).byte(selector)
    }

    pub fn halt(&mut self) -> &mut Self {
        self.op(OpCode::Halt)
    }

    /// Append bytes verbatim (for malformed or truncated programs).
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.code.clone()
    }

    fn op(&mut self, op: OpCode) -> &mut Self {
        self.byte(op.byte())
    }

    fn byte(&mut self, b: u8) -> &mut Self {
        self.code.push(b);
        self
    }

    fn word(&mut self, w: i16) -> &mut Self {
        self.code.extend_from_slice(&w.to_le_bytes());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_unlock_program() {
        let code = Assembler::new()
            .push_imm(0x7A)
            .pop_reg(0)
            .push_imm(0)
            .pop_reg(1)
            .call(0x42)
            .halt()
            .finish();
        assert_eq!(
            code,
            vec![0x01, 0x7A, 0x02, 0x00, 0x01, 0x00, 0x02, 0x01, 0x09, 0x42, 0xF9]
        );
    }

    #[test]
    fn packs_register_pairs_and_words() {
        let code = Assembler::new().mov(2, 3).jmp(-2).cmp(1, -1).finish();
        assert_eq!(code, vec![0x03, 0x23, 0x08, 0xFE, 0xFF, 0x06, 0x01, 0xFF]);
    }

    #[test]
    fn here_tracks_offset() {
        let mut asm = Assembler::new();
        asm.nop().push_imm(1);
        assert_eq!(asm.here(), 3);
    }
}
