//! Instruction decoding.
//!
//! [`decode`] reads one instruction at an offset and reports how many bytes it
//! occupies. It never reads past the end of the buffer: a missing operand byte
//! is a [`DecodeError::Truncated`] naming the opcode.

use crate::isa::OpCode;
use std::fmt;
use thiserror::Error;

/// Fold a register selector into `0..4`. Out-of-range encodings are masked,
/// never rejected.
pub fn reg_index(byte: u8) -> u8 {
    byte & 0x03
}

/// Destination/source pair packed into one byte: high nibble = dst, low nibble = src.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegPair {
    pub dst: u8,
    pub src: u8,
}

impl RegPair {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            dst: reg_index(byte >> 4),
            src: reg_index(byte & 0x0F),
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.dst << 4) | self.src
    }
}

/// A fully decoded instruction. Register fields are already folded to `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    PushImm(i8),
    PopReg(u8),
    Mov(RegPair),
    Add(RegPair),
    Sub(RegPair),
    CmpRegImm { reg: u8, imm: i8 },
    Jz(i16),
    Jmp(i16),
    Call(u8),
    Halt,
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Nop => OpCode::Nop,
            Instruction::PushImm(_) => OpCode::PushImm,
            Instruction::PopReg(_) => OpCode::PopReg,
            Instruction::Mov(_) => OpCode::MovRR,
            Instruction::Add(_) => OpCode::AddRR,
            Instruction::Sub(_) => OpCode::SubRR,
            Instruction::CmpRegImm { .. } => OpCode::CmpRegImm,
            Instruction::Jz(_) => OpCode::Jz,
            Instruction::Jmp(_) => OpCode::Jmp,
            Instruction::Call(_) => OpCode::Call,
            Instruction::Halt => OpCode::Halt,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn width(&self) -> usize {
        1 + self.opcode().operand_width()
    }

    /// Operands rendered for listings, in encoding order.
    pub fn operands(&self) -> Vec<String> {
        match *self {
            Instruction::Nop | Instruction::Halt => vec![],
            Instruction::PushImm(v) => vec![v.to_string()],
            Instruction::PopReg(r) => vec![format!("r{}", r)],
            Instruction::Mov(p) | Instruction::Add(p) | Instruction::Sub(p) => {
                vec![format!("r{}", p.dst), format!("r{}", p.src)]
            }
            Instruction::CmpRegImm { reg, imm } => vec![format!("r{}", reg), imm.to_string()],
            Instruction::Jz(off) | Instruction::Jmp(off) => vec![format!("{:+}", off)],
            Instruction::Call(sel) => vec![format!("0x{:02X}", sel)],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops = self.operands();
        if ops.is_empty() {
            write!(f, "{}", self.opcode().mnemonic())
        } else {
            write!(f, "{} {}", self.opcode().mnemonic(), ops.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Truncated {}", .0.short_name())]
    Truncated(OpCode),
    #[error("Bad opcode")]
    UnknownOpcode(u8),
}

/// An instruction plus the number of bytes it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub instr: Instruction,
    pub width: usize,
}

/// Decode the instruction starting at `ip`.
///
/// Returns `Ok(None)` when `ip` is at or past the end of `code`.
pub fn decode(code: &[u8], ip: usize) -> Result<Option<Decoded>, DecodeError> {
    let Some(&byte) = code.get(ip) else {
        return Ok(None);
    };
    let op = OpCode::try_from(byte).map_err(DecodeError::UnknownOpcode)?;
    let operands = code
        .get(ip + 1..ip + 1 + op.operand_width())
        .ok_or(DecodeError::Truncated(op))?;

    let instr = match op {
        OpCode::Nop => Instruction::Nop,
        OpCode::PushImm => Instruction::PushImm(operands[0] as i8),
        OpCode::PopReg => Instruction::PopReg(reg_index(operands[0])),
        OpCode::MovRR => Instruction::Mov(RegPair::from_byte(operands[0])),
        OpCode::AddRR => Instruction::Add(RegPair::from_byte(operands[0])),
        OpCode::SubRR => Instruction::Sub(RegPair::from_byte(operands[0])),
        OpCode::CmpRegImm => Instruction::CmpRegImm {
            reg: reg_index(operands[0]),
            imm: operands[1] as i8,
        },
        OpCode::Jz => Instruction::Jz(i16::from_le_bytes([operands[0], operands[1]])),
        OpCode::Jmp => Instruction::Jmp(i16::from_le_bytes([operands[0], operands[1]])),
        OpCode::Call => Instruction::Call(operands[0]),
        OpCode::Halt => Instruction::Halt,
    };

    Ok(Some(Decoded {
        instr,
        width: 1 + op.operand_width(),
    }))
}
