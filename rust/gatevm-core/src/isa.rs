//! Opcode table for the gatevm bytecode.
//! 8-bit opcodes followed by 0, 1 or 2 operand bytes.

use serde::{Deserialize, Serialize};

/// Opcodes understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    Nop = 0x00,       // no operands
    PushImm = 0x01,   // i8: push sign-extended immediate
    PopReg = 0x02,    // r: pop into r (low 2 bits)
    MovRR = 0x03,     // d|s: dst = src (nibbles, low 2 bits each)
    AddRR = 0x04,     // d|s: dst = dst + src (wrapping)
    SubRR = 0x05,     // d|s: dst = dst - src (wrapping)
    CmpRegImm = 0x06, // r, i8: Z = (r == imm)
    Jz = 0x07,        // i16le: if Z, jump relative to next instruction
    Jmp = 0x08,       // i16le: jump relative to next instruction
    Call = 0x09,      // u8: unlock check with selector
    Halt = 0xF9,      // no operands
}

impl OpCode {
    pub const ALL: [OpCode; 11] = [
        OpCode::Nop,
        OpCode::PushImm,
        OpCode::PopReg,
        OpCode::MovRR,
        OpCode::AddRR,
        OpCode::SubRR,
        OpCode::CmpRegImm,
        OpCode::Jz,
        OpCode::Jmp,
        OpCode::Call,
        OpCode::Halt,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u8 == byte)
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic, as printed by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::PushImm => "PUSH_IMM",
            OpCode::PopReg => "POP_REG",
            OpCode::MovRR => "MOV_RR",
            OpCode::AddRR => "ADD_RR",
            OpCode::SubRR => "SUB_RR",
            OpCode::CmpRegImm => "CMP_REG_IMM",
            OpCode::Jz => "JZ",
            OpCode::Jmp => "JMP",
            OpCode::Call => "CALL",
            OpCode::Halt => "HALT",
        }
    }

    /// Short name used in truncation diagnostics ("Truncated PUSH").
    pub fn short_name(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::PushImm => "PUSH",
            OpCode::PopReg => "POP",
            OpCode::MovRR => "MOV",
            OpCode::AddRR => "ADD",
            OpCode::SubRR => "SUB",
            OpCode::CmpRegImm => "CMP",
            OpCode::Jz => "JZ",
            OpCode::Jmp => "JMP",
            OpCode::Call => "CALL",
            OpCode::Halt => "HALT",
        }
    }

    /// Number of operand bytes following the opcode byte.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Nop | OpCode::Halt => 0,
            OpCode::PushImm
            | OpCode::PopReg
            | OpCode::MovRR
            | OpCode::AddRR
            | OpCode::SubRR
            | OpCode::Call => 1,
            OpCode::CmpRegImm | OpCode::Jz | OpCode::Jmp => 2,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::from_byte(byte).ok_or(byte)
    }
}
