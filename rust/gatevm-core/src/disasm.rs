//! Linear-sweep disassembler.
//!
//! Unknown bytes are listed as `DB 0xNN` and the sweep resumes at the next
//! byte. A truncated trailing instruction is listed as `<MNEMONIC> <truncated>`
//! and ends the sweep.

use crate::decode::{decode, DecodeError, Instruction};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisasmLine {
    pub offset: usize,
    pub mnemonic: String,
    pub operands: Vec<String>,
    pub width: usize,
    /// Absolute target for jumps, when it can be computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
}

impl DisasmLine {
    pub fn render(&self) -> String {
        let mut text = format!("{:04x}: {}", self.offset, self.mnemonic);
        if !self.operands.is_empty() {
            text.push(' ');
            text.push_str(&self.operands.join(", "));
        }
        if let Some(target) = self.target {
            if target < 0 {
                text.push_str(&format!(" -> -{:04x}", -target));
            } else {
                text.push_str(&format!(" -> {:04x}", target));
            }
        }
        text
    }
}

pub fn disassemble(code: &[u8]) -> Vec<DisasmLine> {
    let mut lines = Vec::new();
    let mut ip = 0;
    loop {
        match decode(code, ip) {
            Ok(None) => break,
            Ok(Some(d)) => {
                let next = (ip + d.width) as i64;
                let target = match d.instr {
                    Instruction::Jz(off) | Instruction::Jmp(off) => Some(next + off as i64),
                    _ => None,
                };
                lines.push(DisasmLine {
                    offset: ip,
                    mnemonic: d.instr.opcode().mnemonic().to_string(),
                    operands: d.instr.operands(),
                    width: d.width,
                    target,
                });
                ip += d.width;
            }
            Err(DecodeError::UnknownOpcode(byte)) => {
                lines.push(DisasmLine {
                    offset: ip,
                    mnemonic: "DB".to_string(),
                    operands: vec![format!("0x{:02X}", byte)],
                    width: 1,
                    target: None,
                });
                ip += 1;
            }
            Err(DecodeError::Truncated(op)) => {
                lines.push(DisasmLine {
                    offset: ip,
                    mnemonic: op.mnemonic().to_string(),
                    operands: vec!["<truncated>".to_string()],
                    width: code.len() - ip,
                    target: None,
                });
                break;
            }
        }
    }
    lines
}

/// Text listing, one instruction per line.
pub fn render_listing(code: &[u8]) -> String {
    disassemble(code)
        .iter()
        .map(DisasmLine::render)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn listing_json(code: &[u8]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&disassemble(code))
}
