//! gatevm core: instruction set, decoder, XOR masking, and tooling shared by the VM and CLI.

pub mod asm;
pub mod decode;
pub mod disasm;
pub mod isa;
pub mod mask;

pub use decode::{decode, DecodeError, Decoded, Instruction, RegPair};
pub use isa::OpCode;
