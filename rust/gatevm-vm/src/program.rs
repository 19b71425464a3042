//! Program acquisition.
//!
//! An external byte stream takes priority. When it is missing, unreadable or
//! empty, the embedded fallback is unmasked with [`fallback_key`] and used
//! instead.

use gatevm_core::mask::{fallback_key, xor_mask};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest program the loader will hand to the interpreter.
pub const MAX_CODE: usize = 4096;

/// Embedded program, masked with [`fallback_key`].
///
/// Unmasked: `NOP; PUSH_IMM 0x7A; POP_REG 0; PUSH_IMM 0; POP_REG 1; CALL 0x41; HALT`.
pub static PACKED_FALLBACK: &[u8] = &[
    0xb8, 0xb9, 0xc2, 0xba, 0xb8, 0xb9, 0xb8, 0xba, 0xb9, 0xb1, 0xf9, 0x41,
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Packed program too large")]
    PackedTooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSource {
    External,
    Embedded,
}

/// Immutable bytecode handed to the interpreter. Never longer than [`MAX_CODE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
    source: ProgramSource,
}

impl Program {
    /// Wrap external bytes, keeping at most [`MAX_CODE`] of them.
    pub fn external(mut bytes: Vec<u8>) -> Self {
        bytes.truncate(MAX_CODE);
        Self {
            bytes,
            source: ProgramSource::External,
        }
    }

    /// Unmask an embedded program.
    pub fn unpack(packed: &[u8]) -> Result<Self, LoadError> {
        if packed.len() > MAX_CODE {
            return Err(LoadError::PackedTooLarge(packed.len()));
        }
        Ok(Self {
            bytes: xor_mask(packed, fallback_key()),
            source: ProgramSource::Embedded,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn source(&self) -> ProgramSource {
        self.source
    }
}

/// Pick the external bytes when non-empty, else unpack `packed`.
pub fn acquire(external: Option<Vec<u8>>, packed: &[u8]) -> Result<Program, LoadError> {
    match external {
        Some(bytes) if !bytes.is_empty() => Ok(Program::external(bytes)),
        _ => Program::unpack(packed),
    }
}

/// Read up to [`MAX_CODE`] bytes from `path`.
pub fn read_capped(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.take(MAX_CODE as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Load from an optional file, falling back to `packed` (normally [`PACKED_FALLBACK`]).
pub fn load(path: Option<&Path>, packed: &[u8]) -> Result<Program, LoadError> {
    let external = path.and_then(|p| match read_capped(p) {
        Ok(bytes) if bytes.is_empty() => {
            warn!("Provided file is empty; falling back to embedded program.");
            None
        }
        Ok(bytes) => {
            debug!(path = %p.display(), len = bytes.len(), "loaded program");
            Some(bytes)
        }
        Err(e) => {
            warn!("Could not open '{}' ({}); falling back to embedded program.", p.display(), e);
            None
        }
    });
    acquire(external, packed)
}
