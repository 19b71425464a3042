//! One-shot unlock latch guarding the secret payload.
//!
//! The latch starts `Locked` and moves to `Unlocked` on the first CALL where
//! register 0 holds `0x7A` and the selector is `0x42`. `Unlocked` is absorbing:
//! later CALLs are no-ops and the revealed bytes never change.

use gatevm_core::mask::{derive_unlock_key, xor_mask, UNLOCK_REG0, UNLOCK_SELECTOR};
use tracing::debug;

/// The secret, masked for the canonical unlock (`r0 = 0x7A`, `r1 = 0x00`, selector `0x42`).
pub static SECRET_PAYLOAD: &[u8] = &[
    0xa2, 0xab, 0xaf, 0x9d, 0x91, 0x8e, 0xd2, 0x92, 0xb9, 0xd2, 0xb9, 0x91, 0xd5, 0xd7, 0x94,
    0x82, 0xb9, 0x90, 0x8b, 0x9b,
];

/// Usable bytes in the reveal buffer; longer payloads are truncated.
pub const REVEAL_CAPACITY: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchState {
    #[default]
    Locked,
    Unlocked,
}

/// Result of a single unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockAttempt {
    AlreadyUnlocked,
    Reg0Mismatch,
    SelectorMismatch,
    Unlocked { key: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct Latch {
    state: LatchState,
    key: Option<u8>,
    revealed: Vec<u8>,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == LatchState::Unlocked
    }

    /// Key derived at unlock time.
    pub fn key(&self) -> Option<u8> {
        self.key
    }

    /// Unmasked payload; `None` while locked.
    pub fn revealed(&self) -> Option<&[u8]> {
        self.is_unlocked().then_some(self.revealed.as_slice())
    }

    /// Evaluate the CALL preconditions in order and unlock when all hold.
    pub fn try_unlock(&mut self, registers: &[i8; 4], selector: u8, masked: &[u8]) -> UnlockAttempt {
        if self.is_unlocked() {
            return UnlockAttempt::AlreadyUnlocked;
        }
        if registers[0] as u8 != UNLOCK_REG0 {
            debug!(reg0 = registers[0] as u8, "unlock rejected: register 0 mismatch");
            return UnlockAttempt::Reg0Mismatch;
        }
        if selector != UNLOCK_SELECTOR {
            debug!(selector, "unlock rejected: selector mismatch");
            return UnlockAttempt::SelectorMismatch;
        }

        let key = derive_unlock_key(registers[0], registers[1], selector);
        let n = masked.len().min(REVEAL_CAPACITY);
        self.revealed = xor_mask(&masked[..n], key);
        self.key = Some(key);
        self.state = LatchState::Unlocked;
        debug!(key, len = n, "latch unlocked");
        UnlockAttempt::Unlocked { key }
    }
}
