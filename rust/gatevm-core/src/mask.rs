//! Single-byte XOR masking used for the embedded program and the secret payload.

/// Final whitening byte applied to the derived unlock key.
pub const PAYLOAD_XOR_KEY: u8 = 0xC7;
/// Value register 0 must hold (as an unsigned byte) for CALL to unlock.
pub const UNLOCK_REG0: u8 = 0x7A;
/// Selector operand CALL must carry to unlock.
pub const UNLOCK_SELECTOR: u8 = 0x42;

/// XOR every byte of `data` with `key`. Applying it twice is the identity.
pub fn xor_mask(data: &[u8], key: u8) -> Vec<u8> {
    data.iter().map(|b| b ^ key).collect()
}

pub fn xor_mask_in_place(data: &mut [u8], key: u8) {
    for b in data.iter_mut() {
        *b ^= key;
    }
}

/// Key used to unmask the secret payload:
/// `((reg0 ^ reg1 ^ 0xA5) + selector) ^ 0xC7`, all on unsigned bytes, wrapping.
pub fn derive_unlock_key(reg0: i8, reg1: i8, selector: u8) -> u8 {
    let mixed = (reg0 as u8) ^ (reg1 as u8) ^ 0xA5;
    mixed.wrapping_add(selector) ^ PAYLOAD_XOR_KEY
}

/// Key for the embedded fallback program.
pub const fn fallback_key() -> u8 {
    let a: u8 = 0x12;
    let b: u8 = 0xB5;
    (a ^ b).wrapping_add(0x11)
}

/// A payload masked for embedding, together with the key that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub masked: Vec<u8>,
    pub key: u8,
}

impl SealedPayload {
    /// Comma-separated `0xNN` list, ready to paste into a byte table.
    pub fn byte_list(&self) -> String {
        self.masked
            .iter()
            .map(|b| format!("0x{:02x}", b))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Mask `plain` so that a CALL with these register and selector values reveals it.
pub fn seal_payload(plain: &[u8], reg0: u8, reg1: u8, selector: u8) -> SealedPayload {
    let key = derive_unlock_key(reg0 as i8, reg1 as i8, selector);
    SealedPayload {
        masked: xor_mask(plain, key),
        key,
    }
}
