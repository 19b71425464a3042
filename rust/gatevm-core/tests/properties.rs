//! Property tests for masking and decoding.

use gatevm_core::decode::{decode, reg_index, RegPair};
use gatevm_core::disasm::disassemble;
use gatevm_core::mask::{derive_unlock_key, seal_payload, xor_mask};
use proptest::prelude::*;

proptest! {
    #[test]
    fn mask_roundtrip_for_every_key(key in any::<u8>(), data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let masked = xor_mask(&data, key);
        prop_assert_eq!(masked.len(), data.len());
        prop_assert_eq!(xor_mask(&masked, key), data);
    }

    #[test]
    fn sealed_payload_opens_with_derived_key(
        plain in proptest::collection::vec(any::<u8>(), 0..64),
        r0 in any::<u8>(),
        r1 in any::<u8>(),
        sel in any::<u8>(),
    ) {
        let sealed = seal_payload(&plain, r0, r1, sel);
        let key = derive_unlock_key(r0 as i8, r1 as i8, sel);
        prop_assert_eq!(sealed.key, key);
        prop_assert_eq!(xor_mask(&sealed.masked, key), plain);
    }

    #[test]
    fn register_fields_always_fold(byte in any::<u8>()) {
        let pair = RegPair::from_byte(byte);
        prop_assert!(pair.dst < 4 && pair.src < 4);
        prop_assert!(reg_index(byte) < 4);
    }

    #[test]
    fn decode_never_reads_past_end(code in proptest::collection::vec(any::<u8>(), 0..32), ip in 0usize..40) {
        if let Ok(Some(d)) = decode(&code, ip) {
            prop_assert!(ip + d.width <= code.len());
            prop_assert_eq!(d.width, d.instr.width());
        }
    }

    #[test]
    fn disassembly_covers_every_byte(code in proptest::collection::vec(any::<u8>(), 0..64)) {
        let lines = disassemble(&code);
        let covered: usize = lines.iter().map(|l| l.width).sum();
        prop_assert_eq!(covered, code.len());
    }
}
