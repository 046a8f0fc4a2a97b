//! IEEE CRC32: initial value 0xFFFFFFFF, final XOR 0xFFFFFFFF, LSB-first.

use once_cell::sync::Lazy;

const POLY: u32 = 0xEDB88320;

static TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
});

/// Computes the raw IEEE CRC32 checksum of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let table = &*TABLE;
    let mut crc = 0xFFFFFFFFu32;
    for &b in bytes {
        let idx = ((crc ^ b as u32) & 0xFF) as usize;
        crc = table[idx] ^ (crc >> 8);
    }
    crc ^ 0xFFFFFFFF
}

/// Formats a CRC32 as eight lowercase hex nybbles.
///
/// The reference implementation describes this as "little-endian" because it
/// walks the accumulator byte-by-byte from the least-significant end when
/// building the string on a big-endian-agnostic C target; the observable
/// result is the same as formatting the `u32` value directly as `%08x`.
pub fn crc32_hex(bytes: &[u8]) -> String {
    format!("{:08x}", crc32(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(crc32_hex(b""), "00000000");
    }

    #[test]
    fn abc_matches_known_vector() {
        assert_eq!(crc32_hex(b"ABC"), "a3830348");
    }

    #[test]
    fn deterministic() {
        let a = crc32(b"the quick brown fox");
        let b = crc32(b"the quick brown fox");
        assert_eq!(a, b);
    }

}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn deterministic_for_arbitrary_input(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(crc32(&bytes), crc32(&bytes));
        }

        #[test]
        fn hex_form_is_always_eight_lowercase_nybbles(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let hex = crc32_hex(&bytes);
            prop_assert_eq!(hex.len(), 8);
            prop_assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
