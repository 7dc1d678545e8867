//! Bit-field helpers shared by the decoder and the executor
//!
//! Bit positions count from the least significant bit (bit 0).

/// Returns the `count`-bit unsigned field of `word` starting at bit `start`.
///
/// Requires `1 <= count <= 32` and `start + count <= 64`.
#[inline]
pub fn extract_bits(word: u64, start: u32, count: u32) -> u32 {
    debug_assert!((1..=32).contains(&count), "field width {count} out of range");
    debug_assert!(start + count <= 64, "field {start}+{count} exceeds 64 bits");

    let mask = u32::MAX >> (32 - count);
    ((word >> start) as u32) & mask
}

/// Sign-extends `word` to 64 bits, treating bit `sign_bit` as the sign.
///
/// The sign bit is moved up to bit 63 and an arithmetic shift brings it back,
/// replicating it into every higher bit on the way.
#[inline]
pub fn sign_extend(word: u64, sign_bit: u32) -> i64 {
    debug_assert!(sign_bit < 64, "sign bit {sign_bit} out of range");

    let distance = 63 - sign_bit;
    ((word << distance) as i64) >> distance
}

/// Returns true if bit `index` of `word` is set.
#[inline]
pub fn test_bit(word: u64, index: u32) -> bool {
    debug_assert!(index < 64, "bit index {index} out of range");

    (word >> index) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_opcode_and_registers() {
        // add x3, x1, x2
        let word = 0x002081B3u64;
        assert_eq!(extract_bits(word, 0, 7), 0b011_0011);
        assert_eq!(extract_bits(word, 7, 5), 3);
        assert_eq!(extract_bits(word, 15, 5), 1);
        assert_eq!(extract_bits(word, 20, 5), 2);
    }

    #[test]
    fn test_extract_full_width() {
        assert_eq!(extract_bits(u64::MAX, 0, 32), u32::MAX);
        assert_eq!(extract_bits(0xDEAD_BEEF_0000_0000, 32, 32), 0xDEAD_BEEF);
        assert_eq!(extract_bits(1 << 63, 63, 1), 1);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b1000, 3), -8);
        assert_eq!(sign_extend(0b0111, 3), 7);

        // 12-bit immediates
        assert_eq!(sign_extend(0x800, 11), -2048);
        assert_eq!(sign_extend(0xFFF, 11), -1);
        assert_eq!(sign_extend(0x7FF, 11), 2047);

        // Bits above the sign bit are discarded
        assert_eq!(sign_extend(0xFFFF_F123, 11), 0x123);

        assert_eq!(sign_extend(0x8000_0000, 31), i32::MIN as i64);
        assert_eq!(sign_extend(u64::MAX, 63), -1);
    }

    #[test]
    fn test_test_bit() {
        assert!(test_bit(0b100, 2));
        assert!(!test_bit(0b100, 1));
        assert!(test_bit(1 << 63, 63));
    }

    proptest! {
        #[test]
        fn extract_bits_matches_bitwise_reference(
            word in any::<u64>(),
            (start, count) in (1u32..=32).prop_flat_map(|count| (0..=64 - count, Just(count))),
        ) {
            let mut expected = 0u32;
            for i in 0..count {
                if (word >> (start + i)) & 1 == 1 {
                    expected |= 1 << i;
                }
            }
            prop_assert_eq!(extract_bits(word, start, count), expected);
        }

        #[test]
        fn sign_extend_is_negative_iff_sign_bit_set(word in any::<u64>(), sign_bit in 0u32..64) {
            let extended = sign_extend(word, sign_bit);
            prop_assert_eq!(extended < 0, test_bit(word, sign_bit));

            // The low bits up to and including the sign bit survive unchanged
            let low_mask = u64::MAX >> (63 - sign_bit);
            prop_assert_eq!(extended as u64 & low_mask, word & low_mask);
        }
    }
}
