//! Stateless bit-field helpers.
//!
//! Indices and sizes are always checked against the word width: an index
//! outside the word is a caller bug and panics instead of being clamped.

/// Number of bits in a regular word.
pub const WORD_BITS: usize = u32::BITS as usize;
/// Number of bits in a wide word.
pub const WIDE_BITS: usize = u64::BITS as usize;

/// Bit-reversal of every byte value, indexed by the byte itself.
const REVERSED: [u8; 256] = build_reverse_table();

const fn build_reverse_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut value = i as u8;
        let mut reversed = 0u8;
        let mut bit = 0;
        while bit < 8 {
            reversed = (reversed << 1) | (value & 1);
            value >>= 1;
            bit += 1;
        }
        table[i] = reversed;
        i += 1;
    }
    table
}

#[inline]
fn check_index(index: usize, width: usize) {
    assert!(index < width, "bit index {index} outside a {width}-bit word");
}

#[inline]
fn check_size(size: usize, width: usize) {
    assert!(size <= width, "size {size} larger than a {width}-bit word");
}

/// Word with only bit `index` set.
///
/// # Panics
/// If `index` is not below [`WORD_BITS`].
#[inline]
pub fn mask(index: usize) -> u32 {
    check_index(index, WORD_BITS);
    1 << index
}

/// Whether bit `index` of `bits` is set.
#[inline]
pub fn test(bits: u32, index: usize) -> bool {
    bits & mask(index) != 0
}

/// `bits` with bit `index` replaced by `value`.
#[inline]
pub fn set(bits: u32, index: usize, value: bool) -> u32 {
    if value {
        bits | mask(index)
    } else {
        bits & !mask(index)
    }
}

/// The `size` least significant bits of `bits`.
///
/// # Panics
/// If `size` is larger than [`WORD_BITS`].
#[inline]
pub fn clip(size: usize, bits: u32) -> u32 {
    check_size(size, WORD_BITS);
    if size == WORD_BITS {
        bits
    } else {
        bits & ((1u32 << size) - 1)
    }
}

/// `size` bits of `bits` starting at bit `start`, moved down to bit 0.
///
/// # Panics
/// If the range `start..start + size` does not fit in a word.
#[inline]
pub fn extract(bits: u32, start: usize, size: usize) -> u32 {
    check_size(start + size, WORD_BITS);
    if size == 0 {
        return 0;
    }
    clip(size, bits >> start)
}

/// Rotates the `size` low bits of `bits` by `distance`.
///
/// A positive distance rotates towards the most significant bit, a negative
/// one towards bit 0. The distance is reduced modulo `size`.
///
/// # Panics
/// If `size` is zero or larger than a word, or if `bits` has bits set at or
/// above `size`.
pub fn rotate(size: usize, bits: u32, distance: i32) -> u32 {
    assert!(size > 0, "rotation size must be positive");
    check_size(size, WORD_BITS);
    assert!(
        clip(size, bits) == bits,
        "value 0x{bits:X} does not fit in {size} bits"
    );
    let distance = distance.rem_euclid(size as i32) as usize;
    if distance == 0 {
        return bits;
    }
    clip(size, (bits << distance) | (bits >> (size - distance)))
}

/// Word with only bit `index` set, wide form.
#[inline]
pub fn mask_wide(index: usize) -> u64 {
    check_index(index, WIDE_BITS);
    1 << index
}

#[inline]
pub fn test_wide(bits: u64, index: usize) -> bool {
    bits & mask_wide(index) != 0
}

#[inline]
pub fn set_wide(bits: u64, index: usize, value: bool) -> u64 {
    if value {
        bits | mask_wide(index)
    } else {
        bits & !mask_wide(index)
    }
}

#[inline]
pub fn clip_wide(size: usize, bits: u64) -> u64 {
    check_size(size, WIDE_BITS);
    if size == WIDE_BITS {
        bits
    } else {
        bits & ((1u64 << size) - 1)
    }
}

#[inline]
pub fn extract_wide(bits: u64, start: usize, size: usize) -> u64 {
    check_size(start + size, WIDE_BITS);
    if size == 0 {
        return 0;
    }
    clip_wide(size, bits >> start)
}

/// Sign-extends an 8-bit two's complement value.
#[inline]
pub fn sign_extend8(value: u8) -> i32 {
    value as i8 as i32
}

/// Reverses the bit order of a byte (bit 0 becomes bit 7 and so on).
#[inline]
pub fn reverse8(value: u8) -> u8 {
    REVERSED[value as usize]
}

#[inline]
pub fn complement8(value: u8) -> u8 {
    !value
}

#[inline]
pub fn msb8(value: u16) -> u8 {
    (value >> 8) as u8
}

#[inline]
pub fn lsb8(value: u16) -> u8 {
    value as u8
}

/// Combines two bytes into a 16-bit value.
#[inline]
pub fn make16(high: u8, low: u8) -> u16 {
    u16::from_be_bytes([high, low])
}

/// Writes the `out.len()` least significant bytes of `value` into `out`,
/// least significant byte first.
///
/// # Panics
/// If `out` is longer than eight bytes.
pub fn split_le(value: u64, out: &mut [u8]) {
    assert!(out.len() <= 8, "cannot split a u64 into {} bytes", out.len());
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = extract_wide(value, i * 8, 8) as u8;
    }
}

/// Inverse of [`split_le`].
///
/// # Panics
/// If `bytes` is longer than eight bytes.
pub fn join_le(bytes: &[u8]) -> u64 {
    assert!(bytes.len() <= 8, "cannot join {} bytes into a u64", bytes.len());
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &byte)| acc | (byte as u64) << (i * 8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_and_test() {
        assert_eq!(mask(0), 1);
        assert_eq!(mask(31), 0x8000_0000);
        assert!(test(0b1010, 1));
        assert!(!test(0b1010, 2));
        assert_eq!(set(0, 4, true), 0x10);
        assert_eq!(set(0xFF, 0, false), 0xFE);
    }

    #[test]
    #[should_panic]
    fn mask_rejects_out_of_range_index() {
        mask(32);
    }

    #[test]
    fn clip_and_extract() {
        assert_eq!(clip(0, 0xFFFF_FFFF), 0);
        assert_eq!(clip(4, 0xABCD), 0xD);
        assert_eq!(clip(32, 0xDEAD_BEEF), 0xDEAD_BEEF);
        assert_eq!(extract(0xABCD, 4, 8), 0xBC);
        assert_eq!(extract(0xABCD, 0, 0), 0);
        assert_eq!(extract_wide(0x1234_5678_9ABC_DEF0, 32, 16), 0x5678);
    }

    #[test]
    #[should_panic]
    fn extract_rejects_range_past_word() {
        extract(0, 30, 4);
    }

    #[test]
    fn rotate_both_directions() {
        assert_eq!(rotate(4, 0b0001, 1), 0b0010);
        assert_eq!(rotate(4, 0b1000, 1), 0b0001);
        assert_eq!(rotate(4, 0b0001, -1), 0b1000);
        assert_eq!(rotate(8, 0x81, 9), 0x03);
        assert_eq!(rotate(8, 0x81, 0), 0x81);
    }

    #[test]
    fn sign_extension_and_reverse() {
        assert_eq!(sign_extend8(0xFF), -1);
        assert_eq!(sign_extend8(0x7F), 127);
        assert_eq!(sign_extend8(0x80), -128);
        assert_eq!(reverse8(0b0000_0001), 0b1000_0000);
        assert_eq!(reverse8(0b1100_1010), 0b0101_0011);
        for value in 0..=255u8 {
            assert_eq!(reverse8(reverse8(value)), value);
        }
    }

    #[test]
    fn little_endian_bytes() {
        let mut out = [0u8; 4];
        split_le(0x1122_3344, &mut out);
        assert_eq!(out, [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(join_le(&out), 0x1122_3344);
        assert_eq!(make16(0xAB, 0xCD), 0xABCD);
        assert_eq!(msb8(0xABCD), 0xAB);
        assert_eq!(lsb8(0xABCD), 0xCD);
    }
}
