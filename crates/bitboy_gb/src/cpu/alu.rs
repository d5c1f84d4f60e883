//! Stateless arithmetic/logic unit.
//!
//! Every operation returns the computed value together with the Z, N, H and
//! C outcomes it produces. Whether an instruction actually applies each of
//! those flags is up to the CPU.

use bitflags::bitflags;

bitflags! {
    /// Flag bits as laid out in the upper nibble of the F register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const Z = 1 << 7;
        const N = 1 << 6;
        const H = 1 << 5;
        const C = 1 << 4;
    }
}

impl Flags {
    pub fn new(z: bool, n: bool, h: bool, c: bool) -> Self {
        let mut flags = Flags::empty();
        flags.set(Flags::Z, z);
        flags.set(Flags::N, n);
        flags.set(Flags::H, h);
        flags.set(Flags::C, c);
        flags
    }
}

/// Value produced by an ALU operation and the flags it raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluResult<T = u8> {
    pub value: T,
    pub flags: Flags,
}

impl<T> AluResult<T> {
    #[inline]
    fn new(value: T, flags: Flags) -> Self {
        Self { value, flags }
    }
}

/// Direction of a rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotDir {
    Left,
    Right,
}

/// `l + r + carry_in`.
pub fn add(l: u8, r: u8, carry_in: bool) -> AluResult {
    let c = carry_in as u16;
    let half = (l & 0x0F) as u16 + (r & 0x0F) as u16 + c;
    let full = l as u16 + r as u16 + c;
    let value = full as u8;
    AluResult::new(value, Flags::new(value == 0, false, half > 0x0F, full > 0xFF))
}

/// `l - r - borrow_in`.
pub fn sub(l: u8, r: u8, borrow_in: bool) -> AluResult {
    let b = borrow_in as i16;
    let half = (l & 0x0F) as i16 - (r & 0x0F) as i16 - b;
    let full = l as i16 - r as i16 - b;
    let value = full as u8;
    AluResult::new(value, Flags::new(value == 0, true, half < 0, full < 0))
}

/// Adds the two bytes separately, carrying from the low into the high one.
/// Returns the 16-bit sum with the flags of the low and of the high byte.
fn add16(l: u16, r: u16) -> (u16, Flags, Flags) {
    let low = add(l as u8, r as u8, false);
    let high = add((l >> 8) as u8, (r >> 8) as u8, low.flags.contains(Flags::C));
    let value = u16::from_be_bytes([high.value, low.value]);
    (value, low.flags, high.flags)
}

/// 16-bit addition whose H and C come from the low byte; Z and N clear.
pub fn add16_low(l: u16, r: u16) -> AluResult<u16> {
    let (value, low, _) = add16(l, r);
    AluResult::new(value, low & (Flags::H | Flags::C))
}

/// 16-bit addition whose H and C come from the high byte; Z and N clear.
pub fn add16_high(l: u16, r: u16) -> AluResult<u16> {
    let (value, _, high) = add16(l, r);
    AluResult::new(value, high & (Flags::H | Flags::C))
}

/// Decimal adjustment of `v` after a BCD addition (`n` clear) or subtraction
/// (`n` set). N is passed through, H is cleared.
pub fn bcd_adjust(v: u8, n: bool, h: bool, c: bool) -> AluResult {
    let fix_low = h || (!n && (v & 0x0F) > 9);
    let fix_high = c || (!n && v > 0x99);
    let fix = 0x60 * fix_high as u8 + 0x06 * fix_low as u8;
    let value = if n { v.wrapping_sub(fix) } else { v.wrapping_add(fix) };
    AluResult::new(value, Flags::new(value == 0, n, false, fix_high))
}

pub fn and(l: u8, r: u8) -> AluResult {
    let value = l & r;
    AluResult::new(value, Flags::new(value == 0, false, true, false))
}

pub fn or(l: u8, r: u8) -> AluResult {
    let value = l | r;
    AluResult::new(value, Flags::new(value == 0, false, false, false))
}

pub fn xor(l: u8, r: u8) -> AluResult {
    let value = l ^ r;
    AluResult::new(value, Flags::new(value == 0, false, false, false))
}

pub fn shift_left(v: u8) -> AluResult {
    let value = v << 1;
    AluResult::new(value, Flags::new(value == 0, false, false, v & 0x80 != 0))
}

/// Arithmetic right shift: bit 7 is kept.
pub fn shift_right_a(v: u8) -> AluResult {
    let value = (v >> 1) | (v & 0x80);
    AluResult::new(value, Flags::new(value == 0, false, false, v & 0x01 != 0))
}

/// Logical right shift: bit 7 becomes zero.
pub fn shift_right_l(v: u8) -> AluResult {
    let value = v >> 1;
    AluResult::new(value, Flags::new(value == 0, false, false, v & 0x01 != 0))
}

/// Rotation without carry: the bit leaving the byte enters at the other end
/// and is also copied into C.
pub fn rotate(dir: RotDir, v: u8) -> AluResult {
    let (value, out) = match dir {
        RotDir::Left => (v.rotate_left(1), v & 0x80 != 0),
        RotDir::Right => (v.rotate_right(1), v & 0x01 != 0),
    };
    AluResult::new(value, Flags::new(value == 0, false, false, out))
}

/// Rotation through the carry: the old carry enters, the leaving bit
/// becomes the new carry.
pub fn rotate_through_carry(dir: RotDir, v: u8, carry: bool) -> AluResult {
    let (value, out) = match dir {
        RotDir::Left => ((v << 1) | carry as u8, v & 0x80 != 0),
        RotDir::Right => ((v >> 1) | (carry as u8) << 7, v & 0x01 != 0),
    };
    AluResult::new(value, Flags::new(value == 0, false, false, out))
}

pub fn swap(v: u8) -> AluResult {
    let value = v.rotate_left(4);
    AluResult::new(value, Flags::new(value == 0, false, false, false))
}

/// Tests bit `bit` of `v`. The value is always zero; Z is set when the bit
/// is clear and H is always set.
///
/// # Panics
/// If `bit` is not in `0..8`.
pub fn test_bit(v: u8, bit: u8) -> AluResult {
    assert!(bit < 8, "bit index {bit} outside a byte");
    AluResult::new(0, Flags::new(v & (1 << bit) == 0, false, true, false))
}
