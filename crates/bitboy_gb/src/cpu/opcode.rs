//! Decode tables for the direct and the 0xCB-prefixed opcode pages.
//!
//! Both tables are derived once from the regular x/y/z bit layout of the
//! opcode byte (`xx yyy zzz`, with `y` split into `pp q`).

use lazy_static::lazy_static;

/// Prefix byte selecting the second opcode page.
pub const PREFIX: u8 = 0xCB;

/// 8-bit operand encoded in three bits; index 6 is the byte at (HL).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    B,
    C,
    D,
    E,
    H,
    L,
    HlInd,
    A,
}

impl Operand {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Operand::B,
            1 => Operand::C,
            2 => Operand::D,
            3 => Operand::E,
            4 => Operand::H,
            5 => Operand::L,
            6 => Operand::HlInd,
            _ => Operand::A,
        }
    }
}

/// Register pair operand of the 16-bit arithmetic and load group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pair {
    Bc,
    De,
    Hl,
    Sp,
}

/// Register pair operand of PUSH and POP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackPair {
    Bc,
    De,
    Hl,
    Af,
}

/// Address source of `LD (rr),A` and `LD A,(rr)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indirect {
    Bc,
    De,
    HlInc,
    HlDec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Nz,
    Z,
    Nc,
    C,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

/// Rotations and shifts of the prefixed page; the first four also exist as
/// the one-byte accumulator forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

/// Instruction family together with the operands encoded in the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    Daa,
    Cpl,
    Scf,
    Ccf,
    LdR8N8(Operand),
    LdR8R8 { dst: Operand, src: Operand },
    LdR16N16(Pair),
    LdIndA(Indirect),
    LdAInd(Indirect),
    LdN16Sp,
    LdhN8A,
    LdhAN8,
    LdhCA,
    LdhAC,
    LdN16A,
    LdAN16,
    LdSpHl,
    LdHlSpE8,
    IncR8(Operand),
    DecR8(Operand),
    IncR16(Pair),
    DecR16(Pair),
    AddHlR16(Pair),
    AddSpE8,
    RotA(ShiftOp),
    AluR8 { op: AluOp, src: Operand },
    AluN8(AluOp),
    Jr,
    JrCc(Condition),
    Jp,
    JpCc(Condition),
    JpHl,
    Call,
    CallCc(Condition),
    Ret,
    RetCc(Condition),
    Reti,
    Rst(u8),
    Push(StackPair),
    Pop(StackPair),
    Prefix,
    Shift { op: ShiftOp, target: Operand },
    Bit { bit: u8, target: Operand },
    Res { bit: u8, target: Operand },
    Set { bit: u8, target: Operand },
    Unused,
}

/// Decoded opcode.
///
/// `cycles` is charged whenever the instruction runs; conditional jumps,
/// calls and returns add `additional_cycles` when their condition holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub encoding: u8,
    pub family: Family,
    pub total_bytes: u8,
    pub cycles: u8,
    pub additional_cycles: u8,
}

impl Opcode {
    const fn new(encoding: u8, family: Family, total_bytes: u8, cycles: u8) -> Self {
        Self {
            encoding,
            family,
            total_bytes,
            cycles,
            additional_cycles: 0,
        }
    }

    const fn branching(encoding: u8, family: Family, total_bytes: u8, cycles: u8, extra: u8) -> Self {
        Self {
            encoding,
            family,
            total_bytes,
            cycles,
            additional_cycles: extra,
        }
    }
}

lazy_static! {
    pub static ref DIRECT: [Opcode; 256] = std::array::from_fn(|i| decode_direct(i as u8));
    pub static ref PREFIXED: [Opcode; 256] = std::array::from_fn(|i| decode_prefixed(i as u8));
}

const ALU_OPS: [AluOp; 8] = [
    AluOp::Add,
    AluOp::Adc,
    AluOp::Sub,
    AluOp::Sbc,
    AluOp::And,
    AluOp::Xor,
    AluOp::Or,
    AluOp::Cp,
];

const SHIFT_OPS: [ShiftOp; 8] = [
    ShiftOp::Rlc,
    ShiftOp::Rrc,
    ShiftOp::Rl,
    ShiftOp::Rr,
    ShiftOp::Sla,
    ShiftOp::Sra,
    ShiftOp::Swap,
    ShiftOp::Srl,
];

const PAIRS: [Pair; 4] = [Pair::Bc, Pair::De, Pair::Hl, Pair::Sp];
const STACK_PAIRS: [StackPair; 4] = [StackPair::Bc, StackPair::De, StackPair::Hl, StackPair::Af];
const INDIRECTS: [Indirect; 4] = [Indirect::Bc, Indirect::De, Indirect::HlInc, Indirect::HlDec];
const CONDITIONS: [Condition; 4] = [Condition::Nz, Condition::Z, Condition::Nc, Condition::C];

/// Cost of an operation on an 8-bit operand: (HL) adds `mem` cycles.
fn r8_cycles(operand: Operand, reg: u8, mem: u8) -> u8 {
    if operand == Operand::HlInd {
        mem
    } else {
        reg
    }
}

fn decode_direct(code: u8) -> Opcode {
    use Family::*;

    let x = code >> 6;
    let y = (code >> 3) & 0b111;
    let z = code & 0b111;
    let p = (y >> 1) as usize;
    let q = y & 1;
    let op = |family, bytes, cycles| Opcode::new(code, family, bytes, cycles);

    match (x, z) {
        (0, 0) => match y {
            0 => op(Nop, 1, 1),
            1 => op(LdN16Sp, 3, 5),
            2 => op(Stop, 2, 1),
            3 => op(Jr, 2, 3),
            _ => Opcode::branching(code, JrCc(CONDITIONS[(y - 4) as usize]), 2, 2, 1),
        },
        (0, 1) if q == 0 => op(LdR16N16(PAIRS[p]), 3, 3),
        (0, 1) => op(AddHlR16(PAIRS[p]), 1, 2),
        (0, 2) if q == 0 => op(LdIndA(INDIRECTS[p]), 1, 2),
        (0, 2) => op(LdAInd(INDIRECTS[p]), 1, 2),
        (0, 3) if q == 0 => op(IncR16(PAIRS[p]), 1, 2),
        (0, 3) => op(DecR16(PAIRS[p]), 1, 2),
        (0, 4) => {
            let target = Operand::from_bits(y);
            op(IncR8(target), 1, r8_cycles(target, 1, 3))
        }
        (0, 5) => {
            let target = Operand::from_bits(y);
            op(DecR8(target), 1, r8_cycles(target, 1, 3))
        }
        (0, 6) => {
            let target = Operand::from_bits(y);
            op(LdR8N8(target), 2, r8_cycles(target, 2, 3))
        }
        (0, _) => match y {
            0..=3 => op(RotA(SHIFT_OPS[y as usize]), 1, 1),
            4 => op(Daa, 1, 1),
            5 => op(Cpl, 1, 1),
            6 => op(Scf, 1, 1),
            _ => op(Ccf, 1, 1),
        },
        (1, _) if code == 0x76 => op(Halt, 1, 1),
        (1, _) => {
            let dst = Operand::from_bits(y);
            let src = Operand::from_bits(z);
            let cycles = if dst == Operand::HlInd || src == Operand::HlInd { 2 } else { 1 };
            op(LdR8R8 { dst, src }, 1, cycles)
        }
        (2, _) => {
            let src = Operand::from_bits(z);
            op(AluR8 { op: ALU_OPS[y as usize], src }, 1, r8_cycles(src, 1, 2))
        }
        (_, 0) => match y {
            0..=3 => Opcode::branching(code, RetCc(CONDITIONS[y as usize]), 1, 2, 3),
            4 => op(LdhN8A, 2, 3),
            5 => op(AddSpE8, 2, 4),
            6 => op(LdhAN8, 2, 3),
            _ => op(LdHlSpE8, 2, 3),
        },
        (_, 1) if q == 0 => op(Pop(STACK_PAIRS[p]), 1, 3),
        (_, 1) => match p {
            0 => op(Ret, 1, 4),
            1 => op(Reti, 1, 4),
            2 => op(JpHl, 1, 1),
            _ => op(LdSpHl, 1, 2),
        },
        (_, 2) => match y {
            0..=3 => Opcode::branching(code, JpCc(CONDITIONS[y as usize]), 3, 3, 1),
            4 => op(LdhCA, 1, 2),
            5 => op(LdN16A, 3, 4),
            6 => op(LdhAC, 1, 2),
            _ => op(LdAN16, 3, 4),
        },
        (_, 3) => match y {
            0 => op(Jp, 3, 4),
            1 => op(Prefix, 1, 0),
            6 => op(Di, 1, 1),
            7 => op(Ei, 1, 1),
            _ => op(Unused, 1, 1),
        },
        (_, 4) => match y {
            0..=3 => Opcode::branching(code, CallCc(CONDITIONS[y as usize]), 3, 3, 3),
            _ => op(Unused, 1, 1),
        },
        (_, 5) if q == 0 => op(Push(STACK_PAIRS[p]), 1, 4),
        (_, 5) if p == 0 => op(Call, 3, 6),
        (_, 5) => op(Unused, 1, 1),
        (_, 6) => op(AluN8(ALU_OPS[y as usize]), 2, 2),
        _ => op(Rst(y * 8), 1, 4),
    }
}

fn decode_prefixed(code: u8) -> Opcode {
    let x = code >> 6;
    let y = (code >> 3) & 0b111;
    let target = Operand::from_bits(code);
    let family = match x {
        0 => Family::Shift {
            op: SHIFT_OPS[y as usize],
            target,
        },
        1 => Family::Bit { bit: y, target },
        2 => Family::Res { bit: y, target },
        _ => Family::Set { bit: y, target },
    };
    let mem_cycles = if x == 1 { 3 } else { 4 };
    Opcode::new(code, family, 2, r8_cycles(target, 2, mem_cycles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_keep_their_encoding() {
        for i in 0..=255u8 {
            assert_eq!(DIRECT[i as usize].encoding, i);
            assert_eq!(PREFIXED[i as usize].encoding, i);
        }
    }

    #[test]
    fn eleven_direct_opcodes_are_unused() {
        let unused: Vec<u8> = DIRECT
            .iter()
            .filter(|o| o.family == Family::Unused)
            .map(|o| o.encoding)
            .collect();
        assert_eq!(
            unused,
            vec![0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD]
        );
    }

    #[test]
    fn sample_direct_decodings() {
        assert_eq!(DIRECT[0x00].family, Family::Nop);
        assert_eq!(DIRECT[0x76].family, Family::Halt);
        assert_eq!(DIRECT[0xCB].family, Family::Prefix);
        assert_eq!(
            DIRECT[0x7E].family,
            Family::LdR8R8 { dst: Operand::A, src: Operand::HlInd }
        );
        assert_eq!(DIRECT[0x7E].cycles, 2);
        assert_eq!(DIRECT[0x36].family, Family::LdR8N8(Operand::HlInd));
        assert_eq!((DIRECT[0x36].total_bytes, DIRECT[0x36].cycles), (2, 3));
        assert_eq!(DIRECT[0x22].family, Family::LdIndA(Indirect::HlInc));
        assert_eq!(DIRECT[0xF1].family, Family::Pop(StackPair::Af));
        assert_eq!(DIRECT[0xFF].family, Family::Rst(0x38));
        assert_eq!(DIRECT[0xFE].family, Family::AluN8(AluOp::Cp));
        assert_eq!(DIRECT[0x1F].family, Family::RotA(ShiftOp::Rr));
    }

    #[test]
    fn branch_costs() {
        let cost = |code: u8| {
            let o = DIRECT[code as usize];
            (o.total_bytes, o.cycles, o.additional_cycles)
        };
        assert_eq!(cost(0x20), (2, 2, 1)); // JR NZ
        assert_eq!(cost(0x18), (2, 3, 0)); // JR
        assert_eq!(cost(0xC2), (3, 3, 1)); // JP NZ
        assert_eq!(cost(0xC3), (3, 4, 0)); // JP
        assert_eq!(cost(0xC4), (3, 3, 3)); // CALL NZ
        assert_eq!(cost(0xCD), (3, 6, 0)); // CALL
        assert_eq!(cost(0xC0), (1, 2, 3)); // RET NZ
        assert_eq!(cost(0xC9), (1, 4, 0)); // RET
        assert_eq!(cost(0x08), (3, 5, 0)); // LD (n16),SP
    }

    #[test]
    fn prefixed_costs() {
        assert_eq!(PREFIXED[0x37].family, Family::Shift { op: ShiftOp::Swap, target: Operand::A });
        assert_eq!(PREFIXED[0x37].cycles, 2);
        assert_eq!(PREFIXED[0x46].family, Family::Bit { bit: 0, target: Operand::HlInd });
        assert_eq!(PREFIXED[0x46].cycles, 3);
        assert_eq!(PREFIXED[0x86].cycles, 4);
        assert_eq!(PREFIXED[0xFF].family, Family::Set { bit: 7, target: Operand::A });
        assert!(PREFIXED.iter().all(|o| o.total_bytes == 2));
    }
}
