use bitboy_common::bits;

use super::alu::{self, AluResult, Flags, RotDir};
use super::opcode::{AluOp, Condition, Family, Indirect, Opcode, Operand, Pair, ShiftOp, StackPair};
use super::{Cpu, Reg, Reg16, RunState};
use crate::machine::Bus;

/// Where each flag of an instruction comes from.
#[derive(Clone, Copy)]
enum FlagSrc {
    Zero,
    One,
    Alu,
    Keep,
}

use FlagSrc::{Alu, Keep, One, Zero};

impl Cpu {
    /// Executes one decoded instruction.
    ///
    /// PC moves past the instruction unless the instruction jumps, and the
    /// next non-idle cycle advances by the opcode's cost.
    pub(super) fn dispatch(&mut self, bus: &Bus, opcode: &Opcode) {
        let mut next_pc = self.pc.wrapping_add(opcode.total_bytes as u16);
        self.next_non_idle_cycle += opcode.cycles as u64;

        match opcode.family {
            Family::Nop => {}
            Family::Stop => {
                self.state = RunState::Stopped;
                self.next_non_idle_cycle = u64::MAX;
            }
            Family::Halt => {
                self.state = RunState::Halted;
                self.next_non_idle_cycle = u64::MAX;
            }
            Family::Di => self.ime = false,
            Family::Ei => self.ime = true,
            Family::Daa => {
                let f = self.flags();
                let r = alu::bcd_adjust(
                    self.reg(Reg::A),
                    f.contains(Flags::N),
                    f.contains(Flags::H),
                    f.contains(Flags::C),
                );
                self.set_reg(Reg::A, r.value);
                self.combine(r.flags, Alu, Keep, Zero, Alu);
            }
            Family::Cpl => {
                self.set_reg(Reg::A, !self.reg(Reg::A));
                self.combine(Flags::empty(), Keep, One, One, Keep);
            }
            Family::Scf => self.combine(Flags::empty(), Keep, Zero, Zero, One),
            Family::Ccf => {
                let c = self.flags().contains(Flags::C);
                self.combine(Flags::new(false, false, false, !c), Keep, Zero, Zero, Alu);
            }

            Family::LdR8N8(dst) => {
                let v = self.read_imm8(bus);
                self.write_operand(bus, dst, v);
            }
            Family::LdR8R8 { dst, src } => {
                let v = self.read_operand(bus, src);
                self.write_operand(bus, dst, v);
            }
            Family::LdR16N16(pair) => {
                let v = self.read_imm16(bus);
                self.set_pair(pair, v);
            }
            Family::LdIndA(ind) => {
                let address = self.indirect_address(ind);
                bus.write(address, self.reg(Reg::A));
            }
            Family::LdAInd(ind) => {
                let address = self.indirect_address(ind);
                self.set_reg(Reg::A, bus.read(address));
            }
            Family::LdN16Sp => {
                let address = self.read_imm16(bus);
                write16(bus, address, self.sp);
            }
            Family::LdhN8A => {
                let address = 0xFF00 | self.read_imm8(bus) as u16;
                bus.write(address, self.reg(Reg::A));
            }
            Family::LdhAN8 => {
                let address = 0xFF00 | self.read_imm8(bus) as u16;
                self.set_reg(Reg::A, bus.read(address));
            }
            Family::LdhCA => bus.write(0xFF00 | self.reg(Reg::C) as u16, self.reg(Reg::A)),
            Family::LdhAC => self.set_reg(Reg::A, bus.read(0xFF00 | self.reg(Reg::C) as u16)),
            Family::LdN16A => {
                let address = self.read_imm16(bus);
                bus.write(address, self.reg(Reg::A));
            }
            Family::LdAN16 => {
                let address = self.read_imm16(bus);
                self.set_reg(Reg::A, bus.read(address));
            }
            Family::LdSpHl => self.sp = self.reg16(Reg16::Hl),
            Family::LdHlSpE8 => {
                let r = self.sp_plus_e8(bus);
                self.set_reg16(Reg16::Hl, r.value);
                self.combine(r.flags, Zero, Zero, Alu, Alu);
            }

            Family::IncR8(target) => {
                let r = alu::add(self.read_operand(bus, target), 1, false);
                self.write_operand(bus, target, r.value);
                self.combine(r.flags, Alu, Zero, Alu, Keep);
            }
            Family::DecR8(target) => {
                let r = alu::sub(self.read_operand(bus, target), 1, false);
                self.write_operand(bus, target, r.value);
                self.combine(r.flags, Alu, One, Alu, Keep);
            }
            Family::IncR16(pair) => self.set_pair(pair, self.pair(pair).wrapping_add(1)),
            Family::DecR16(pair) => self.set_pair(pair, self.pair(pair).wrapping_sub(1)),
            Family::AddHlR16(pair) => {
                let r = alu::add16_high(self.reg16(Reg16::Hl), self.pair(pair));
                self.set_reg16(Reg16::Hl, r.value);
                self.combine(r.flags, Keep, Zero, Alu, Alu);
            }
            Family::AddSpE8 => {
                let r = self.sp_plus_e8(bus);
                self.sp = r.value;
                self.combine(r.flags, Zero, Zero, Alu, Alu);
            }

            Family::RotA(op) => {
                let r = self.shift(op, self.reg(Reg::A));
                self.set_reg(Reg::A, r.value);
                self.combine(r.flags, Zero, Zero, Zero, Alu);
            }
            Family::AluR8 { op, src } => {
                let v = self.read_operand(bus, src);
                self.alu_a(op, v);
            }
            Family::AluN8(op) => {
                let v = self.read_imm8(bus);
                self.alu_a(op, v);
            }

            Family::Jr => next_pc = relative(next_pc, self.read_imm8(bus)),
            Family::JrCc(cc) => {
                if self.branch(opcode, cc) {
                    next_pc = relative(next_pc, self.read_imm8(bus));
                }
            }
            Family::Jp => next_pc = self.read_imm16(bus),
            Family::JpCc(cc) => {
                if self.branch(opcode, cc) {
                    next_pc = self.read_imm16(bus);
                }
            }
            Family::JpHl => next_pc = self.reg16(Reg16::Hl),
            Family::Call => {
                self.push16(bus, next_pc);
                next_pc = self.read_imm16(bus);
            }
            Family::CallCc(cc) => {
                if self.branch(opcode, cc) {
                    self.push16(bus, next_pc);
                    next_pc = self.read_imm16(bus);
                }
            }
            Family::Ret => next_pc = self.pop16(bus),
            Family::RetCc(cc) => {
                if self.branch(opcode, cc) {
                    next_pc = self.pop16(bus);
                }
            }
            Family::Reti => {
                next_pc = self.pop16(bus);
                self.ime = true;
            }
            Family::Rst(vector) => {
                self.push16(bus, next_pc);
                next_pc = vector as u16;
            }
            Family::Push(pair) => self.push16(bus, self.stack_pair(pair)),
            Family::Pop(pair) => {
                let v = self.pop16(bus);
                self.set_stack_pair(pair, v);
            }

            Family::Shift { op, target } => {
                let r = self.shift(op, self.read_operand(bus, target));
                self.write_operand(bus, target, r.value);
                self.combine(r.flags, Alu, Alu, Alu, Alu);
            }
            Family::Bit { bit, target } => {
                let r = alu::test_bit(self.read_operand(bus, target), bit);
                self.combine(r.flags, Alu, Zero, One, Keep);
            }
            Family::Res { bit, target } => {
                let v = self.read_operand(bus, target) & !(1 << bit);
                self.write_operand(bus, target, v);
            }
            Family::Set { bit, target } => {
                let v = self.read_operand(bus, target) | (1 << bit);
                self.write_operand(bus, target, v);
            }

            // The prefix byte never reaches dispatch on its own.
            Family::Prefix | Family::Unused => {
                self.lock(opcode);
                return;
            }
        }

        self.pc = next_pc;
    }

    /// Applies the flag sources of an instruction to F.
    fn combine(&mut self, alu: Flags, z: FlagSrc, n: FlagSrc, h: FlagSrc, c: FlagSrc) {
        let current = self.flags();
        let mut flags = Flags::empty();
        for (flag, src) in [(Flags::Z, z), (Flags::N, n), (Flags::H, h), (Flags::C, c)] {
            let value = match src {
                Zero => false,
                One => true,
                Alu => alu.contains(flag),
                Keep => current.contains(flag),
            };
            flags.set(flag, value);
        }
        self.set_flags(flags);
    }

    fn alu_a(&mut self, op: AluOp, v: u8) {
        let a = self.reg(Reg::A);
        let carry = self.flags().contains(Flags::C);
        let r = match op {
            AluOp::Add => alu::add(a, v, false),
            AluOp::Adc => alu::add(a, v, carry),
            AluOp::Sub | AluOp::Cp => alu::sub(a, v, false),
            AluOp::Sbc => alu::sub(a, v, carry),
            AluOp::And => alu::and(a, v),
            AluOp::Xor => alu::xor(a, v),
            AluOp::Or => alu::or(a, v),
        };
        if op != AluOp::Cp {
            self.set_reg(Reg::A, r.value);
        }
        self.combine(r.flags, Alu, Alu, Alu, Alu);
    }

    fn shift(&self, op: ShiftOp, v: u8) -> AluResult {
        let carry = self.flags().contains(Flags::C);
        match op {
            ShiftOp::Rlc => alu::rotate(RotDir::Left, v),
            ShiftOp::Rrc => alu::rotate(RotDir::Right, v),
            ShiftOp::Rl => alu::rotate_through_carry(RotDir::Left, v, carry),
            ShiftOp::Rr => alu::rotate_through_carry(RotDir::Right, v, carry),
            ShiftOp::Sla => alu::shift_left(v),
            ShiftOp::Sra => alu::shift_right_a(v),
            ShiftOp::Swap => alu::swap(v),
            ShiftOp::Srl => alu::shift_right_l(v),
        }
    }

    /// `SP + e8` with flags from the low byte.
    fn sp_plus_e8(&self, bus: &Bus) -> AluResult<u16> {
        let offset = bits::sign_extend8(self.read_imm8(bus)) as u16;
        alu::add16_low(self.sp, offset)
    }

    /// Evaluates `cc` and charges the extra cycles of a taken branch.
    fn branch(&mut self, opcode: &Opcode, cc: Condition) -> bool {
        let f = self.flags();
        let taken = match cc {
            Condition::Nz => !f.contains(Flags::Z),
            Condition::Z => f.contains(Flags::Z),
            Condition::Nc => !f.contains(Flags::C),
            Condition::C => f.contains(Flags::C),
        };
        if taken {
            self.next_non_idle_cycle += opcode.additional_cycles as u64;
        }
        taken
    }

    fn read_imm8(&self, bus: &Bus) -> u8 {
        bus.read(self.pc.wrapping_add(1))
    }

    fn read_imm16(&self, bus: &Bus) -> u16 {
        read16(bus, self.pc.wrapping_add(1))
    }

    fn read_operand(&self, bus: &Bus, operand: Operand) -> u8 {
        match operand_reg(operand) {
            Some(reg) => self.reg(reg),
            None => bus.read(self.reg16(Reg16::Hl)),
        }
    }

    fn write_operand(&mut self, bus: &Bus, operand: Operand, value: u8) {
        match operand_reg(operand) {
            Some(reg) => self.set_reg(reg, value),
            None => bus.write(self.reg16(Reg16::Hl), value),
        }
    }

    /// Address of an indirect operand, post-incrementing or decrementing HL.
    fn indirect_address(&mut self, ind: Indirect) -> u16 {
        match ind {
            Indirect::Bc => self.reg16(Reg16::Bc),
            Indirect::De => self.reg16(Reg16::De),
            Indirect::HlInc => {
                let hl = self.reg16(Reg16::Hl);
                self.set_reg16(Reg16::Hl, hl.wrapping_add(1));
                hl
            }
            Indirect::HlDec => {
                let hl = self.reg16(Reg16::Hl);
                self.set_reg16(Reg16::Hl, hl.wrapping_sub(1));
                hl
            }
        }
    }

    fn pair(&self, pair: Pair) -> u16 {
        match pair {
            Pair::Bc => self.reg16(Reg16::Bc),
            Pair::De => self.reg16(Reg16::De),
            Pair::Hl => self.reg16(Reg16::Hl),
            Pair::Sp => self.sp,
        }
    }

    fn set_pair(&mut self, pair: Pair, value: u16) {
        match pair {
            Pair::Bc => self.set_reg16(Reg16::Bc, value),
            Pair::De => self.set_reg16(Reg16::De, value),
            Pair::Hl => self.set_reg16(Reg16::Hl, value),
            Pair::Sp => self.sp = value,
        }
    }

    fn stack_pair(&self, pair: StackPair) -> u16 {
        self.reg16(stack_reg16(pair))
    }

    fn set_stack_pair(&mut self, pair: StackPair, value: u16) {
        self.set_reg16(stack_reg16(pair), value);
    }

    pub(super) fn push16(&mut self, bus: &Bus, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        write16(bus, self.sp, value);
    }

    fn pop16(&mut self, bus: &Bus) -> u16 {
        let value = read16(bus, self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }
}

fn operand_reg(operand: Operand) -> Option<Reg> {
    Some(match operand {
        Operand::B => Reg::B,
        Operand::C => Reg::C,
        Operand::D => Reg::D,
        Operand::E => Reg::E,
        Operand::H => Reg::H,
        Operand::L => Reg::L,
        Operand::A => Reg::A,
        Operand::HlInd => return None,
    })
}

fn stack_reg16(pair: StackPair) -> Reg16 {
    match pair {
        StackPair::Bc => Reg16::Bc,
        StackPair::De => Reg16::De,
        StackPair::Hl => Reg16::Hl,
        StackPair::Af => Reg16::Af,
    }
}

fn relative(pc: u16, offset: u8) -> u16 {
    pc.wrapping_add(bits::sign_extend8(offset) as u16)
}

fn read16(bus: &Bus, address: u16) -> u16 {
    u16::from_le_bytes([bus.read(address), bus.read(address.wrapping_add(1))])
}

fn write16(bus: &Bus, address: u16, value: u16) {
    let [low, high] = value.to_le_bytes();
    bus.write(address, low);
    bus.write(address.wrapping_add(1), high);
}
