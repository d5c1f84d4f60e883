pub mod alu;
mod exec;
mod interrupts;
pub mod opcode;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use bitboy_common::bits;

use crate::address_map::INTERRUPTS_BASE;
use crate::machine::Bus;
use crate::register_file::{register_set, RegisterFile};
use crate::state::{StateReader, StateWriter};
use crate::{Error, Result};

pub use alu::Flags;
pub use interrupts::{Interrupt, InterruptSink};
pub(crate) use interrupts::{InterruptLines, InterruptRegisters};

use opcode::{Opcode, DIRECT, PREFIX, PREFIXED};

register_set! {
    /// The eight 8-bit registers, in register-file slot order.
    pub enum Reg { A, F, B, C, D, E, H, L }
}

/// 16-bit views over register pairs, high byte first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    Af,
    Bc,
    De,
    Hl,
}

impl Reg16 {
    fn halves(self) -> (Reg, Reg) {
        match self {
            Reg16::Af => (Reg::A, Reg::F),
            Reg16::Bc => (Reg::B, Reg::C),
            Reg16::De => (Reg::D, Reg::E),
            Reg16::Hl => (Reg::H, Reg::L),
        }
    }
}

/// Cycles charged for dispatching an interrupt.
const INTERRUPT_CYCLES: u64 = 5;

/// Whether the CPU fetches instructions or waits for something to happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Stopped by HALT until an enabled interrupt is pending.
    Halted,
    /// Stopped by STOP until a joypad interrupt is requested.
    Stopped,
    /// Hit an unused opcode; only a reset or a restored state recovers.
    Locked,
}

impl RunState {
    fn tag(self) -> u8 {
        match self {
            RunState::Running => 0,
            RunState::Halted => 1,
            RunState::Stopped => 2,
            RunState::Locked => 3,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => RunState::Running,
            1 => RunState::Halted,
            2 => RunState::Stopped,
            3 => RunState::Locked,
            _ => {
                return Err(Error::StateMismatch {
                    what: "CPU run state",
                    expected: 3,
                    found: tag as usize,
                })
            }
        })
    }
}

/// Sharp LR35902 core.
///
/// The CPU is not a bus device. Its interrupt registers live in shared
/// [`InterruptLines`] that other devices reach through an
/// [`InterruptSink`], while [`InterruptRegisters`] exposes them on the bus.
#[derive(Clone, Debug)]
pub struct Cpu {
    regs: RegisterFile<Reg, 8>,
    pc: u16,
    sp: u16,
    ime: bool,
    state: RunState,
    /// First cycle at which the CPU does something again.
    next_non_idle_cycle: u64,
    lines: Rc<InterruptLines>,
}

impl Cpu {
    pub(crate) fn new(lines: Rc<InterruptLines>) -> Self {
        Self {
            regs: RegisterFile::new(),
            pc: 0,
            sp: 0,
            ime: false,
            state: RunState::Running,
            next_non_idle_cycle: 0,
            lines,
        }
    }

    /// Advances the CPU to `cycle`, executing at most one instruction or
    /// interrupt dispatch.
    pub fn cycle(&mut self, cycle: u64, bus: &Bus) {
        self.wake_up(cycle);
        if cycle < self.next_non_idle_cycle {
            return;
        }
        self.step(bus);
    }

    fn wake_up(&mut self, cycle: u64) {
        let wake = match self.state {
            RunState::Halted => !self.lines.active().is_empty(),
            RunState::Stopped => {
                Interrupt::from_bits_truncate(self.lines.pending()).contains(Interrupt::JOYPAD)
            }
            RunState::Running | RunState::Locked => false,
        };
        if wake {
            self.state = RunState::Running;
            self.next_non_idle_cycle = cycle;
        }
    }

    fn step(&mut self, bus: &Bus) {
        let active = self.lines.active();
        if self.ime && !active.is_empty() {
            self.dispatch_interrupt(bus, active);
            return;
        }

        let mut opcode = DIRECT[bus.read(self.pc) as usize];
        if opcode.encoding == PREFIX {
            opcode = PREFIXED[bus.read(self.pc.wrapping_add(1)) as usize];
        }
        self.dispatch(bus, &opcode);
    }

    fn dispatch_interrupt(&mut self, bus: &Bus, active: Interrupt) {
        let index = active.bits().trailing_zeros() as u16;
        let pending = self.lines.pending();
        self.lines.set_pending(pending & !(1 << index));
        self.ime = false;
        log::trace!("interrupt {index} dispatched from 0x{:04X}", self.pc);
        self.push16(bus, self.pc);
        self.pc = INTERRUPTS_BASE + 8 * index;
        self.next_non_idle_cycle += INTERRUPT_CYCLES;
    }

    fn lock(&mut self, opcode: &Opcode) {
        log::error!(
            "unused opcode 0x{:02X} at 0x{:04X}, CPU locked",
            opcode.encoding,
            self.pc
        );
        self.state = RunState::Locked;
        self.next_non_idle_cycle = u64::MAX;
    }

    pub fn reg(&self, reg: Reg) -> u8 {
        self.regs.get(reg)
    }

    pub fn set_reg(&mut self, reg: Reg, value: u8) {
        let value = if reg == Reg::F { value & 0xF0 } else { value };
        self.regs.set(reg, value);
    }

    pub fn reg16(&self, reg: Reg16) -> u16 {
        let (high, low) = reg.halves();
        bits::make16(self.reg(high), self.reg(low))
    }

    pub fn set_reg16(&mut self, reg: Reg16, value: u16) {
        let (high, low) = reg.halves();
        self.set_reg(high, bits::msb8(value));
        self.set_reg(low, bits::lsb8(value));
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(self.reg(Reg::F))
    }

    pub(crate) fn set_flags(&mut self, flags: Flags) {
        self.set_reg(Reg::F, flags.bits());
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn set_sp(&mut self, sp: u16) {
        self.sp = sp;
    }

    /// Master interrupt enable flag.
    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn next_non_idle_cycle(&self) -> u64 {
        self.next_non_idle_cycle
    }

    pub fn interrupt_enable(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.lines.enable())
    }

    pub fn interrupt_pending(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.lines.pending())
    }

    /// Sets the pending bit of `interrupt` directly.
    pub fn request_interrupt(&self, interrupt: Interrupt) {
        self.lines.request(interrupt);
    }

    pub fn interrupt_sink(&self) -> InterruptSink {
        InterruptSink::new(self.lines.clone())
    }

    pub(crate) fn save(&self, w: &mut StateWriter) {
        w.raw(self.regs.as_bytes());
        w.u16(self.pc);
        w.u16(self.sp);
        w.bool(self.ime);
        w.u8(self.state.tag());
        w.u64(self.next_non_idle_cycle);
    }

    /// Loads registers and scheduling state; the interrupt lines are shared
    /// and restored by the owner of the machine.
    pub(crate) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.regs.load_bytes(r.array::<8>()?);
        self.pc = r.u16()?;
        self.sp = r.u16()?;
        self.ime = r.bool()?;
        self.state = RunState::from_tag(r.u8()?)?;
        self.next_non_idle_cycle = r.u64()?;
        Ok(())
    }
}
