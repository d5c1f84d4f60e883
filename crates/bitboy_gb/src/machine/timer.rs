//! Divider and programmable timer.
//!
//! A 16-bit main counter advances by 4 every cycle and DIV reads its upper
//! byte. TAC selects one of four counter bits; TIMA counts the falling
//! edges of `enabled && selected bit`, including the spurious ones caused by
//! register writes.

use bitflags::bitflags;

use crate::address_map::{REG_DIV, REG_TAC, REG_TIMA, REG_TMA};
use crate::cpu::{Interrupt, InterruptSink};
use crate::register_file::{register_set, RegisterFile};
use crate::state::{StateReader, StateWriter};
use crate::Result;

use super::Device;

register_set! {
    enum TimerReg { Tima, Tma, Tac }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Tac: u8 {
        const ENABLE = 1 << 2;
        const CLOCK = 0b11;
    }
}

/// Bits of TAC that do not exist and always read as one.
const TAC_UNUSED: u8 = 0xF8;

/// Main counter bit watched for each TAC clock selection.
const CRITICAL_BITS: [u16; 4] = [9, 3, 5, 7];

#[derive(Clone, Debug)]
pub struct Timer {
    main_counter: u16,
    regs: RegisterFile<TimerReg, 3>,
    sink: InterruptSink,
}

impl Timer {
    pub fn new(sink: InterruptSink) -> Self {
        Self {
            main_counter: 0,
            regs: RegisterFile::new(),
            sink,
        }
    }

    pub fn cycle(&mut self) {
        let before = self.state();
        self.main_counter = self.main_counter.wrapping_add(4);
        self.increment_if_fell(before);
    }

    pub fn main_counter(&self) -> u16 {
        self.main_counter
    }

    fn tac(&self) -> Tac {
        Tac::from_bits_truncate(self.regs.get(TimerReg::Tac))
    }

    fn state(&self) -> bool {
        let tac = self.tac();
        let bit = CRITICAL_BITS[(tac & Tac::CLOCK).bits() as usize];
        tac.contains(Tac::ENABLE) && self.main_counter & (1 << bit) != 0
    }

    fn increment_if_fell(&mut self, before: bool) {
        if before && !self.state() {
            let tima = self.regs.get(TimerReg::Tima);
            if tima == 0xFF {
                log::trace!("TIMA overflow, reloading 0x{:02X}", self.regs.get(TimerReg::Tma));
                self.regs.set(TimerReg::Tima, self.regs.get(TimerReg::Tma));
                self.sink.request(Interrupt::TIMER);
            } else {
                self.regs.set(TimerReg::Tima, tima + 1);
            }
        }
    }

    pub(crate) fn save(&self, w: &mut StateWriter) {
        w.u16(self.main_counter);
        w.raw(self.regs.as_bytes());
    }

    pub(crate) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.main_counter = r.u16()?;
        self.regs.load_bytes(r.array::<3>()?);
        Ok(())
    }
}

impl Device for Timer {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_DIV => Some((self.main_counter >> 8) as u8),
            REG_TIMA => Some(self.regs.get(TimerReg::Tima)),
            REG_TMA => Some(self.regs.get(TimerReg::Tma)),
            REG_TAC => Some(self.regs.get(TimerReg::Tac) | TAC_UNUSED),
            _ => None,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            REG_DIV => {
                let before = self.state();
                self.main_counter = 0;
                self.increment_if_fell(before);
            }
            REG_TIMA => self.regs.set(TimerReg::Tima, value),
            REG_TMA => self.regs.set(TimerReg::Tma, value),
            REG_TAC => {
                let before = self.state();
                self.regs.set(TimerReg::Tac, value & !TAC_UNUSED);
                self.increment_if_fell(before);
            }
            _ => {}
        }
    }
}
