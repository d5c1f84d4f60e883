use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::address_map::{REG_IE, REG_IF};
use crate::machine::Device;

bitflags! {
    /// Interrupt sources, bit `i` being serviced at `0x40 + 8 * i`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Interrupt: u8 {
        const VBLANK = 1 << 0;
        const LCD_STAT = 1 << 1;
        const TIMER = 1 << 2;
        const SERIAL = 1 << 3;
        const JOYPAD = 1 << 4;
    }
}

/// Bits of IF that do not exist and always read as one.
const IF_UNUSED: u8 = 0xE0;

/// IE and IF, shared between the CPU and whoever raises interrupts.
#[derive(Debug, Default)]
pub(crate) struct InterruptLines {
    enable: Cell<u8>,
    pending: Cell<u8>,
}

impl InterruptLines {
    pub(crate) fn enable(&self) -> u8 {
        self.enable.get()
    }

    pub(crate) fn set_enable(&self, value: u8) {
        self.enable.set(value);
    }

    pub(crate) fn pending(&self) -> u8 {
        self.pending.get()
    }

    pub(crate) fn set_pending(&self, value: u8) {
        self.pending.set(value & Interrupt::all().bits());
    }

    pub(crate) fn request(&self, interrupt: Interrupt) {
        self.set_pending(self.pending() | interrupt.bits());
    }

    /// Enabled and pending interrupts.
    pub(crate) fn active(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.enable() & self.pending())
    }
}

/// Narrow handle through which devices request interrupts.
#[derive(Clone, Debug, Default)]
pub struct InterruptSink {
    lines: Rc<InterruptLines>,
}

impl InterruptSink {
    pub(crate) fn new(lines: Rc<InterruptLines>) -> Self {
        Self { lines }
    }

    /// Sink wired to nothing but itself; used by devices built in isolation.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn request(&self, interrupt: Interrupt) {
        self.lines.request(interrupt);
    }

    /// Interrupts requested and not yet serviced.
    pub fn pending(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.lines.pending())
    }
}

/// Exposes IF (0xFF0F) and IE (0xFFFF) on the bus.
#[derive(Debug)]
pub(crate) struct InterruptRegisters {
    lines: Rc<InterruptLines>,
}

impl InterruptRegisters {
    pub(crate) fn new(lines: Rc<InterruptLines>) -> Self {
        Self { lines }
    }
}

impl Device for InterruptRegisters {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_IF => Some(self.lines.pending() | IF_UNUSED),
            REG_IE => Some(self.lines.enable()),
            _ => None,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            REG_IF => self.lines.set_pending(value),
            REG_IE => self.lines.set_enable(value),
            _ => {}
        }
    }
}
