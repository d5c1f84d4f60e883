//! Whole-machine save states.
//!
//! Layout: the magic `BBST`, a format version byte, the cycle counter, then
//! each component in a fixed order. RAM blocks and the cartridge blob are
//! length-prefixed so size mismatches are caught before anything changes.

use crate::address_map::{HIGH_RAM_SIZE, WORK_RAM_SIZE};
use crate::state::{StateReader, StateWriter};
use crate::{Error, Result};

use super::Machine;

const MAGIC: &[u8; 4] = b"BBST";
const VERSION: u8 = 1;

impl Machine {
    /// Serialises the full machine state. The current frame image is not
    /// included; it is redrawn by the next frame.
    pub fn save_state(&self) -> Vec<u8> {
        let mut w = StateWriter::new();
        w.raw(MAGIC);
        w.u8(VERSION);
        w.u64(self.cycles);
        self.cpu.save(&mut w);
        w.u8(self.interrupts.enable());
        w.u8(self.interrupts.pending());
        w.block(self.work_ram.borrow().as_slice());
        w.block(self.high_ram.borrow().as_slice());
        w.bool(self.boot.borrow().is_disabled());
        self.timer.borrow().save(&mut w);
        self.lcd.borrow().save(&mut w);
        self.joypad.borrow().save(&mut w);
        w.block(&self.cartridge.borrow().save_state());

        let bytes = w.into_bytes();
        log::info!("Saved state at cycle {} ({} bytes)", self.cycles, bytes.len());
        bytes
    }

    /// Restores a state written by [`save_state`](Self::save_state) for the
    /// same cartridge. On error the machine is left exactly as it was.
    pub fn restore_state(&mut self, data: &[u8]) -> Result<()> {
        let mut r = StateReader::new(data);
        if r.raw(MAGIC.len()).ok() != Some(&MAGIC[..]) {
            return Err(Error::StateMagic);
        }
        let version = r.u8()?;
        if version != VERSION {
            return Err(Error::StateVersion {
                found: version,
                expected: VERSION,
            });
        }

        let cycles = r.u64()?;
        let mut cpu = self.cpu.clone();
        cpu.load(&mut r)?;
        let enable = r.u8()?;
        let pending = r.u8()?;
        let work_ram = r.block("work RAM", WORK_RAM_SIZE)?;
        let high_ram = r.block("high RAM", HIGH_RAM_SIZE)?;
        let boot_disabled = r.bool()?;
        let mut timer = self.timer.borrow().clone();
        timer.load(&mut r)?;
        let mut lcd = self.lcd.borrow().clone();
        lcd.load(&mut r)?;
        let mut joypad = self.joypad.borrow().clone();
        joypad.load(&mut r)?;
        let cartridge = r.any_block()?;
        r.finish()?;

        // Last fallible step; it is atomic on its own.
        self.cartridge.borrow_mut().restore_state(cartridge)?;

        self.cycles = cycles;
        self.cpu = cpu;
        self.interrupts.set_enable(enable);
        self.interrupts.set_pending(pending);
        self.work_ram.borrow_mut().load(work_ram);
        self.high_ram.borrow_mut().load(high_ram);
        self.boot.borrow_mut().set_disabled(boot_disabled);
        *self.timer.borrow_mut() = timer;
        *self.lcd.borrow_mut() = lcd;
        *self.joypad.borrow_mut() = joypad;

        log::info!("Restored state at cycle {}", cycles);
        Ok(())
    }
}
