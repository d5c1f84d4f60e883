use crate::machine::{Ram, Rom};
use crate::state::{StateReader, StateWriter};
use crate::Result;

use super::{ram_offset, saved_bank, RAM_BANK_SIZE, ROM_BANK_SIZE};

/// MBC1 bank controller.
///
/// A 5-bit register selects the switchable ROM bank (zero reads as one), a
/// 2-bit register supplies either the upper ROM bank bits or the RAM bank,
/// and the mode flip-flop decides which of the two areas the 2-bit register
/// also applies to:
/// - mode 0: ROM 0x4000-0x7FFF uses both registers, 0x0000-0x3FFF and RAM use
///   bank 0.
/// - mode 1: the 2-bit register also banks 0x0000-0x3FFF and selects the RAM
///   bank.
#[derive(Clone, Debug)]
pub(super) struct Mbc1 {
    rom: Rom,
    ram: Ram,
    ram_enabled: bool,
    mode: bool,
    bank1: u8,
    bank2: u8,
}

impl Mbc1 {
    pub(super) fn new(rom: &[u8], ram_size: usize) -> Self {
        Self {
            rom: Rom::new(rom),
            ram: Ram::new(ram_size),
            ram_enabled: false,
            mode: false,
            bank1: 1,
            bank2: 0,
        }
    }

    fn rom_index(&self, bank: usize, address: u16) -> usize {
        (bank * ROM_BANK_SIZE + (address as usize % ROM_BANK_SIZE)) % self.rom.size()
    }

    fn ram_index(&self, offset: usize) -> Option<usize> {
        if !self.ram_enabled || self.ram.size() == 0 {
            return None;
        }
        let bank = if self.mode { self.bank2 as usize } else { 0 };
        Some((bank * RAM_BANK_SIZE + offset) % self.ram.size())
    }

    pub(super) fn read(&self, address: u16) -> Option<u8> {
        match address {
            0x0000..=0x3FFF => {
                let bank = if self.mode { (self.bank2 as usize) << 5 } else { 0 };
                Some(self.rom.read(self.rom_index(bank, address)))
            }
            0x4000..=0x7FFF => {
                let bank = (self.bank2 as usize) << 5 | self.bank1 as usize;
                Some(self.rom.read(self.rom_index(bank, address)))
            }
            _ => ram_offset(address)
                .and_then(|offset| self.ram_index(offset))
                .map(|i| self.ram.read(i)),
        }
    }

    pub(super) fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.bank1 = value & 0x1F;
                if self.bank1 == 0 {
                    self.bank1 = 1;
                }
            }
            0x4000..=0x5FFF => self.bank2 = value & 0x03,
            0x6000..=0x7FFF => self.mode = value & 0x01 != 0,
            _ => {
                if let Some(i) = ram_offset(address).and_then(|offset| self.ram_index(offset)) {
                    self.ram.write(i, value);
                }
            }
        }
    }

    pub(super) fn ram(&self) -> &[u8] {
        self.ram.as_slice()
    }

    pub(super) fn load_ram(&mut self, data: &[u8]) {
        self.ram.load(data);
    }

    pub(super) fn save(&self, w: &mut StateWriter) {
        w.bool(self.ram_enabled);
        w.bool(self.mode);
        w.u8(self.bank1);
        w.u8(self.bank2);
    }

    pub(super) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.ram_enabled = r.bool()?;
        self.mode = r.bool()?;
        self.bank1 = saved_bank("MBC1 ROM bank", r.u8()? as usize, 1..=0x1F)? as u8;
        self.bank2 = saved_bank("MBC1 upper bank", r.u8()? as usize, 0..=0x03)? as u8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64 banks (1 MiB) whose bytes all equal their bank number.
    fn mbc1(ram_size: usize) -> Mbc1 {
        let mut rom = vec![0u8; 64 * ROM_BANK_SIZE];
        for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE).enumerate() {
            chunk.fill(bank as u8);
        }
        Mbc1::new(&rom, ram_size)
    }

    #[test]
    fn bank_zero_selects_bank_one() {
        let mut m = mbc1(0);
        assert_eq!(m.read(0x4000), Some(1));
        m.write(0x2000, 0x00);
        assert_eq!(m.read(0x4000), Some(1));
        m.write(0x2000, 0x07);
        assert_eq!(m.read(0x7FFF), Some(7));
        // Only the low five bits count: 0x20 behaves like zero.
        m.write(0x2000, 0x20);
        assert_eq!(m.read(0x4000), Some(1));
    }

    #[test]
    fn secondary_register_extends_rom_bank() {
        let mut m = mbc1(0);
        m.write(0x2000, 0x02);
        m.write(0x4000, 0x01);
        assert_eq!(m.read(0x4000), Some(0x22));
        // Mode 0 keeps the low area on bank 0.
        assert_eq!(m.read(0x0000), Some(0));
        m.write(0x6000, 0x01);
        assert_eq!(m.read(0x0000), Some(0x20));
    }

    #[test]
    fn ram_is_gated_by_enable_latch() {
        let mut m = mbc1(0x8000);
        m.write(0xA000, 0x12);
        assert_eq!(m.read(0xA000), None);
        m.write(0x0000, 0x0A);
        m.write(0xA000, 0x12);
        assert_eq!(m.read(0xA000), Some(0x12));
        m.write(0x0000, 0x00);
        assert_eq!(m.read(0xA000), None);
    }

    #[test]
    fn ram_bank_only_switches_in_mode_one() {
        let mut m = mbc1(0x8000);
        m.write(0x0000, 0x0A);
        m.write(0x4000, 0x02);
        m.write(0xA000, 0x11);
        assert_eq!(m.ram()[0], 0x11);
        m.write(0x6000, 0x01);
        m.write(0xA000, 0x22);
        assert_eq!(m.ram()[2 * RAM_BANK_SIZE], 0x22);
        assert_eq!(m.read(0xA000), Some(0x22));
    }
}
