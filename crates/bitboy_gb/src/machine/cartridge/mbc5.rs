use crate::machine::{Ram, Rom};
use crate::state::{StateReader, StateWriter};
use crate::Result;

use super::{ram_offset, saved_bank, RAM_BANK_SIZE, ROM_BANK_SIZE};

/// MBC5 bank controller: 9-bit ROM bank (bank 0 is allowed in the
/// switchable area), 4-bit RAM bank, RAM enable latch. Rumble is not
/// modelled.
#[derive(Clone, Debug)]
pub(super) struct Mbc5 {
    rom: Rom,
    ram: Ram,
    ram_enabled: bool,
    rom_bank: u16,
    ram_bank: u8,
}

impl Mbc5 {
    pub(super) fn new(rom: &[u8], ram_size: usize) -> Self {
        Self {
            rom: Rom::new(rom),
            ram: Ram::new(ram_size),
            ram_enabled: false,
            rom_bank: 1,
            ram_bank: 0,
        }
    }

    fn ram_index(&self, offset: usize) -> Option<usize> {
        if !self.ram_enabled || self.ram.size() == 0 {
            return None;
        }
        Some((self.ram_bank as usize * RAM_BANK_SIZE + offset) % self.ram.size())
    }

    pub(super) fn read(&self, address: u16) -> Option<u8> {
        match address {
            0x0000..=0x3FFF => Some(self.rom.read(address as usize)),
            0x4000..=0x7FFF => {
                let index = self.rom_bank as usize * ROM_BANK_SIZE + (address as usize - 0x4000);
                Some(self.rom.read(index % self.rom.size()))
            }
            _ => ram_offset(address)
                .and_then(|offset| self.ram_index(offset))
                .map(|i| self.ram.read(i)),
        }
    }

    pub(super) fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x100) | value as u16,
            0x3000..=0x3FFF => {
                self.rom_bank = (self.rom_bank & 0x0FF) | ((value as u16 & 0x01) << 8)
            }
            0x4000..=0x5FFF => self.ram_bank = value & 0x0F,
            0x6000..=0x7FFF => {}
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
        w.u16(self.rom_bank);
        w.u8(self.ram_bank);
    }

    pub(super) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.ram_enabled = r.bool()?;
        self.rom_bank = saved_bank("MBC5 ROM bank", r.u16()? as usize, 0..=0x1FF)? as u16;
        self.ram_bank = saved_bank("MBC5 RAM bank", r.u8()? as usize, 0..=0x0F)? as u8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_bit_rom_bank_and_bank_zero() {
        let mut rom = vec![0u8; 512 * ROM_BANK_SIZE];
        for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE).enumerate() {
            chunk.fill((bank >> 1) as u8);
        }
        let mut m = Mbc5::new(&rom, 0);
        m.write(0x2000, 0x00);
        assert_eq!(m.read(0x4000), Some(0));
        m.write(0x2000, 0x10);
        m.write(0x3000, 0x01);
        assert_eq!(m.read(0x4000), Some((0x110 >> 1) as u8));
    }

    #[test]
    fn ram_banks() {
        let mut m = Mbc5::new(&vec![0u8; 2 * ROM_BANK_SIZE], 4 * RAM_BANK_SIZE);
        m.write(0x0000, 0x0A);
        m.write(0x4000, 0x03);
        m.write(0xBFFF, 0x44);
        assert_eq!(m.ram()[4 * RAM_BANK_SIZE - 1], 0x44);
        m.write(0x4000, 0x00);
        assert_eq!(m.read(0xBFFF), Some(0));
    }
}
