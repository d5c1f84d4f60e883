use crate::address_map::CARTRIDGE_ROM_END;
use crate::machine::Rom;
use crate::{Error, Result};

/// Unbanked 32 KiB cartridge: the ROM is mapped as is, there is no RAM.
#[derive(Clone, Debug)]
pub(super) struct Mbc0 {
    rom: Rom,
}

impl Mbc0 {
    pub(super) const ROM_SIZE: usize = CARTRIDGE_ROM_END as usize;

    pub(super) fn new(rom: &[u8]) -> Result<Self> {
        if rom.len() != Self::ROM_SIZE {
            return Err(Error::InvalidRomSize {
                len: rom.len(),
                reason: "unbanked images must be exactly 32 KiB",
            });
        }
        Ok(Self { rom: Rom::new(rom) })
    }

    pub(super) fn read(&self, address: u16) -> Option<u8> {
        (address < CARTRIDGE_ROM_END).then(|| self.rom.read(address as usize))
    }
}
