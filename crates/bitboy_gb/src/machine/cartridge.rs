mod mbc0;
mod mbc1;
mod mbc5;

use std::fmt;
use std::ops::RangeInclusive;

use crate::address_map::{CARTRIDGE_RAM_END, CARTRIDGE_RAM_START};
use crate::state::{StateReader, StateWriter};
use crate::{Error, Result};

use super::Device;
use mbc0::Mbc0;
use mbc1::Mbc1;
use mbc5::Mbc5;

/// Header offset of the cartridge (controller) type byte.
pub const HEADER_CARTRIDGE_TYPE: usize = 0x147;
/// Header offset of the external RAM size code.
pub const HEADER_RAM_SIZE: usize = 0x149;
const HEADER_TITLE: std::ops::Range<usize> = 0x134..0x144;
const HEADER_END: usize = 0x150;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

const STATE_VERSION: u8 = 1;

/// Bank controller family found in the cartridge header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerKind {
    /// Plain 32 KiB ROM without banking.
    None,
    Mbc1,
    Mbc5,
}

impl ControllerKind {
    fn tag(self) -> u8 {
        match self {
            ControllerKind::None => 0,
            ControllerKind::Mbc1 => 1,
            ControllerKind::Mbc5 => 5,
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::None => f.write_str("ROM only"),
            ControllerKind::Mbc1 => f.write_str("MBC1"),
            ControllerKind::Mbc5 => f.write_str("MBC5"),
        }
    }
}

#[derive(Clone, Debug)]
enum Mbc {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc5(Mbc5),
}

/// Cartridge ROM plus the bank controller that maps it into the address
/// space (`0x0000..0x8000` for ROM, `0xA000..0xC000` for external RAM).
#[derive(Clone, Debug)]
pub struct Cartridge {
    mbc: Mbc,
}

/// External RAM size for a header code, in bytes.
fn ram_size(code: u8) -> Result<usize> {
    match code {
        0x00 => Ok(0),
        0x01 => Ok(0x800),
        0x02 => Ok(RAM_BANK_SIZE),
        0x03 => Ok(4 * RAM_BANK_SIZE),
        0x04 => Ok(16 * RAM_BANK_SIZE),
        0x05 => Ok(8 * RAM_BANK_SIZE),
        other => Err(Error::UnsupportedRamSize(other)),
    }
}

fn check_banked_rom_size(len: usize) -> Result<()> {
    if len < 2 * ROM_BANK_SIZE || len % ROM_BANK_SIZE != 0 {
        return Err(Error::InvalidRomSize {
            len,
            reason: "banked images must be a multiple of 16 KiB, at least 32 KiB",
        });
    }
    Ok(())
}

impl Cartridge {
    /// Builds the cartridge described by the header of `rom`.
    pub fn from_bytes(rom: &[u8]) -> Result<Self> {
        if rom.len() < HEADER_END {
            return Err(Error::TruncatedRom {
                len: rom.len(),
                needed: HEADER_END,
            });
        }

        let cart_type = rom[HEADER_CARTRIDGE_TYPE];
        let ram_code = rom[HEADER_RAM_SIZE];
        let mbc = match cart_type {
            0x00 => Mbc::Mbc0(Mbc0::new(rom)?),
            0x01..=0x03 => {
                check_banked_rom_size(rom.len())?;
                let ram = match ram_code {
                    0x00..=0x03 => ram_size(ram_code)?,
                    other => return Err(Error::UnsupportedRamSize(other)),
                };
                Mbc::Mbc1(Mbc1::new(rom, ram))
            }
            0x19..=0x1E => {
                check_banked_rom_size(rom.len())?;
                Mbc::Mbc5(Mbc5::new(rom, ram_size(ram_code)?))
            }
            other => return Err(Error::UnsupportedCartridge(other)),
        };

        let cartridge = Self { mbc };
        let title: String = rom[HEADER_TITLE]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
            .collect();
        log::info!(
            "Cartridge '{}': type 0x{:02X} ({}), {} KiB ROM, {} KiB RAM",
            title,
            cart_type,
            cartridge.kind(),
            rom.len() / 1024,
            cartridge.ram().len() / 1024,
        );
        Ok(cartridge)
    }

    pub fn kind(&self) -> ControllerKind {
        match self.mbc {
            Mbc::Mbc0(_) => ControllerKind::None,
            Mbc::Mbc1(_) => ControllerKind::Mbc1,
            Mbc::Mbc5(_) => ControllerKind::Mbc5,
        }
    }

    /// External (battery-backed) RAM contents.
    pub fn ram(&self) -> &[u8] {
        match &self.mbc {
            Mbc::Mbc0(_) => &[],
            Mbc::Mbc1(m) => m.ram(),
            Mbc::Mbc5(m) => m.ram(),
        }
    }

    /// Replaces the external RAM contents; the image must match its size.
    pub fn load_ram(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.ram().len();
        if data.len() != expected {
            return Err(Error::RamSizeMismatch {
                expected,
                found: data.len(),
            });
        }
        match &mut self.mbc {
            Mbc::Mbc0(_) => {}
            Mbc::Mbc1(m) => m.load_ram(data),
            Mbc::Mbc5(m) => m.load_ram(data),
        }
        Ok(())
    }

    /// Full controller state: latches, bank registers and RAM.
    pub fn save_state(&self) -> Vec<u8> {
        let mut w = StateWriter::new();
        w.u8(STATE_VERSION);
        w.u8(self.kind().tag());
        match &self.mbc {
            Mbc::Mbc0(_) => {}
            Mbc::Mbc1(m) => m.save(&mut w),
            Mbc::Mbc5(m) => m.save(&mut w),
        }
        w.block(self.ram());
        w.into_bytes()
    }

    /// Restores a blob produced by [`save_state`](Self::save_state) on a
    /// cartridge of the same kind and RAM size. Nothing changes on error.
    pub fn restore_state(&mut self, blob: &[u8]) -> Result<()> {
        let mut r = StateReader::new(blob);
        let version = r.u8()?;
        if version != STATE_VERSION {
            return Err(Error::StateVersion {
                found: version,
                expected: STATE_VERSION,
            });
        }
        let tag = r.u8()?;
        if tag != self.kind().tag() {
            return Err(Error::StateMismatch {
                what: "cartridge controller",
                expected: self.kind().tag() as usize,
                found: tag as usize,
            });
        }

        let mut mbc = self.mbc.clone();
        match &mut mbc {
            Mbc::Mbc0(_) => {}
            Mbc::Mbc1(m) => m.load(&mut r)?,
            Mbc::Mbc5(m) => m.load(&mut r)?,
        }
        let ram = r.block("cartridge RAM", self.ram().len())?;
        r.finish()?;

        match &mut mbc {
            Mbc::Mbc0(_) => {}
            Mbc::Mbc1(m) => m.load_ram(ram),
            Mbc::Mbc5(m) => m.load_ram(ram),
        }
        self.mbc = mbc;
        Ok(())
    }
}

impl Device for Cartridge {
    fn read(&self, address: u16) -> Option<u8> {
        match &self.mbc {
            Mbc::Mbc0(m) => m.read(address),
            Mbc::Mbc1(m) => m.read(address),
            Mbc::Mbc5(m) => m.read(address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match &mut self.mbc {
            Mbc::Mbc0(_) => {}
            Mbc::Mbc1(m) => m.write(address, value),
            Mbc::Mbc5(m) => m.write(address, value),
        }
    }
}

/// Offset inside the external RAM window, if `address` falls into it.
#[inline]
fn ram_offset(address: u16) -> Option<usize> {
    (CARTRIDGE_RAM_START..CARTRIDGE_RAM_END)
        .contains(&address)
        .then(|| (address - CARTRIDGE_RAM_START) as usize)
}

/// Rejects a saved bank register outside `range`.
fn saved_bank(what: &'static str, value: usize, range: RangeInclusive<usize>) -> Result<usize> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Error::StateMismatch {
            what,
            expected: *range.end(),
            found: value,
        })
    }
}
