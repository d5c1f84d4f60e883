use std::cell::RefCell;
use std::rc::Rc;

use crate::address_map::{BOOT_ROM_END, BOOT_ROM_SIZE, BOOT_ROM_START, REG_BOOT_ROM_DISABLE};
use crate::{Error, Result};

use super::{Cartridge, Device, Rom};

/// Minimal boot program used when no boot ROM image is supplied.
///
/// ```text
/// 0000  LD SP,$FFFE
/// 0003  LD A,$FC      ; standard palette
/// 0005  LDH ($47),A
/// 0007  LD A,$91      ; LCD on, BG on, tiles at $8000
/// 0009  LDH ($40),A
/// 000B  JP $00FC
/// 00FC  LD A,$01
/// 00FE  LDH ($50),A   ; unmap the boot ROM, execution continues at $0100
/// ```
pub(super) fn builtin_boot_program() -> [u8; BOOT_ROM_SIZE] {
    let mut rom = [0u8; BOOT_ROM_SIZE];
    let start = [
        0x31, 0xFE, 0xFF, // LD SP,$FFFE
        0x3E, 0xFC, // LD A,$FC
        0xE0, 0x47, // LDH ($47),A
        0x3E, 0x91, // LD A,$91
        0xE0, 0x40, // LDH ($40),A
        0xC3, 0xFC, 0x00, // JP $00FC
    ];
    rom[..start.len()].copy_from_slice(&start);
    rom[0xFC..].copy_from_slice(&[0x3E, 0x01, 0xE0, 0x50]);
    rom
}

/// Overlays the boot ROM on the start of cartridge space until the disable
/// register is written; afterwards every access goes to the cartridge.
#[derive(Debug)]
pub struct BootRomController {
    boot_rom: Rom,
    cartridge: Rc<RefCell<Cartridge>>,
    disabled: bool,
}

impl BootRomController {
    pub fn new(boot_rom: &[u8], cartridge: Rc<RefCell<Cartridge>>) -> Result<Self> {
        if boot_rom.len() != BOOT_ROM_SIZE {
            return Err(Error::InvalidBootRom {
                len: boot_rom.len(),
                expected: BOOT_ROM_SIZE,
            });
        }
        Ok(Self {
            boot_rom: Rom::new(boot_rom),
            cartridge,
            disabled: false,
        })
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(super) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn cartridge(&self) -> &Rc<RefCell<Cartridge>> {
        &self.cartridge
    }
}

impl Device for BootRomController {
    fn read(&self, address: u16) -> Option<u8> {
        if !self.disabled && (BOOT_ROM_START..BOOT_ROM_END).contains(&address) {
            return Some(self.boot_rom.read((address - BOOT_ROM_START) as usize));
        }
        self.cartridge.borrow().read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        if address == REG_BOOT_ROM_DISABLE && !self.disabled {
            log::debug!("Boot ROM disabled");
            self.disabled = true;
        }
        self.cartridge.borrow_mut().write(address, value);
    }
}
