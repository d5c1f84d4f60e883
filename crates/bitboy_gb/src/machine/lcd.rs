//! Display controller: register block, video memories and the per-scanline
//! mode state machine.

mod image;
mod line;
mod render;


use bitflags::bitflags;

use crate::address_map::{
    OAM_END, OAM_SIZE, OAM_START, REGS_LCDC_END, REGS_LCDC_START, VIDEO_RAM_END, VIDEO_RAM_SIZE,
    VIDEO_RAM_START,
};
use crate::cpu::{Interrupt, InterruptSink};
use crate::register_file::{register_set, RegisterFile};
use crate::state::{StateReader, StateWriter};
use crate::{Error, Result, SCREEN_HEIGHT, SCREEN_WIDTH};

use super::{Device, Ram};

pub use image::{LcdImage, LcdImageBuilder};
pub use line::{LcdImageLine, LcdImageLineBuilder};

register_set! {
    /// Display registers, mapped from 0xFF40 in this order.
    pub enum LcdReg { Lcdc, Stat, Scy, Scx, Ly, Lyc, Dma, Bgp, Obp0, Obp1, Wy, Wx }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Lcdc: u8 {
        /// Background and window; both are blank when clear.
        const BG = 1 << 0;
        const OBJ = 1 << 1;
        const OBJ_SIZE = 1 << 2;
        const BG_AREA = 1 << 3;
        const TILE_SOURCE = 1 << 4;
        const WIN = 1 << 5;
        const WIN_AREA = 1 << 6;
        const STATUS = 1 << 7;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Stat: u8 {
        const MODE0 = 1 << 0;
        const MODE1 = 1 << 1;
        const LYC_EQ_LY = 1 << 2;
        const INT_MODE0 = 1 << 3;
        const INT_MODE1 = 1 << 4;
        const INT_MODE2 = 1 << 5;
        const INT_LYC = 1 << 6;
    }
}

const STAT_MODE: u8 = 0b11;
const STAT_WRITABLE: u8 = 0b0111_1000;
/// Bit 7 of STAT does not exist and reads as one.
const STAT_UNUSED: u8 = 0x80;

const VISIBLE_LINES: u8 = SCREEN_HEIGHT as u8;
const LAST_LINE: u8 = 153;

const MODE2_CYCLES: u64 = 20;
const MODE3_CYCLES: u64 = 43;
const MODE0_CYCLES: u64 = 51;
const LINE_CYCLES: u64 = MODE2_CYCLES + MODE3_CYCLES + MODE0_CYCLES;

/// Controller modes, numbered as in STAT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    PixelTransfer = 3,
}

impl Mode {
    fn from_stat(stat: u8) -> Self {
        match stat & STAT_MODE {
            0 => Mode::HBlank,
            1 => Mode::VBlank,
            2 => Mode::OamScan,
            _ => Mode::PixelTransfer,
        }
    }

    /// STAT bit that makes entering this mode raise an interrupt.
    fn interrupt_flag(self) -> Option<Stat> {
        match self {
            Mode::HBlank => Some(Stat::INT_MODE0),
            Mode::VBlank => Some(Stat::INT_MODE1),
            Mode::OamScan => Some(Stat::INT_MODE2),
            Mode::PixelTransfer => None,
        }
    }
}

/// OAM DMA in progress: the next byte to copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Dma {
    source: u16,
    index: u8,
}

#[derive(Clone, Debug)]
pub struct LcdController {
    regs: RegisterFile<LcdReg, 12>,
    vram: Ram,
    oam: Ram,
    next_non_idle_cycle: u64,
    /// Line of the window drawn next.
    win_y: u8,
    next_image: LcdImageBuilder,
    current_image: LcdImage,
    dma: Option<Dma>,
    sink: InterruptSink,
}

impl LcdController {
    pub fn new(sink: InterruptSink) -> Self {
        let mut regs = RegisterFile::new();
        // LY and LYC both start at zero.
        regs.set(LcdReg::Stat, Stat::LYC_EQ_LY.bits());
        Self {
            regs,
            vram: Ram::new(VIDEO_RAM_SIZE),
            oam: Ram::new(OAM_SIZE),
            next_non_idle_cycle: u64::MAX,
            win_y: 0,
            next_image: LcdImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            current_image: LcdImage::blank(SCREEN_WIDTH, SCREEN_HEIGHT),
            dma: None,
            sink,
        }
    }

    /// Advances the state machine to `cycle`.
    pub fn cycle(&mut self, cycle: u64) {
        if self.next_non_idle_cycle == u64::MAX && self.lcdc().contains(Lcdc::STATUS) {
            self.set_mode(Mode::OamScan);
            self.update_ly_lyc();
            self.next_non_idle_cycle = cycle + MODE2_CYCLES;
            return;
        }
        if cycle >= self.next_non_idle_cycle {
            self.step();
        }
    }

    fn step(&mut self) {
        let ly = self.reg(LcdReg::Ly);
        match self.mode() {
            Mode::OamScan => {
                let line = self.render_line(ly);
                self.next_image.set_line(ly as usize, line);
                self.set_mode(Mode::PixelTransfer);
                self.next_non_idle_cycle += MODE3_CYCLES;
            }
            Mode::PixelTransfer => {
                self.set_mode(Mode::HBlank);
                self.next_non_idle_cycle += MODE0_CYCLES;
            }
            Mode::HBlank if ly == VISIBLE_LINES - 1 => {
                self.set_ly(VISIBLE_LINES);
                self.set_mode(Mode::VBlank);
                self.publish_image();
                self.next_non_idle_cycle += LINE_CYCLES;
            }
            Mode::HBlank => {
                self.set_ly(ly + 1);
                self.set_mode(Mode::OamScan);
                self.next_non_idle_cycle += MODE2_CYCLES;
            }
            Mode::VBlank if ly == LAST_LINE => {
                self.set_ly(0);
                self.win_y = 0;
                self.set_mode(Mode::OamScan);
                self.next_non_idle_cycle += MODE2_CYCLES;
            }
            Mode::VBlank => {
                self.set_ly(ly + 1);
                self.next_non_idle_cycle += LINE_CYCLES;
            }
        }
    }

    fn publish_image(&mut self) {
        let builder = std::mem::replace(
            &mut self.next_image,
            LcdImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT),
        );
        self.current_image = builder.build();
        log::trace!("frame complete");
    }

    /// Last complete frame; blank until the first one is drawn.
    pub fn current_image(&self) -> &LcdImage {
        &self.current_image
    }

    pub fn reg(&self, reg: LcdReg) -> u8 {
        self.regs.get(reg)
    }

    pub fn lcdc(&self) -> Lcdc {
        Lcdc::from_bits_truncate(self.reg(LcdReg::Lcdc))
    }

    pub fn stat(&self) -> Stat {
        Stat::from_bits_truncate(self.reg(LcdReg::Stat))
    }

    pub fn mode(&self) -> Mode {
        Mode::from_stat(self.reg(LcdReg::Stat))
    }

    pub fn ly(&self) -> u8 {
        self.reg(LcdReg::Ly)
    }

    pub fn next_non_idle_cycle(&self) -> u64 {
        self.next_non_idle_cycle
    }

    fn set_mode(&mut self, mode: Mode) {
        let stat = self.reg(LcdReg::Stat);
        self.regs.set(LcdReg::Stat, (stat & !STAT_MODE) | mode as u8);
        if mode == Mode::VBlank {
            self.sink.request(Interrupt::VBLANK);
        }
        if let Some(flag) = mode.interrupt_flag() {
            if self.stat().contains(flag) {
                self.sink.request(Interrupt::LCD_STAT);
            }
        }
    }

    fn set_ly(&mut self, ly: u8) {
        self.regs.set(LcdReg::Ly, ly);
        self.update_ly_lyc();
    }

    fn update_ly_lyc(&mut self) {
        let equal = self.reg(LcdReg::Ly) == self.reg(LcdReg::Lyc);
        let mut stat = self.stat();
        stat.set(Stat::LYC_EQ_LY, equal);
        self.regs.set(LcdReg::Stat, stat.bits());
        if equal && stat.contains(Stat::INT_LYC) {
            self.sink.request(Interrupt::LCD_STAT);
        }
    }

    fn write_reg(&mut self, reg: LcdReg, value: u8) {
        match reg {
            LcdReg::Lcdc => {
                let was_on = self.lcdc().contains(Lcdc::STATUS);
                self.regs.set(LcdReg::Lcdc, value);
                let on = self.lcdc().contains(Lcdc::STATUS);
                if was_on && !on {
                    log::debug!("LCD off");
                    let stat = self.reg(LcdReg::Stat);
                    self.regs.set(LcdReg::Stat, stat & !STAT_MODE);
                    self.set_ly(0);
                    self.win_y = 0;
                    self.next_non_idle_cycle = u64::MAX;
                } else if !was_on && on {
                    log::debug!("LCD on");
                }
            }
            LcdReg::Stat => {
                let stat = self.reg(LcdReg::Stat);
                self.regs.set(
                    LcdReg::Stat,
                    (stat & !STAT_WRITABLE) | (value & STAT_WRITABLE),
                );
            }
            LcdReg::Ly => {}
            LcdReg::Lyc => {
                self.regs.set(LcdReg::Lyc, value);
                self.update_ly_lyc();
            }
            LcdReg::Dma => {
                self.regs.set(LcdReg::Dma, value);
                self.dma = Some(Dma {
                    source: (value as u16) << 8,
                    index: 0,
                });
            }
            _ => self.regs.set(reg, value),
        }
    }

    /// Bus address of the next byte an active OAM DMA copies.
    pub fn dma_source(&self) -> Option<u16> {
        self.dma.map(|dma| dma.source + dma.index as u16)
    }

    /// Stores the byte read from [`dma_source`](Self::dma_source) and moves
    /// on; the transfer ends after the last OAM byte.
    pub fn dma_store(&mut self, value: u8) {
        if let Some(dma) = &mut self.dma {
            self.oam.write(dma.index as usize, value);
            dma.index += 1;
            if dma.index as usize == OAM_SIZE {
                self.dma = None;
            }
        }
    }

    pub(crate) fn save(&self, w: &mut StateWriter) {
        w.raw(self.regs.as_bytes());
        w.raw(self.vram.as_slice());
        w.raw(self.oam.as_slice());
        w.u64(self.next_non_idle_cycle);
        w.u8(self.win_y);
        match self.dma {
            Some(dma) => {
                w.bool(true);
                w.u16(dma.source);
                w.u8(dma.index);
            }
            None => w.bool(false),
        }
    }

    pub(crate) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.regs.load_bytes(r.array::<12>()?);
        self.vram.load(r.raw(VIDEO_RAM_SIZE)?);
        self.oam.load(r.raw(OAM_SIZE)?);
        self.next_non_idle_cycle = r.u64()?;
        self.win_y = r.u8()?;
        self.dma = if r.bool()? {
            let source = r.u16()?;
            let index = r.u8()?;
            if index as usize >= OAM_SIZE {
                return Err(Error::StateMismatch {
                    what: "OAM DMA position",
                    expected: OAM_SIZE - 1,
                    found: index as usize,
                });
            }
            Some(Dma { source, index })
        } else {
            None
        };
        Ok(())
    }
}

/// Part of the controller an address falls into.
enum Region {
    Vram(usize),
    Oam(usize),
    Reg(LcdReg),
}

fn region(address: u16) -> Option<Region> {
    let offset = |start: u16| (address - start) as usize;
    if (VIDEO_RAM_START..VIDEO_RAM_END).contains(&address) {
        Some(Region::Vram(offset(VIDEO_RAM_START)))
    } else if (OAM_START..OAM_END).contains(&address) {
        Some(Region::Oam(offset(OAM_START)))
    } else if (REGS_LCDC_START..REGS_LCDC_END).contains(&address) {
        Some(Region::Reg(LcdReg::ALL[offset(REGS_LCDC_START)]))
    } else {
        None
    }
}

impl Device for LcdController {
    fn read(&self, address: u16) -> Option<u8> {
        match region(address)? {
            Region::Vram(i) => Some(self.vram.read(i)),
            Region::Oam(i) => Some(self.oam.read(i)),
            Region::Reg(LcdReg::Stat) => Some(self.reg(LcdReg::Stat) | STAT_UNUSED),
            Region::Reg(reg) => Some(self.reg(reg)),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match region(address) {
            Some(Region::Vram(i)) => self.vram.write(i, value),
            Some(Region::Oam(i)) => self.oam.write(i, value),
            Some(Region::Reg(reg)) => self.write_reg(reg, value),
            None => {}
        }
    }
}
