use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use typed_builder::TypedBuilder;

use crate::address_map::{
    ECHO_RAM_END, ECHO_RAM_START, HIGH_RAM_SIZE, HIGH_RAM_START, WORK_RAM_SIZE, WORK_RAM_START,
};
use crate::cpu::{Cpu, InterruptLines, InterruptRegisters, InterruptSink};
use crate::{Error, Result};

use super::boot_rom::builtin_boot_program;
use super::{BootRomController, Bus, Cartridge, Joypad, LcdController, Ram, RamWindow, Timer};

/// Construction-time settings of a [`Machine`].
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct MachineOptions {
    /// 256-byte boot ROM image; a minimal built-in program is used otherwise.
    #[builder(default, setter(strip_option))]
    pub boot_rom: Option<Vec<u8>>,
    /// Battery-backed cartridge RAM to preload.
    #[builder(default, setter(strip_option))]
    pub battery_ram: Option<Vec<u8>>,
}

/// The whole console: CPU, bus and every device, driven by one cycle
/// counter.
///
/// Each cycle steps the timer, then OAM DMA and the display controller, then
/// the CPU, so interrupts raised during a cycle are seen by the CPU in the
/// same cycle.
pub struct Machine {
    pub(super) cycles: u64,
    pub(super) bus: Bus,
    pub(super) cpu: Cpu,
    pub(super) interrupts: Rc<InterruptLines>,
    pub(super) boot: Rc<RefCell<BootRomController>>,
    pub(super) cartridge: Rc<RefCell<Cartridge>>,
    pub(super) work_ram: Rc<RefCell<Ram>>,
    pub(super) high_ram: Rc<RefCell<Ram>>,
    pub(super) lcd: Rc<RefCell<LcdController>>,
    pub(super) timer: Rc<RefCell<Timer>>,
    pub(super) joypad: Rc<RefCell<Joypad>>,
}

impl Machine {
    /// Builds a machine around the cartridge image `rom`, starting at cycle 0
    /// with the boot ROM mapped.
    pub fn new(rom: &[u8], options: MachineOptions) -> Result<Self> {
        let mut cartridge = Cartridge::from_bytes(rom)?;
        if let Some(ram) = &options.battery_ram {
            cartridge.load_ram(ram)?;
        }
        let cartridge = Rc::new(RefCell::new(cartridge));

        let boot_rom = match &options.boot_rom {
            Some(image) => BootRomController::new(image, cartridge.clone())?,
            None => BootRomController::new(&builtin_boot_program(), cartridge.clone())?,
        };
        let boot = Rc::new(RefCell::new(boot_rom));

        let interrupts = Rc::new(InterruptLines::default());
        let sink = InterruptSink::new(interrupts.clone());

        let work_ram = Rc::new(RefCell::new(Ram::new(WORK_RAM_SIZE)));
        let high_ram = Rc::new(RefCell::new(Ram::new(HIGH_RAM_SIZE)));
        let lcd = Rc::new(RefCell::new(LcdController::new(sink.clone())));
        let timer = Rc::new(RefCell::new(Timer::new(sink.clone())));
        let joypad = Rc::new(RefCell::new(Joypad::new(sink)));

        let mut bus = Bus::new();
        bus.attach(&boot);
        bus.attach(&Rc::new(RefCell::new(RamWindow::new(
            work_ram.clone(),
            WORK_RAM_START,
        ))));
        bus.attach(&Rc::new(RefCell::new(RamWindow::with_end(
            work_ram.clone(),
            ECHO_RAM_START,
            ECHO_RAM_END as u32,
        ))));
        bus.attach(&lcd);
        bus.attach(&timer);
        bus.attach(&joypad);
        bus.attach(&Rc::new(RefCell::new(InterruptRegisters::new(
            interrupts.clone(),
        ))));
        bus.attach(&Rc::new(RefCell::new(RamWindow::new(
            high_ram.clone(),
            HIGH_RAM_START,
        ))));

        Ok(Self {
            cycles: 0,
            bus,
            cpu: Cpu::new(interrupts.clone()),
            interrupts,
            boot,
            cartridge,
            work_ram,
            high_ram,
            lcd,
            timer,
            joypad,
        })
    }

    /// Runs every cycle before `cycle`.
    ///
    /// Asking for a cycle that has already passed is a
    /// [`SchedulingViolation`](Error::SchedulingViolation); the machine is
    /// left untouched.
    pub fn run_until(&mut self, cycle: u64) -> Result<()> {
        if cycle < self.cycles {
            return Err(Error::SchedulingViolation {
                requested: cycle,
                current: self.cycles,
            });
        }
        while self.cycles < cycle {
            self.step();
        }
        Ok(())
    }

    fn step(&mut self) {
        let cycle = self.cycles;
        self.timer.borrow_mut().cycle();
        self.step_dma();
        self.lcd.borrow_mut().cycle(cycle);
        self.cpu.cycle(cycle, &self.bus);
        self.cycles += 1;
    }

    /// Copies one byte of a running OAM DMA transfer.
    fn step_dma(&mut self) {
        let source = self.lcd.borrow().dma_source();
        if let Some(address) = source {
            let value = self.bus.read(address);
            self.lcd.borrow_mut().dma_store(value);
        }
    }

    /// Cycles run so far; the next cycle to execute.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// # Panics
    /// If the display controller is already mutably borrowed.
    pub fn lcd(&self) -> Ref<'_, LcdController> {
        self.lcd.borrow()
    }

    pub fn timer(&self) -> Ref<'_, Timer> {
        self.timer.borrow()
    }

    /// Key input goes through the returned handle.
    pub fn joypad(&self) -> RefMut<'_, Joypad> {
        self.joypad.borrow_mut()
    }

    pub fn cartridge(&self) -> Ref<'_, Cartridge> {
        self.cartridge.borrow()
    }

    pub fn is_boot_rom_mapped(&self) -> bool {
        !self.boot.borrow().is_disabled()
    }
}
