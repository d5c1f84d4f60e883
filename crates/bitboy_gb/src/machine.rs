//! Memory-mapped devices and the machine that wires them together.

mod boot_rom;
mod bus;
pub mod cartridge;
mod device;
pub mod joypad;
pub mod lcd;
mod memory;
mod snapshot;
mod system;
pub mod timer;

pub use boot_rom::BootRomController;
pub use bus::Bus;
pub use cartridge::{Cartridge, ControllerKind};
pub use device::Device;
pub use joypad::{Joypad, Key};
pub use lcd::{LcdController, LcdImage, LcdImageLine};
pub use memory::{Ram, RamWindow, Rom};
pub use system::{Machine, MachineOptions};
pub use timer::Timer;
