pub mod address_map;
pub mod cpu;
mod error;
pub mod machine;
pub mod register_file;
pub(crate) mod state;

pub use error::{Error, Result};
pub use machine::{Machine, MachineOptions};

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;

/// Machine cycles per second (one cycle is four clock ticks).
pub const CYCLES_PER_SECOND: u64 = 1 << 20;
/// Machine cycles spent on one scanline.
pub const LINE_CYCLES: u64 = 114;
/// Machine cycles in one full frame (144 visible lines plus 10 V-blank lines).
pub const CYCLES_PER_FRAME: u64 = 154 * LINE_CYCLES;
