use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the emulation core.
///
/// Out-of-range addresses and values cannot be expressed through the `u16` /
/// `u8` based API; internal contract violations (bad bit indices, mismatched
/// vector lengths) panic instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported cartridge type 0x{0:02X}")]
    UnsupportedCartridge(u8),

    #[error("unsupported cartridge RAM size code 0x{0:02X}")]
    UnsupportedRamSize(u8),

    #[error("cartridge image is truncated ({len} bytes, header needs {needed})")]
    TruncatedRom { len: usize, needed: usize },

    #[error("cartridge image of {len} bytes is invalid: {reason}")]
    InvalidRomSize { len: usize, reason: &'static str },

    #[error("boot ROM must be {expected} bytes, got {len}")]
    InvalidBootRom { len: usize, expected: usize },

    #[error("RAM image is {found} bytes but the cartridge has {expected}")]
    RamSizeMismatch { expected: usize, found: usize },

    #[error("data is not a save state")]
    StateMagic,

    #[error("unsupported save-state version {found} (expected {expected})")]
    StateVersion { found: u8, expected: u8 },

    #[error("save state is truncated")]
    StateTruncated,

    #[error("save state has {0} unexpected trailing bytes")]
    StateTrailing(usize),

    #[error("save state {what} mismatch: expected {expected}, found {found}")]
    StateMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("cannot run until cycle {requested}: machine is already at cycle {current}")]
    SchedulingViolation { requested: u64, current: u64 },
}
