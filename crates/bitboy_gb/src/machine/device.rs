/// Capability shared by every memory-mapped unit.
///
/// A device answers only for the addresses it owns: `read` returns `None`
/// for anything else, and `write` silently ignores foreign addresses. This
/// is normal behaviour and lets the [`Bus`](super::Bus) broadcast every
/// access without knowing the memory map.
pub trait Device {
    fn read(&self, address: u16) -> Option<u8>;
    fn write(&mut self, address: u16, value: u8);
}
