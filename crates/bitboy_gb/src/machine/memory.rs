use std::cell::RefCell;
use std::rc::Rc;

use super::Device;

/// Flat, writable byte array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ram {
    data: Box<[u8]>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// # Panics
    /// If `index` is out of bounds.
    #[inline]
    pub fn read(&self, index: usize) -> u8 {
        self.data[index]
    }

    /// # Panics
    /// If `index` is out of bounds.
    #[inline]
    pub fn write(&mut self, index: usize, value: u8) {
        self.data[index] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// # Panics
    /// If `bytes` differs in length from the RAM.
    pub fn load(&mut self, bytes: &[u8]) {
        self.data.copy_from_slice(bytes);
    }
}

/// Read-only byte array, copied at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    data: Box<[u8]>,
}

impl Rom {
    pub fn new(data: &[u8]) -> Self {
        Self { data: data.into() }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// # Panics
    /// If `index` is out of bounds.
    #[inline]
    pub fn read(&self, index: usize) -> u8 {
        self.data[index]
    }
}

/// Maps a shared [`Ram`] into the address range `[start, end)`.
///
/// Two windows over the same RAM give mirrored address ranges backed by a
/// single buffer.
#[derive(Clone, Debug)]
pub struct RamWindow {
    ram: Rc<RefCell<Ram>>,
    start: u16,
    end: u32,
}

impl RamWindow {
    /// Window covering the whole RAM, starting at `start`.
    ///
    /// # Panics
    /// If the RAM does not fit below the end of the address space.
    pub fn new(ram: Rc<RefCell<Ram>>, start: u16) -> Self {
        let end = start as u32 + ram.borrow().size() as u32;
        Self::with_end(ram, start, end)
    }

    /// Window over the first `end - start` bytes of the RAM.
    ///
    /// # Panics
    /// If the range is empty, reversed, past the address space or larger
    /// than the RAM.
    pub fn with_end(ram: Rc<RefCell<Ram>>, start: u16, end: u32) -> Self {
        assert!(start as u32 <= end, "window end before start");
        assert!(end <= 0x1_0000, "window end 0x{end:X} past the address space");
        assert!(
            (end - start as u32) as usize <= ram.borrow().size(),
            "window larger than its RAM"
        );
        Self { ram, start, end }
    }

    #[inline]
    fn offset(&self, address: u16) -> Option<usize> {
        let address = address as u32;
        (self.start as u32..self.end)
            .contains(&address)
            .then(|| (address - self.start as u32) as usize)
    }
}

impl Device for RamWindow {
    fn read(&self, address: u16) -> Option<u8> {
        self.offset(address).map(|i| self.ram.borrow().read(i))
    }

    fn write(&mut self, address: u16, value: u8) {
        if let Some(i) = self.offset(address) {
            self.ram.borrow_mut().write(i, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_copies_its_input() {
        let mut source = vec![1, 2, 3];
        let rom = Rom::new(&source);
        source[0] = 9;
        assert_eq!(rom.read(0), 1);
        assert_eq!(rom.size(), 3);
    }

    #[test]
    #[should_panic]
    fn ram_access_is_bounds_checked() {
        Ram::new(4).read(4);
    }

    #[test]
    fn window_maps_relative_offsets() {
        let ram = Rc::new(RefCell::new(Ram::new(0x20)));
        let mut window = RamWindow::new(ram.clone(), 0x1000);
        assert_eq!(window.read(0x0FFF), None);
        assert_eq!(window.read(0x1020), None);
        window.write(0x1005, 0xAB);
        assert_eq!(ram.borrow().read(5), 0xAB);
        assert_eq!(window.read(0x1005), Some(0xAB));
    }

    #[test]
    fn two_windows_mirror_one_buffer() {
        let ram = Rc::new(RefCell::new(Ram::new(0x2000)));
        let mut primary = RamWindow::new(ram.clone(), 0xC000);
        let mut echo = RamWindow::with_end(ram, 0xE000, 0xFE00);

        primary.write(0xC123, 0x11);
        assert_eq!(echo.read(0xE123), Some(0x11));
        echo.write(0xFDFF, 0x22);
        assert_eq!(primary.read(0xDDFF), Some(0x22));
        assert_eq!(echo.read(0xFE00), None);
    }

    #[test]
    fn window_may_end_at_top_of_address_space() {
        let ram = Rc::new(RefCell::new(Ram::new(0x10)));
        let mut window = RamWindow::new(ram, 0xFFF0);
        window.write(0xFFFF, 7);
        assert_eq!(window.read(0xFFFF), Some(7));
    }
}
