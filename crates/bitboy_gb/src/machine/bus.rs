use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::address_map::OPEN_BUS;

use super::Device;

/// Fan-out interconnect between the CPU and the memory-mapped devices.
///
/// The bus only keeps shared handles: attaching a device registers it, the
/// caller keeps its own handle. Registration order is read priority.
#[derive(Default)]
pub struct Bus {
    devices: Vec<Rc<RefCell<dyn Device>>>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("devices", &self.devices.len())
            .finish()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach<D: Device + 'static>(&mut self, device: &Rc<RefCell<D>>) {
        let device: Rc<RefCell<dyn Device>> = device.clone();
        self.devices.push(device);
    }

    /// Value of the first device answering for `address`, or the open-bus
    /// value when nobody does.
    ///
    /// # Panics
    /// If an attached device is mutably borrowed elsewhere while the bus is
    /// accessed.
    pub fn read(&self, address: u16) -> u8 {
        self.devices
            .iter()
            .find_map(|device| device.borrow().read(address))
            .unwrap_or(OPEN_BUS)
    }

    /// Offers the write to every attached device.
    pub fn write(&self, address: u16, value: u8) {
        for device in &self.devices {
            device.borrow_mut().write(address, value);
        }
    }
}
