use crate::address_map::REG_P1;
use crate::cpu::{Interrupt, InterruptSink};
use crate::state::{StateReader, StateWriter};
use crate::Result;

use super::Device;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Key {
    /// Line bit of the key inside its group.
    fn bit(self) -> u8 {
        match self {
            Key::Right | Key::A => 1 << 0,
            Key::Left | Key::B => 1 << 1,
            Key::Up | Key::Select => 1 << 2,
            Key::Down | Key::Start => 1 << 3,
        }
    }

    fn is_direction(self) -> bool {
        matches!(self, Key::Right | Key::Left | Key::Up | Key::Down)
    }
}

/// Selection bit of the direction keys (0 selects).
const SELECT_DIRECTIONS: u8 = 1 << 4;
/// Selection bit of the buttons (0 selects).
const SELECT_BUTTONS: u8 = 1 << 5;
const SELECT_MASK: u8 = SELECT_DIRECTIONS | SELECT_BUTTONS;
/// Bits 7-6 do not exist and read as one.
const P1_UNUSED: u8 = 0xC0;

/// The P1 register and the state of the eight keys.
#[derive(Clone, Debug)]
pub struct Joypad {
    select: u8,
    directions: u8,
    buttons: u8,
    sink: InterruptSink,
}

impl Joypad {
    pub fn new(sink: InterruptSink) -> Self {
        Self {
            select: SELECT_MASK,
            directions: 0,
            buttons: 0,
            sink,
        }
    }

    pub fn press(&mut self, key: Key) {
        self.update(|pad| *pad.group(key) |= key.bit());
    }

    pub fn release(&mut self, key: Key) {
        self.update(|pad| *pad.group(key) &= !key.bit());
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        let group = if key.is_direction() { self.directions } else { self.buttons };
        group & key.bit() != 0
    }

    fn group(&mut self, key: Key) -> &mut u8 {
        if key.is_direction() {
            &mut self.directions
        } else {
            &mut self.buttons
        }
    }

    /// Active-high lines of the selected groups.
    fn lines(&self) -> u8 {
        let mut lines = 0;
        if self.select & SELECT_DIRECTIONS == 0 {
            lines |= self.directions;
        }
        if self.select & SELECT_BUTTONS == 0 {
            lines |= self.buttons;
        }
        lines
    }

    /// Applies `change` and raises the interrupt when a line goes low.
    fn update(&mut self, change: impl FnOnce(&mut Self)) {
        let before = self.lines();
        change(self);
        if !before & self.lines() != 0 {
            self.sink.request(Interrupt::JOYPAD);
        }
    }

    pub(crate) fn save(&self, w: &mut StateWriter) {
        w.u8(self.select);
        w.u8(self.directions);
        w.u8(self.buttons);
    }

    pub(crate) fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.select = r.u8()? & SELECT_MASK;
        self.directions = r.u8()? & 0x0F;
        self.buttons = r.u8()? & 0x0F;
        Ok(())
    }
}

impl Device for Joypad {
    fn read(&self, address: u16) -> Option<u8> {
        (address == REG_P1).then(|| P1_UNUSED | self.select | (!self.lines() & 0x0F))
    }

    fn write(&mut self, address: u16, value: u8) {
        if address == REG_P1 {
            self.update(|pad| pad.select = value & SELECT_MASK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joypad() -> (Joypad, InterruptSink) {
        let sink = InterruptSink::detached();
        (Joypad::new(sink.clone()), sink)
    }

    #[test]
    fn nothing_selected_reads_all_high() {
        let (mut pad, sink) = joypad();
        pad.press(Key::A);
        assert_eq!(pad.read(REG_P1), Some(0xFF));
        assert!(sink.pending().is_empty());
    }

    #[test]
    fn selected_group_reads_active_low() {
        let (mut pad, sink) = joypad();
        pad.write(REG_P1, 0x20); // directions
        pad.press(Key::Down);
        pad.press(Key::Start);
        assert_eq!(pad.read(REG_P1), Some(0xE7));
        assert_eq!(sink.pending(), Interrupt::JOYPAD);

        pad.write(REG_P1, 0x10); // buttons
        assert_eq!(pad.read(REG_P1), Some(0xD7));

        pad.release(Key::Start);
        assert!(!pad.is_pressed(Key::Start));
        assert_eq!(pad.read(REG_P1), Some(0xDF));
    }

    #[test]
    fn selecting_a_held_group_raises_the_interrupt() {
        let (mut pad, sink) = joypad();
        pad.press(Key::B);
        assert!(sink.pending().is_empty());
        pad.write(REG_P1, 0x10);
        assert_eq!(sink.pending(), Interrupt::JOYPAD);
    }
}
