use std::cell::RefCell;

use super::*;
use crate::machine::{Ram, RamWindow};

/// CPU wired to a flat 64 KiB RAM, with IF/IE answered first.
struct Rig {
    cpu: Cpu,
    bus: Bus,
    ram: Rc<RefCell<Ram>>,
    cycle: u64,
}

impl Rig {
    fn new(program: &[u8]) -> Self {
        let lines = Rc::new(InterruptLines::default());
        let ram = Rc::new(RefCell::new(Ram::new(0x1_0000)));
        for (i, &byte) in program.iter().enumerate() {
            ram.borrow_mut().write(i, byte);
        }
        let mut bus = Bus::new();
        bus.attach(&Rc::new(RefCell::new(InterruptRegisters::new(lines.clone()))));
        bus.attach(&Rc::new(RefCell::new(RamWindow::new(ram.clone(), 0))));

        let mut cpu = Cpu::new(lines);
        cpu.set_sp(0xFFFE);
        Self {
            cpu,
            bus,
            ram,
            cycle: 0,
        }
    }

    /// Runs one instruction and returns the cycles it took.
    fn step(&mut self) -> u64 {
        let start = self.cycle;
        self.cpu.cycle(start, &self.bus);
        self.cycle = self.cpu.next_non_idle_cycle();
        self.cycle - start
    }

    fn mem(&self, address: u16) -> u8 {
        self.ram.borrow().read(address as usize)
    }

    fn poke(&self, address: u16, value: u8) {
        self.ram.borrow_mut().write(address as usize, value);
    }
}

#[test]
fn nop_advances_pc() {
    let mut rig = Rig::new(&[0x00]);
    assert_eq!(rig.step(), 1);
    assert_eq!(rig.cpu.pc(), 0x0001);
}

#[test]
fn ld_16bit_and_basic_ld_indirect_work() {
    // 0x0000: LD BC, 0x1234
    // 0x0003: LD (BC), A
    // 0x0004: LD A, (BC)
    let mut rig = Rig::new(&[0x01, 0x34, 0x12, 0x02, 0x0A]);
    rig.cpu.set_reg(Reg::A, 0xAB);

    assert_eq!(rig.step(), 3);
    assert_eq!(rig.cpu.reg16(Reg16::Bc), 0x1234);
    assert_eq!(rig.cpu.pc(), 0x0003);

    assert_eq!(rig.step(), 2);
    assert_eq!(rig.mem(0x1234), 0xAB);

    rig.cpu.set_reg(Reg::A, 0);
    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.reg(Reg::A), 0xAB);
}

#[test]
fn hl_increment_and_decrement_forms() {
    // LD (HL+),A ; LD (HL-),A ; LD A,(HL-)
    let mut rig = Rig::new(&[0x22, 0x32, 0x3A]);
    rig.cpu.set_reg16(Reg16::Hl, 0xC000);
    rig.cpu.set_reg(Reg::A, 0x5A);

    rig.step();
    assert_eq!(rig.mem(0xC000), 0x5A);
    assert_eq!(rig.cpu.reg16(Reg16::Hl), 0xC001);

    rig.step();
    assert_eq!(rig.mem(0xC001), 0x5A);
    assert_eq!(rig.cpu.reg16(Reg16::Hl), 0xC000);

    rig.poke(0xC000, 0x99);
    rig.step();
    assert_eq!(rig.cpu.reg(Reg::A), 0x99);
    assert_eq!(rig.cpu.reg16(Reg16::Hl), 0xBFFF);
}

#[test]
fn inc_dec_8bit_update_flags_and_preserve_c() {
    // INC B ; DEC B ; INC (HL)
    let mut rig = Rig::new(&[0x04, 0x05, 0x34]);
    rig.cpu.set_reg(Reg::B, 0xFF);
    rig.cpu.set_flags(Flags::C);
    rig.cpu.set_reg16(Reg16::Hl, 0xC000);

    assert_eq!(rig.step(), 1);
    assert_eq!(rig.cpu.reg(Reg::B), 0x00);
    assert_eq!(rig.cpu.flags(), Flags::Z | Flags::H | Flags::C);

    rig.step();
    assert_eq!(rig.cpu.reg(Reg::B), 0xFF);
    assert_eq!(rig.cpu.flags(), Flags::N | Flags::H | Flags::C);

    rig.poke(0xC000, 0x0F);
    assert_eq!(rig.step(), 3);
    assert_eq!(rig.mem(0xC000), 0x10);
    assert_eq!(rig.cpu.flags(), Flags::H | Flags::C);
}

#[test]
fn add_hl_rr_keeps_zero_flag() {
    // ADD HL,BC
    let mut rig = Rig::new(&[0x09]);
    rig.cpu.set_reg16(Reg16::Hl, 0x0FFF);
    rig.cpu.set_reg16(Reg16::Bc, 0x0001);
    rig.cpu.set_flags(Flags::Z | Flags::N);

    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.reg16(Reg16::Hl), 0x1000);
    assert_eq!(rig.cpu.flags(), Flags::Z | Flags::H);
}

#[test]
fn add_sp_e8_is_signed_with_low_byte_flags() {
    // ADD SP,-1 ; LD HL,SP+2
    let mut rig = Rig::new(&[0xE8, 0xFF, 0xF8, 0x02]);
    rig.cpu.set_sp(0x0001);
    rig.cpu.set_flags(Flags::Z);

    assert_eq!(rig.step(), 4);
    assert_eq!(rig.cpu.sp(), 0x0000);
    assert_eq!(rig.cpu.flags(), Flags::H | Flags::C);

    assert_eq!(rig.step(), 3);
    assert_eq!(rig.cpu.reg16(Reg16::Hl), 0x0002);
    assert_eq!(rig.cpu.sp(), 0x0000);
    assert_eq!(rig.cpu.flags(), Flags::empty());
}

#[test]
fn push_and_pop_roundtrip_and_pop_af_masks_low_flags() {
    // PUSH BC ; POP DE ; POP AF
    let mut rig = Rig::new(&[0xC5, 0xD1, 0xF1]);
    rig.cpu.set_reg16(Reg16::Bc, 0x1234);

    assert_eq!(rig.step(), 4);
    assert_eq!(rig.cpu.sp(), 0xFFFC);
    assert_eq!(rig.step(), 3);
    assert_eq!(rig.cpu.reg16(Reg16::De), 0x1234);
    assert_eq!(rig.cpu.sp(), 0xFFFE);

    rig.cpu.set_sp(0xFFFC);
    rig.poke(0xFFFC, 0x3F);
    rig.poke(0xFFFD, 0x12);
    rig.step();
    assert_eq!(rig.cpu.reg(Reg::A), 0x12);
    assert_eq!(rig.cpu.reg(Reg::F), 0x30);
}

#[test]
fn branches_charge_extra_cycles_only_when_taken() {
    let mut program = vec![0u8; 0x110];
    program[0x00..0x02].copy_from_slice(&[0x20, 0x05]); // JR NZ,+5
    program[0x02..0x04].copy_from_slice(&[0x20, 0x05]); // JR NZ,+5
    program[0x09..0x0C].copy_from_slice(&[0xCD, 0x00, 0x01]); // CALL 0x0100
    program[0x100] = 0xC9; // RET
    let mut rig = Rig::new(&program);

    rig.cpu.set_flags(Flags::Z);
    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.pc(), 0x0002);

    rig.cpu.set_flags(Flags::empty());
    assert_eq!(rig.step(), 3);
    assert_eq!(rig.cpu.pc(), 0x0009);

    assert_eq!(rig.step(), 6);
    assert_eq!(rig.cpu.pc(), 0x0100);
    assert_eq!(rig.cpu.sp(), 0xFFFC);
    assert_eq!((rig.mem(0xFFFC), rig.mem(0xFFFD)), (0x0C, 0x00));

    assert_eq!(rig.step(), 4);
    assert_eq!(rig.cpu.pc(), 0x000C);
    assert_eq!(rig.cpu.sp(), 0xFFFE);
}

#[test]
fn relative_jump_can_go_backwards() {
    // NOP ; JR -3
    let mut rig = Rig::new(&[0x00, 0x18, 0xFD]);
    rig.step();
    rig.step();
    assert_eq!(rig.cpu.pc(), 0x0000);
}

#[test]
fn prefixed_page_costs_and_flags() {
    // SWAP A ; BIT 5,H ; SET 0,(HL)
    let mut rig = Rig::new(&[0xCB, 0x37, 0xCB, 0x6C, 0xCB, 0xC6]);
    rig.cpu.set_reg(Reg::A, 0xF1);
    rig.cpu.set_reg16(Reg16::Hl, 0xC000);
    rig.cpu.set_flags(Flags::C);

    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.reg(Reg::A), 0x1F);
    assert_eq!(rig.cpu.flags(), Flags::empty());
    assert_eq!(rig.cpu.pc(), 0x0002);

    rig.cpu.set_flags(Flags::C);
    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.flags(), Flags::Z | Flags::H | Flags::C);

    assert_eq!(rig.step(), 4);
    assert_eq!(rig.mem(0xC000), 0x01);
    assert_eq!(rig.cpu.pc(), 0x0006);
}

#[test]
fn daa_corrects_a_bcd_addition() {
    // ADD A,0x27 ; DAA ; CPL
    let mut rig = Rig::new(&[0xC6, 0x27, 0x27, 0x2F]);
    rig.cpu.set_reg(Reg::A, 0x15);
    rig.step();
    assert_eq!(rig.cpu.reg(Reg::A), 0x3C);
    rig.step();
    assert_eq!(rig.cpu.reg(Reg::A), 0x42);
    assert_eq!(rig.cpu.flags(), Flags::empty());
    rig.step();
    assert_eq!(rig.cpu.reg(Reg::A), 0xBD);
    assert_eq!(rig.cpu.flags(), Flags::N | Flags::H);
}

#[test]
fn compare_leaves_a_untouched() {
    // CP 0x10
    let mut rig = Rig::new(&[0xFE, 0x10]);
    rig.cpu.set_reg(Reg::A, 0x10);
    assert_eq!(rig.step(), 2);
    assert_eq!(rig.cpu.reg(Reg::A), 0x10);
    assert_eq!(rig.cpu.flags(), Flags::Z | Flags::N);
}

#[test]
fn enabled_interrupt_is_dispatched_at_the_next_boundary() {
    // EI ; NOP
    let mut rig = Rig::new(&[0xFB, 0x00]);
    rig.bus.write(0xFFFF, Interrupt::TIMER.bits());

    assert_eq!(rig.step(), 1);
    assert!(rig.cpu.ime());

    rig.cpu.interrupt_sink().request(Interrupt::TIMER);
    assert_eq!(rig.step(), 5);
    assert_eq!(rig.cpu.pc(), 0x0050);
    assert!(!rig.cpu.ime());
    assert!(rig.cpu.interrupt_pending().is_empty());
    assert_eq!(rig.cpu.sp(), 0xFFFC);
    assert_eq!((rig.mem(0xFFFC), rig.mem(0xFFFD)), (0x01, 0x00));
}

#[test]
fn lowest_numbered_interrupt_wins() {
    let mut rig = Rig::new(&[0xFB]);
    rig.bus.write(0xFFFF, 0x1F);
    rig.step();
    rig.cpu.request_interrupt(Interrupt::JOYPAD);
    rig.cpu.request_interrupt(Interrupt::LCD_STAT);
    rig.step();
    assert_eq!(rig.cpu.pc(), 0x0048);
    assert_eq!(rig.cpu.interrupt_pending(), Interrupt::JOYPAD);
}

#[test]
fn reti_returns_and_enables_interrupts() {
    let mut rig = Rig::new(&[0xD9]);
    rig.cpu.set_sp(0xFFFC);
    rig.poke(0xFFFC, 0x34);
    rig.poke(0xFFFD, 0x12);
    assert_eq!(rig.step(), 4);
    assert_eq!(rig.cpu.pc(), 0x1234);
    assert!(rig.cpu.ime());
}

#[test]
fn halt_waits_for_an_enabled_interrupt_even_with_ime_off() {
    // HALT ; NOP
    let mut rig = Rig::new(&[0x76, 0x00]);
    rig.bus.write(0xFFFF, Interrupt::TIMER.bits());

    rig.cpu.cycle(0, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Halted);
    assert_eq!(rig.cpu.pc(), 0x0001);

    for cycle in 1..6 {
        rig.cpu.cycle(cycle, &rig.bus);
    }
    assert_eq!(rig.cpu.pc(), 0x0001);

    // A pending but disabled interrupt does not wake the CPU.
    rig.cpu.request_interrupt(Interrupt::VBLANK);
    rig.cpu.cycle(6, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Halted);

    rig.cpu.request_interrupt(Interrupt::TIMER);
    rig.cpu.cycle(7, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Running);
    assert_eq!(rig.cpu.pc(), 0x0002);
    assert_eq!(rig.cpu.next_non_idle_cycle(), 8);
    assert!(rig.cpu.interrupt_pending().contains(Interrupt::TIMER));
}

#[test]
fn stop_waits_for_the_joypad() {
    let mut rig = Rig::new(&[0x10, 0x00, 0x00]);
    rig.cpu.cycle(0, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Stopped);
    assert_eq!(rig.cpu.pc(), 0x0002);

    rig.cpu.request_interrupt(Interrupt::TIMER);
    rig.cpu.cycle(1, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Stopped);

    rig.cpu.request_interrupt(Interrupt::JOYPAD);
    rig.cpu.cycle(2, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Running);
    assert_eq!(rig.cpu.pc(), 0x0003);
}

#[test]
fn unused_opcode_locks_the_cpu() {
    let mut rig = Rig::new(&[0xD3, 0x00]);
    rig.cpu.cycle(0, &rig.bus);
    assert_eq!(rig.cpu.run_state(), RunState::Locked);
    assert_eq!(rig.cpu.pc(), 0x0000);
    assert_eq!(rig.cpu.next_non_idle_cycle(), u64::MAX);

    rig.cpu.request_interrupt(Interrupt::all());
    rig.cpu.cycle(1, &rig.bus);
    assert_eq!(rig.cpu.pc(), 0x0000);
}

#[test]
fn idle_cycles_do_nothing() {
    // LD BC,n16 takes three cycles.
    let mut rig = Rig::new(&[0x01, 0x34, 0x12, 0x00]);
    rig.cpu.cycle(0, &rig.bus);
    rig.cpu.cycle(1, &rig.bus);
    rig.cpu.cycle(2, &rig.bus);
    assert_eq!(rig.cpu.pc(), 0x0003);
    rig.cpu.cycle(3, &rig.bus);
    assert_eq!(rig.cpu.pc(), 0x0004);
}

#[test]
fn state_round_trip() {
    let mut rig = Rig::new(&[0x01, 0x34, 0x12]);
    rig.step();
    let mut w = StateWriter::new();
    rig.cpu.save(&mut w);
    let bytes = w.into_bytes();

    let mut other = Cpu::new(Rc::new(InterruptLines::default()));
    let mut r = StateReader::new(&bytes);
    other.load(&mut r).unwrap();
    r.finish().unwrap();
    assert_eq!(other.pc(), 0x0003);
    assert_eq!(other.reg16(Reg16::Bc), 0x1234);
    assert_eq!(other.sp(), 0xFFFE);
    assert_eq!(other.next_non_idle_cycle(), 3);
}
