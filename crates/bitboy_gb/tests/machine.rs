use bitboy_gb::cpu::RunState;
use bitboy_gb::machine::lcd::Mode;
use bitboy_gb::machine::ControllerKind;
use bitboy_gb::{Error, Machine, MachineOptions, CYCLES_PER_FRAME, LINE_CYCLES};

/// Unbanked 32 KiB image whose code at 0x0100 is `program`.
fn unbanked(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x147] = 0x00;
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    rom
}

/// MBC1 image of `banks` 16 KiB banks, each filled with its own number.
fn mbc1(banks: usize, program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; banks * 0x4000];
    for (bank, chunk) in rom.chunks_mut(0x4000).enumerate().skip(1) {
        chunk.fill(bank as u8);
    }
    rom[0x147] = 0x03;
    rom[0x149] = 0x02;
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    rom
}

const SPIN: [u8; 2] = [0x18, 0xFE]; // JR -2

#[test]
fn one_frame_walks_the_display_through_its_modes() {
    let mut m = Machine::new(&unbanked(&SPIN), MachineOptions::default()).unwrap();
    assert_eq!(m.cartridge().kind(), ControllerKind::None);

    let mut modes = Vec::new();
    let mut last = None;
    for cycle in 0..CYCLES_PER_FRAME {
        m.run_until(cycle + 1).unwrap();
        let mode = m.lcd().mode();
        if last != Some(mode) {
            modes.push((m.lcd().ly(), mode));
            last = Some(mode);
        }
    }
    assert_eq!(m.cycles(), CYCLES_PER_FRAME);

    // The boot program switches the display on; the first line then runs
    // through OAM scan, pixel transfer and H-blank.
    let first_line: Vec<_> = modes
        .iter()
        .skip_while(|(_, mode)| *mode == Mode::HBlank)
        .take(4)
        .collect();
    assert_eq!(
        first_line,
        vec![
            &(0, Mode::OamScan),
            &(0, Mode::PixelTransfer),
            &(0, Mode::HBlank),
            &(1, Mode::OamScan),
        ]
    );
}

/// Runs one cycle and returns the display mode afterwards.
fn tick(m: &mut Machine) -> Mode {
    let next = m.cycles() + 1;
    m.run_until(next).unwrap();
    m.lcd().mode()
}

#[test]
fn mode_durations_match_the_line_length() {
    let mut m = Machine::new(&unbanked(&SPIN), MachineOptions::default()).unwrap();
    m.run_until(2 * CYCLES_PER_FRAME).unwrap();

    // Align on the start of a visible line.
    while m.lcd().mode() != Mode::HBlank {
        tick(&mut m);
    }
    while tick(&mut m) != Mode::OamScan {}

    let mut spans = Vec::new();
    let mut mode = Mode::OamScan;
    let mut since = m.cycles();
    while spans.len() < 3 {
        let now = tick(&mut m);
        if now != mode {
            spans.push((mode, m.cycles() - since));
            mode = now;
            since = m.cycles();
        }
    }
    assert_eq!(
        spans,
        vec![
            (Mode::OamScan, 20),
            (Mode::PixelTransfer, 43),
            (Mode::HBlank, 51)
        ]
    );
    assert_eq!(spans.iter().map(|(_, n)| n).sum::<u64>(), LINE_CYCLES);
}

#[test]
fn running_backwards_is_a_scheduling_violation() {
    let mut m = Machine::new(&unbanked(&SPIN), MachineOptions::default()).unwrap();
    m.run_until(17_556).unwrap();
    match m.run_until(100) {
        Err(Error::SchedulingViolation { requested, current }) => {
            assert_eq!((requested, current), (100, 17_556));
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(m.cycles(), 17_556);
    m.run_until(17_556).unwrap();
}

#[test]
fn unsupported_cartridges_fail_before_the_machine_exists() {
    let mut rom = unbanked(&[]);
    rom[0x147] = 0xFC;
    assert!(matches!(
        Machine::new(&rom, MachineOptions::default()),
        Err(Error::UnsupportedCartridge(0xFC))
    ));
    assert!(matches!(
        Machine::new(&rom[..0x100], MachineOptions::default()),
        Err(Error::TruncatedRom { .. })
    ));
}

#[test]
fn rom_bank_switching_from_code() {
    let program = [
        0x3E, 0x03, // LD A,$03
        0xEA, 0x00, 0x20, // LD ($2000),A
        0xFA, 0x00, 0x40, // LD A,($4000)
        0xEA, 0x00, 0xC0, // LD ($C000),A
        0x18, 0xFE, // JR -2
    ];
    let mut m = Machine::new(&mbc1(4, &program), MachineOptions::default()).unwrap();
    assert_eq!(m.cartridge().kind(), ControllerKind::Mbc1);
    m.run_until(500).unwrap();
    assert_eq!(m.bus().read(0xC000), 3);
    assert_eq!(m.bus().read(0x4000), 3);
}

#[test]
fn battery_ram_is_preloaded_and_readable() {
    let mut ram = vec![0u8; 0x2000];
    ram[0x10] = 0x77;
    let options = MachineOptions::builder().battery_ram(ram.clone()).build();
    let m = Machine::new(&mbc1(2, &SPIN), options).unwrap();
    assert_eq!(m.cartridge().ram(), &ram[..]);

    m.bus().write(0x0000, 0x0A);
    assert_eq!(m.bus().read(0xA010), 0x77);

    let options = MachineOptions::builder().battery_ram(vec![0; 3]).build();
    assert!(matches!(
        Machine::new(&mbc1(2, &SPIN), options),
        Err(Error::RamSizeMismatch { .. })
    ));
}

#[test]
fn unused_opcode_locks_the_cpu() {
    let mut m = Machine::new(&unbanked(&[0xD3]), MachineOptions::default()).unwrap();
    m.run_until(CYCLES_PER_FRAME).unwrap();
    assert_eq!(m.cpu().run_state(), RunState::Locked);
    assert_eq!(m.cpu().pc(), 0x0100);
    // The rest of the machine keeps running.
    assert_eq!(m.bus().read(0xFF40), 0x91);
    assert_ne!(m.lcd().ly(), 0);
    assert_eq!(m.cycles(), CYCLES_PER_FRAME);
}

#[test]
fn snapshot_round_trip_through_the_public_surface() {
    let mut m = Machine::new(&unbanked(&[0x04, 0x18, 0xFD]), MachineOptions::default()).unwrap();
    m.run_until(5_000).unwrap();
    let state = m.save_state();
    m.run_until(9_000).unwrap();
    let later = m.save_state();

    m.restore_state(&state).unwrap();
    assert_eq!(m.cycles(), 5_000);
    m.run_until(9_000).unwrap();
    assert_eq!(m.save_state(), later);
}

#[test]
fn frame_bytes_have_two_planes_per_line() {
    let mut m = Machine::new(&unbanked(&SPIN), MachineOptions::default()).unwrap();
    m.run_until(3 * CYCLES_PER_FRAME).unwrap();
    let bytes = m.lcd().current_image().to_bytes();
    assert_eq!(bytes.len(), 144 * 2 * 160 / 8);
    assert!(bytes.iter().all(|&b| b == 0));
}
