use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bitboy_gb::{Machine, MachineOptions, CYCLES_PER_FRAME, SCREEN_HEIGHT, SCREEN_WIDTH};

const USAGE: &str = "Usage: bitboy <rom_path> <out_path> [frames|--cycles N] \
                     [--save-state PATH] [--load-state PATH]";
const DEFAULT_FRAMES: u64 = 60;

/// How far to run, counted from the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunLength {
    Frames(u64),
    Cycles(u64),
}

impl RunLength {
    fn cycles(self) -> u64 {
        match self {
            RunLength::Frames(frames) => frames * CYCLES_PER_FRAME,
            RunLength::Cycles(cycles) => cycles,
        }
    }
}

#[derive(Debug)]
struct Args {
    rom_path: PathBuf,
    out_path: PathBuf,
    run_length: RunLength,
    save_state: Option<PathBuf>,
    load_state: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let rom_path = args.next().map(PathBuf::from).context(USAGE)?;
    let out_path = args.next().map(PathBuf::from).context(USAGE)?;
    let mut parsed = Args {
        rom_path,
        out_path,
        run_length: RunLength::Frames(DEFAULT_FRAMES),
        save_state: None,
        load_state: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--cycles" => {
                let value = args.next().context("--cycles needs a value")?;
                let cycles = value
                    .parse()
                    .with_context(|| format!("invalid cycle count '{value}'"))?;
                parsed.run_length = RunLength::Cycles(cycles);
            }
            "--save-state" => {
                let path = args.next().context("--save-state needs a path")?;
                parsed.save_state = Some(PathBuf::from(path));
            }
            "--load-state" => {
                let path = args.next().context("--load-state needs a path")?;
                parsed.load_state = Some(PathBuf::from(path));
            }
            frames if !frames.starts_with("--") => {
                let frames = frames
                    .parse()
                    .with_context(|| format!("invalid frame count '{frames}'"))?;
                parsed.run_length = RunLength::Frames(frames);
            }
            other => bail!("unknown option '{other}'\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;

    let rom = std::fs::read(&args.rom_path)
        .with_context(|| format!("failed to read ROM '{}'", args.rom_path.display()))?;
    let mut machine = Machine::new(&rom, MachineOptions::default())
        .with_context(|| format!("failed to load cartridge '{}'", args.rom_path.display()))?;

    if let Some(path) = &args.load_state {
        let state = std::fs::read(path)
            .with_context(|| format!("failed to read state '{}'", path.display()))?;
        machine.restore_state(&state)?;
    }

    let target = machine.cycles() + args.run_length.cycles();
    machine.run_until(target)?;
    log::debug!("CPU at 0x{:04X}, {:?}", machine.cpu().pc(), machine.cpu().run_state());

    let bytes = machine.lcd().current_image().to_bytes();
    std::fs::write(&args.out_path, &bytes)
        .with_context(|| format!("failed to write '{}'", args.out_path.display()))?;

    if let Some(path) = &args.save_state {
        std::fs::write(path, machine.save_state())
            .with_context(|| format!("failed to write state '{}'", path.display()))?;
    }

    println!(
        "Wrote {} bytes ({}x{} bit planes) at cycle {} to '{}'",
        bytes.len(),
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        machine.cycles(),
        args.out_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_sixty_frames() {
        let args = parse(&["game.gb", "out.bin"]).unwrap();
        assert_eq!(args.run_length, RunLength::Frames(60));
        assert_eq!(args.run_length.cycles(), 60 * 17_556);
        assert!(args.save_state.is_none() && args.load_state.is_none());
    }

    #[test]
    fn explicit_frames_and_cycles() {
        assert_eq!(parse(&["a", "b", "5"]).unwrap().run_length, RunLength::Frames(5));
        let args = parse(&["a", "b", "--cycles", "1234", "--save-state", "s.bin"]).unwrap();
        assert_eq!(args.run_length, RunLength::Cycles(1234));
        assert_eq!(args.save_state, Some(PathBuf::from("s.bin")));
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(parse(&["only_rom"]).is_err());
        assert!(parse(&["a", "b", "--cycles"]).is_err());
        assert!(parse(&["a", "b", "many"]).is_err());
        assert!(parse(&["a", "b", "--fast"]).is_err());
    }
}
