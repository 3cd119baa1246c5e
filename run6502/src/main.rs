//! `run6502` loads a binary image into a flat 64k RAM and runs an NMOS 6502
//! against it until a stop condition is met.
use clap::Parser;
use clap_num::maybe_hex;
use color_eyre::eyre::Result;
use log::LevelFilter;
use nmos6502::prelude::*;
use std::num::Wrapping;
use std::path::PathBuf;

/// `run6502` will load the given image and run it from the start PC.
///
/// Self jumps (`JMP *` or a branch to itself) end the run as a trap unless
/// they land on the success address. Exits non-zero for anything but success.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(help = "Filename containing binary image")]
    filename: PathBuf,

    #[arg(
        long, default_value_t = 0, value_parser=maybe_hex::<u16>,
        help = "Offset into RAM to start loading data. All other RAM will be zero'd out."
    )]
    offset: u16,

    #[arg(long, value_parser=maybe_hex::<u16>, help = "Starting PC value. Defaults to the offset.")]
    start_pc: Option<u16>,

    #[arg(long, default_value_t = 0xFF, value_parser=maybe_hex::<u8>, help = "Starting stack pointer.")]
    sp: u8,

    #[arg(long, value_parser=maybe_hex::<u16>, help = "PC value which means the image passed.")]
    success_pc: Option<u16>,

    #[arg(long, help = "Stop after this many instructions.")]
    max_instructions: Option<usize>,

    #[arg(long, help = "Stop after this many cycles.")]
    max_cycles: Option<usize>,

    #[arg(long, help = "Log CPU state before every instruction to stderr.")]
    trace: bool,

    #[arg(long, help = "Print the final report as JSON.")]
    json: bool,
}

impl Args {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::new().trap_detection(true);
        if let Some(pc) = self.success_pc {
            config = config.success_pc(pc);
        }
        if let Some(n) = self.max_instructions {
            config = config.max_instructions(n);
        }
        if let Some(n) = self.max_cycles {
            config = config.max_cycles(n);
        }
        config
    }

    fn cpu(&self) -> Result<CPU6502> {
        let mut r = Box::new(FlatRAM::new());
        r.power_on();
        let n = r.load_file(&self.filename, self.offset)?;
        log::info!(
            "loaded {n} bytes from {} at {:04X}",
            self.filename.display(),
            self.offset
        );

        let mut cpu = CPU6502::new(ChipDef { ram: r });
        cpu.pc_mut(self.start_pc.unwrap_or(self.offset));
        cpu.s_mut(Wrapping(self.sp));
        Ok(cpu)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args: Args = Args::parse();

    // Log to stderr (if you run with `RUST_LOG=debug`).
    let mut logger = env_logger::Builder::from_default_env();
    if args.trace {
        logger.filter_module("cpu", LevelFilter::Trace);
    }
    logger.init();

    let mut runner = Runner::new(args.cpu()?, args.config());
    let report = runner.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} after {} instructions and {} cycles",
            report.outcome, report.instructions, report.cycles
        );
        println!("{}", report.state);
    }

    if !matches!(report.outcome, RunOutcome::Success { .. }) {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn run_image() -> Result<()> {
        // LDA #$2A, STA $0200, JMP *
        let mut f = NamedTempFile::new()?;
        f.write_all(&[0xA9, 0x2A, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0x10])?;
        let path = f.path().to_string_lossy().into_owned();

        let args = Args::try_parse_from([
            "run6502",
            path.as_str(),
            "--offset",
            "0x1000",
            "--success-pc",
            "0x1005",
        ])?;
        assert!(args.sp == 0xFF, "sp {:02X}", args.sp);

        let mut runner = Runner::new(args.cpu()?, args.config());
        let report = runner.run()?;
        assert!(
            report.outcome == RunOutcome::Success { pc: 0x1005 },
            "got {:?}",
            report.outcome
        );
        let stored = runner.cpu().ram().borrow().read(0x0200);
        assert!(stored == 0x2A, "0x0200 is {stored:02X}");
        Ok(())
    }

    #[test]
    fn trap_without_success_pc() -> Result<()> {
        // BNE * with Z clear.
        let mut f = NamedTempFile::new()?;
        f.write_all(&[0xD0, 0xFE])?;
        let path = f.path().to_string_lossy().into_owned();

        let args = Args::try_parse_from(["run6502", path.as_str(), "--start-pc", "0", "--sp", "0x80"])?;
        let cpu = args.cpu()?;
        assert!(cpu.s().0 == 0x80, "S {:02X}", cpu.s());
        let report = Runner::new(cpu, args.config()).run()?;
        assert!(
            report.outcome == RunOutcome::Trapped { pc: 0x0000 },
            "got {:?}",
            report.outcome
        );
        Ok(())
    }
}
