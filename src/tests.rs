use crate::prelude::*;
use color_eyre::eyre::{eyre, Result};
use ntest::timeout;
use std::num::Wrapping;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const START: u16 = 0x0400;

// setup returns a CPU with the program loaded at START. Memory outside it
// is 0x02 (undocumented) so a runaway program errors out.
fn setup(program: &[u8]) -> Result<CPU6502> {
    let mut r = Box::new(FlatRAM::new().fill_value(0x02));
    r.power_on();
    r.load_image(program, START)?;
    let mut cpu = CPU6502::new(ChipDef { ram: r });
    cpu.pc_mut(START);
    cpu.s_mut(Wrapping(0xFF));
    Ok(cpu)
}

// INX, CPX #$05, BNE back to INX, then JMP *
const COUNT_TO_5: [u8; 8] = [0xE8, 0xE0, 0x05, 0xD0, 0xFB, 0x4C, 0x05, 0x04];

#[test]
fn success_pc() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().success_pc(0x0405).trap_detection(true));
    let report = runner.run()?;
    assert!(
        report.outcome == RunOutcome::Success { pc: 0x0405 },
        "got {:?}",
        report.outcome
    );
    // 5 passes of INX/CPX/BNE.
    assert!(report.instructions == 15, "instructions {}", report.instructions);
    // 4 taken branches at 3 and one not taken at 2.
    assert!(report.cycles == 5 * 4 + 4 * 3 + 2, "cycles {}", report.cycles);
    assert!(report.state.x == 5, "X {}", report.state.x);
    Ok(())
}

#[test]
fn success_wins_over_trap() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().success_pc(0x0405).trap_detection(true));
    runner.run()?;
    // Now sitting on JMP * which is also the success address.
    let report = runner.run()?;
    assert!(
        report.outcome == RunOutcome::Success { pc: 0x0405 },
        "got {:?}",
        report.outcome
    );
    assert!(report.instructions == 1, "instructions {}", report.instructions);
    Ok(())
}

#[test]
fn trapped() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().success_pc(0x3469).trap_detection(true));
    let report = runner.run()?;
    assert!(
        report.outcome == RunOutcome::Trapped { pc: 0x0405 },
        "got {:?}",
        report.outcome
    );
    assert!(report.instructions == 16, "instructions {}", report.instructions);
    Ok(())
}

#[test]
fn budgets() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().max_instructions(4));
    let report = runner.run()?;
    assert!(report.outcome == RunOutcome::InstructionLimit, "got {:?}", report.outcome);
    assert!(report.instructions == 4, "instructions {}", report.instructions);

    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().max_cycles(10));
    let report = runner.run()?;
    assert!(report.outcome == RunOutcome::CycleLimit, "got {:?}", report.outcome);
    // INX 2, CPX 2, BNE 3, INX 2 is 9 so the following CPX crosses 10.
    assert!(report.cycles == 11, "cycles {}", report.cycles);
    assert!(report.instructions == 5, "instructions {}", report.instructions);
    Ok(())
}

#[test]
fn unknown_opcode_ends_run() -> Result<()> {
    // INX then falls into 0x02 fill.
    let cpu = setup(&[0xE8])?;
    let mut runner = Runner::new(cpu, RunConfig::new().trap_detection(true));
    let Err(err) = runner.run() else {
        return Err(eyre!("run didn't fail"));
    };
    match err.root_cause().downcast_ref::<CPUError>() {
        Some(CPUError::UnknownOpcode { op: 0x02, pc: 0x0401 }) => {}
        _ => panic!("wrong error {err:?}"),
    }
    assert!(runner.cpu().state() == State::Halted, "state {}", runner.cpu().state());
    Ok(())
}

#[test]
fn stop_before_start() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let stop = Arc::new(AtomicBool::new(true));
    let mut runner = Runner::new(cpu, RunConfig::new()).stop_signal(stop);
    let report = runner.run()?;
    assert!(report.outcome == RunOutcome::Stopped, "got {:?}", report.outcome);
    assert!(report.instructions == 0, "instructions {}", report.instructions);
    Ok(())
}

#[test]
#[timeout(10000)]
fn stop_from_another_thread() -> Result<()> {
    // JMP * forever with no trap detection.
    let cpu = setup(&[0x4C, 0x00, 0x04])?;
    let stop = Arc::new(AtomicBool::new(false));
    let mut runner = Runner::new(cpu, RunConfig::new()).stop_signal(Arc::clone(&stop));

    let signal = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
    });
    let report = runner.run()?;
    signal
        .join()
        .map_err(|_| eyre!("signal thread panicked"))?;
    assert!(report.outcome == RunOutcome::Stopped, "got {:?}", report.outcome);
    assert!(report.instructions > 0, "nothing ran");
    Ok(())
}

#[test]
fn report_json() -> Result<()> {
    let cpu = setup(&COUNT_TO_5)?;
    let mut runner = Runner::new(cpu, RunConfig::new().success_pc(0x0405));
    let report = runner.run()?;
    let json = serde_json::to_string(&report)?;
    let back: RunReport = serde_json::from_str(&json)?;
    assert!(back == report, "round trip {json}");
    Ok(())
}
