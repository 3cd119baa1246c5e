//! runner drives a `CPU6502` one instruction at a time and decides when to
//! stop. The CPU itself has no notion of a finished program so every policy
//! (success address, trap, budgets, external stop) lives here.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use color_eyre::eyre::Result;
use cpu::{CPUState, CPU6502};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// `RunConfig` holds the stop conditions for a run. Every condition is
/// optional and a run with none set only stops on an error or the stop signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    success_pc: Option<u16>,
    max_instructions: Option<usize>,
    max_cycles: Option<usize>,
    trap_detection: bool,
}

impl RunConfig {
    /// A config with no stop conditions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop with `RunOutcome::Success` once PC reaches pc.
    #[must_use]
    pub fn success_pc(mut self, pc: u16) -> Self {
        self.success_pc = Some(pc);
        self
    }

    /// Stop once this many instructions have run.
    #[must_use]
    pub fn max_instructions(mut self, n: usize) -> Self {
        self.max_instructions = Some(n);
        self
    }

    /// Stop once at least this many cycles have run.
    #[must_use]
    pub fn max_cycles(mut self, n: usize) -> Self {
        self.max_cycles = Some(n);
        self
    }

    /// Stop with `RunOutcome::Trapped` when an instruction leaves PC where it
    /// was (i.e. a JMP or branch to itself). Test images use this to signal
    /// failure.
    #[must_use]
    pub fn trap_detection(mut self, on: bool) -> Self {
        self.trap_detection = on;
        self
    }
}

/// `RunOutcome` is why a run stopped.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// PC reached the success address.
    Success {
        /// Where PC ended.
        pc: u16,
    },
    /// An instruction jumped to itself somewhere other than the success address.
    Trapped {
        /// Where PC ended.
        pc: u16,
    },
    /// The instruction budget ran out.
    InstructionLimit,
    /// The cycle budget ran out.
    CycleLimit,
    /// The stop signal was raised.
    Stopped,
}

/// `RunReport` summarizes a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Why the run stopped.
    pub outcome: RunOutcome,
    /// Instructions executed during this run.
    pub instructions: usize,
    /// Cycles consumed during this run.
    pub cycles: usize,
    /// CPU state at the end of the run.
    pub state: CPUState,
}

/// Runner owns a CPU for the duration of a run. It's the only thing stepping
/// it so no locking is needed. The stop signal is the one piece which may be
/// shared with another thread.
pub struct Runner {
    cpu: CPU6502,
    config: RunConfig,
    stop: Option<Arc<AtomicBool>>,
}

impl Runner {
    /// Create a runner for the given CPU. PC and S must already be set.
    #[must_use]
    pub fn new(cpu: CPU6502, config: RunConfig) -> Self {
        Self {
            cpu,
            config,
            stop: None,
        }
    }

    /// Check the given flag between every instruction and stop with
    /// `RunOutcome::Stopped` once it's true.
    #[must_use]
    pub fn stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// cpu returns the CPU being run.
    #[must_use]
    pub fn cpu(&self) -> &CPU6502 {
        &self.cpu
    }

    /// `cpu_mut` returns the CPU being run for adjustments between runs.
    pub fn cpu_mut(&mut self) -> &mut CPU6502 {
        &mut self.cpu
    }

    /// `into_cpu` gives back the CPU.
    #[must_use]
    pub fn into_cpu(self) -> CPU6502 {
        self.cpu
    }

    // check_stop returns an outcome if any stop condition now holds.
    fn check_stop(&self, old_pc: u16, instructions: usize, cycles: usize) -> Option<RunOutcome> {
        let pc = self.cpu.pc();
        if self.config.success_pc == Some(pc) {
            return Some(RunOutcome::Success { pc });
        }
        if self.config.trap_detection && pc == old_pc {
            return Some(RunOutcome::Trapped { pc });
        }
        if self.config.max_instructions.is_some_and(|max| instructions >= max) {
            return Some(RunOutcome::InstructionLimit);
        }
        if self.config.max_cycles.is_some_and(|max| cycles >= max) {
            return Some(RunOutcome::CycleLimit);
        }
        None
    }

    /// run steps the CPU until a stop condition holds and reports why.
    /// Conditions are checked after every instruction except the stop signal
    /// which is also checked before the first one. The success address is
    /// checked before a trap so a test ending in `JMP *` reports success.
    ///
    /// # Errors
    /// Any error from `CPU6502::step` (such as an unknown opcode) ends the run
    /// and is returned as is.
    pub fn run(&mut self) -> Result<RunReport> {
        let mut instructions = 0;
        let mut cycles = 0;

        debug!("run starting at {:04X} with {:?}", self.cpu.pc(), self.config);
        let outcome = loop {
            if self
                .stop
                .as_ref()
                .is_some_and(|stop| stop.load(Ordering::Relaxed))
            {
                break RunOutcome::Stopped;
            }

            let old_pc = self.cpu.pc();
            cycles += self.cpu.step()?;
            instructions += 1;

            if let Some(outcome) = self.check_stop(old_pc, instructions, cycles) {
                break outcome;
            }
        };

        info!("run stopped: {outcome} after {instructions} instructions and {cycles} cycles");
        Ok(RunReport {
            outcome,
            instructions,
            cycles,
            state: self.cpu.cpu_state(),
        })
    }
}
