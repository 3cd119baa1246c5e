//! cpu defines an NMOS 6502 CPU which executes one full instruction per
//! step and reports the cycles that instruction took.
use std::cell::RefCell;
use std::fmt;
use std::num::Wrapping;
use std::rc::Rc;

use color_eyre::eyre::{eyre, ErrReport, Result};
use log::{log_enabled, trace, warn, Level};
use memory::Memory;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

mod addressing;
pub mod alu;
mod disassemble;
mod flags;
mod instructions;
mod stack;
mod table;

pub use addressing::detect_page_crossing;
pub use disassemble::disassemble;
pub use flags::Flags;
pub use memory::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
pub use table::{instruction, resolve_opcode, Handler, Instruction};


/// `AddressMode` defines the 6502 addressing modes.
#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq, Hash, EnumString, EnumIter)]
pub enum AddressMode {
    /// `Immediate` mode uses the constant following the opcode to perform the operation.
    /// Example: LDA #04 loads 0x04 into A.
    #[default]
    Immediate,

    /// `ZeroPage` references the first 256 bytes.
    /// Example: LDA 0F would load the value from 0x0F into A.
    ZeroPage,

    /// `ZeroPageX` references the first 256 bytes (zero page) with addition from the X register.
    /// Overflow simply wraps.
    /// Example: LDA FF,X with X=2 would load the value from 0x01 into A.
    ZeroPageX,

    /// `ZeroPageY` references the first 256 bytes (zero page) with addition from the Y register.
    /// Overflow simply wraps.
    /// Example: LDX 0F,Y with Y=4 would load the value from 0x13 into X.
    ZeroPageY,

    /// `IndirectX` uses the given address from the first 256 bytes (zero page) with addition from the X register.
    /// It then uses this and the following location as a pointer to use as the final address.
    /// Example LDA (04,X) with X = 8 and location 0C,0D have 02 and 01. This would load the value at 0x0102 into A
    /// after adding 8 to 4 and referencing 0x0C.
    IndirectX,

    /// `IndirectY` uses the given address from the first 256 bytes (zero page).
    /// It then uses this and the following address as a pointer. Then Y is added to that to get the final
    /// address to use.
    /// Example LDA (04),Y with Y = 4 and location 04,05 have 02 and 01. This would load the value at 0x0106 into A
    /// after adding 4 to 0x0102.
    IndirectY,

    /// `Absolute` references a direct 16 bit constant as an address.
    /// Example: LDA D000 loads A from 0xD000
    Absolute,

    /// `AbsoluteX` references a direct 16 bit constant as an address and adds X to get the final address.
    /// Example: LDA D000,X with X = 4 loads A from 0xD004
    AbsoluteX,

    /// `AbsoluteY` references a direct 16 bit constant as an address and adds Y to get the final address.
    /// Example: LDA D000,Y with Y = 5 loads A from 0xD005
    AbsoluteY,

    /// `AbsoluteIndirect` uses the 16 bit constant as a pointer to the final address.
    /// Only JMP uses this. NMOS parts don't carry into the high byte of the pointer
    /// so JMP (10FF) reads the high byte from 0x1000.
    AbsoluteIndirect,

    /// `Accumulator` operates on A directly.
    /// Example: ASL A
    Accumulator,

    /// `Implied` has no operand (or the operand is implied by the opcode).
    /// Example: CLC
    Implied,

    /// `Relative` is a signed 8 bit offset from the address of the next instruction.
    /// Example: BNE 0xFE loops to itself.
    Relative,
}

impl AddressMode {
    /// Length in bytes of an instruction in this mode, opcode included.
    #[must_use]
    pub const fn length(self) -> u16 {
        match self {
            AddressMode::Accumulator | AddressMode::Implied => 1,
            AddressMode::Immediate
            | AddressMode::ZeroPage
            | AddressMode::ZeroPageX
            | AddressMode::ZeroPageY
            | AddressMode::IndirectX
            | AddressMode::IndirectY
            | AddressMode::Relative => 2,
            AddressMode::Absolute
            | AddressMode::AbsoluteX
            | AddressMode::AbsoluteY
            | AddressMode::AbsoluteIndirect => 3,
        }
    }
}

/// Opcode defines all the documented NMOS 6502 mnemonics.
#[derive(Clone, Copy, Debug, Display, Default, PartialEq, Eq, Hash, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Opcode {
    /// Add with carry.
    ADC,
    /// Bitwise and with A.
    AND,
    /// Arithmetic shift left.
    ASL,
    /// Branch if carry is clear.
    BCC,
    /// Branch if carry is set.
    BCS,
    /// Branch if zero is set (equal).
    BEQ,
    /// Test bits in memory against A.
    BIT,
    /// Branch if negative is set.
    BMI,
    /// Branch if zero is clear (not equal).
    BNE,
    /// Branch if negative is clear.
    BPL,
    /// Software interrupt through the IRQ vector.
    #[default]
    BRK,
    /// Branch if overflow is clear.
    BVC,
    /// Branch if overflow is set.
    BVS,
    /// Clear carry.
    CLC,
    /// Clear decimal mode.
    CLD,
    /// Clear interrupt disable.
    CLI,
    /// Clear overflow.
    CLV,
    /// Compare with A.
    CMP,
    /// Compare with X.
    CPX,
    /// Compare with Y.
    CPY,
    /// Decrement memory.
    DEC,
    /// Decrement X.
    DEX,
    /// Decrement Y.
    DEY,
    /// Exclusive or with A.
    EOR,
    /// Increment memory.
    INC,
    /// Increment X.
    INX,
    /// Increment Y.
    INY,
    /// Jump.
    JMP,
    /// Jump to subroutine.
    JSR,
    /// Load A.
    LDA,
    /// Load X.
    LDX,
    /// Load Y.
    LDY,
    /// Logical shift right.
    LSR,
    /// No operation.
    NOP,
    /// Bitwise or with A.
    ORA,
    /// Push A.
    PHA,
    /// Push P.
    PHP,
    /// Pull A.
    PLA,
    /// Pull P.
    PLP,
    /// Rotate left through carry.
    ROL,
    /// Rotate right through carry.
    ROR,
    /// Return from interrupt.
    RTI,
    /// Return from subroutine.
    RTS,
    /// Subtract with borrow (carry clear means borrow).
    SBC,
    /// Set carry.
    SEC,
    /// Set decimal mode.
    SED,
    /// Set interrupt disable.
    SEI,
    /// Store A.
    STA,
    /// Store X.
    STX,
    /// Store Y.
    STY,
    /// Transfer A to X.
    TAX,
    /// Transfer A to Y.
    TAY,
    /// Transfer S to X.
    TSX,
    /// Transfer X to A.
    TXA,
    /// Transfer X to S. No flags are set from S loads.
    TXS,
    /// Transfer Y to A.
    TYA,
}

/// `Register` names the CPU registers for loads and error reporting.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, EnumString)]
#[allow(clippy::upper_case_acronyms)]
pub enum Register {
    /// Accumulator
    A,
    /// X index
    X,
    /// Y index
    Y,
    /// Stack pointer
    S,
    /// Status
    P,
    /// Program counter
    PC,
}

/// `STACK_START` is the location in memory where the stack page starts.
pub const STACK_START: u16 = 0x0100;

#[derive(Debug, Default, Display, Copy, Clone, PartialEq, Eq, EnumString, Serialize, Deserialize)]
/// `State` defines the current CPU state.
pub enum State {
    /// The state after construction. PC and S still need to be set
    /// before `step` will run anything.
    #[default]
    Created,

    /// At least one instruction has run.
    Running,

    /// An unknown opcode was fetched. Nothing else will run.
    Halted,
}

/// `CPUError` defines specific conditions where `step` may return
/// an error. Use this to determine specific internal issues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CPUError {
    /// The byte at PC isn't a documented opcode. Once this happens
    /// every later `step` returns it again.
    #[error("Unknown opcode {op:02X} at PC {pc:04X}")]
    UnknownOpcode {
        /// op is the byte which was fetched.
        op: u8,
        /// pc is where it was fetched from.
        pc: u16,
    },

    /// A register which has no defined startup value was never set.
    #[error("Invalid initial state: {register} was never set")]
    InvalidInitialState {
        /// register is the one which needs a value.
        register: Register,
    },
}

/// `CPUState` is the public information about the CPU at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CPUState {
    /// CPU state
    pub state: State,

    /// Accumulator register
    pub a: u8,

    /// X register
    pub x: u8,

    /// Y register
    pub y: u8,

    /// Stack pointer
    pub s: u8,

    /// Status register
    pub p: Flags,

    /// Program counter
    pub pc: u16,

    /// How many clocks have run since construction
    pub clocks: usize,

    /// How many instructions have run since construction
    pub instructions: usize,

    /// The dissasembly of the instruction at PC
    pub dis: String,
}

impl fmt::Display for CPUState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10} {:<28}: A: {:02X} X: {:02X} Y: {:02X} S: {:02X} P: {}",
            self.clocks, self.dis, self.a, self.x, self.y, self.s, self.p,
        )
    }
}

/// `ChipDef` defines what a `CPU6502` is constructed from.
pub struct ChipDef {
    /// The memory the CPU will run against. The CPU keeps it behind an
    /// `Rc` so the host can hold a handle as well via `ram()`.
    pub ram: Box<dyn Memory>,
}

/// The NMOS 6502 implementation. Each `step` runs one complete instruction.
///
/// A, X and Y start at zero and P at 0x20. PC and S have no defined startup
/// value so both must be set with `pc_mut` and `s_mut` before the first `step`.
pub struct CPU6502 {
    state: State,
    a: Wrapping<u8>,
    x: Wrapping<u8>,
    y: Wrapping<u8>,
    s: Wrapping<u8>,
    p: Flags,
    pc: Wrapping<u16>,
    ram: Rc<RefCell<Box<dyn Memory>>>,
    clocks: usize,
    instructions: usize,
    pc_set: bool,
    s_set: bool,
    halted: Option<CPUError>,
}

impl CPU6502 {
    /// Build a new CPU against the given memory.
    #[must_use]
    pub fn new(def: ChipDef) -> Self {
        Self {
            state: State::Created,
            a: Wrapping(0x00),
            x: Wrapping(0x00),
            y: Wrapping(0x00),
            s: Wrapping(0x00),
            p: Flags::default(),
            pc: Wrapping(0x0000),
            ram: Rc::new(RefCell::new(def.ram)),
            clocks: 0,
            instructions: 0,
            pc_set: false,
            s_set: false,
            halted: None,
        }
    }

    /// ram returns a reference to the Memory implementation.
    #[must_use]
    pub fn ram(&self) -> Rc<RefCell<Box<dyn Memory>>> {
        Rc::clone(&self.ram)
    }

    /// state returns the current execution state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// pc returns the current PC value.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc.0
    }

    /// `pc_mut` sets PC to the given address.
    pub fn pc_mut(&mut self, new: u16) {
        self.pc = Wrapping(new);
        self.pc_set = true;
    }

    /// s returns the stack pointer.
    #[must_use]
    pub fn s(&self) -> Wrapping<u8> {
        self.s
    }

    /// `s_mut` sets the stack pointer.
    pub fn s_mut(&mut self, new: Wrapping<u8>) {
        self.s = new;
        self.s_set = true;
    }

    /// a returns the accumulator.
    #[must_use]
    pub fn a(&self) -> Wrapping<u8> {
        self.a
    }

    /// `a_mut` sets the accumulator.
    pub fn a_mut(&mut self, new: Wrapping<u8>) {
        self.a = new;
    }

    /// x returns the X register.
    #[must_use]
    pub fn x(&self) -> Wrapping<u8> {
        self.x
    }

    /// `x_mut` sets the X register.
    pub fn x_mut(&mut self, new: Wrapping<u8>) {
        self.x = new;
    }

    /// y returns the Y register.
    #[must_use]
    pub fn y(&self) -> Wrapping<u8> {
        self.y
    }

    /// `y_mut` sets the Y register.
    pub fn y_mut(&mut self, new: Wrapping<u8>) {
        self.y = new;
    }

    /// p returns the status register.
    #[must_use]
    pub fn p(&self) -> Flags {
        self.p
    }

    /// `p_mut` replaces the status register.
    pub fn p_mut(&mut self, new: Flags) {
        self.p = new;
    }

    /// clocks returns the total cycles run so far.
    #[must_use]
    pub fn clocks(&self) -> usize {
        self.clocks
    }

    /// instructions returns the total instructions run so far.
    #[must_use]
    pub fn instructions(&self) -> usize {
        self.instructions
    }

    /// `cpu_state` takes a snapshot of the registers along with the
    /// disassembly of the instruction at PC.
    #[must_use]
    pub fn cpu_state(&self) -> CPUState {
        let (dis, _) = disassemble(self.pc.0, self.ram.borrow().as_ref());
        CPUState {
            state: self.state,
            a: self.a.0,
            x: self.x.0,
            y: self.y.0,
            s: self.s.0,
            p: self.p,
            pc: self.pc.0,
            clocks: self.clocks,
            instructions: self.instructions,
            dis,
        }
    }

    /// step fetches, decodes and executes the instruction at PC. It returns the
    /// number of cycles the instruction took including any page crossing,
    /// taken branch or decimal mode penalties.
    ///
    /// # Errors
    /// If PC or S were never set an `InvalidInitialState` is returned.
    /// If the opcode at PC isn't a documented one `UnknownOpcode` is returned
    /// and the CPU halts with PC left on the offending byte. Every later call
    /// returns the same error.
    pub fn step(&mut self) -> Result<usize> {
        // Fast path if halted. PC doesn't advance nor do we take clocks.
        if let Some(err) = &self.halted {
            return Err(ErrReport::new(err.clone()));
        }
        if !self.pc_set {
            return Err(ErrReport::new(CPUError::InvalidInitialState {
                register: Register::PC,
            }));
        }
        if !self.s_set {
            return Err(ErrReport::new(CPUError::InvalidInitialState {
                register: Register::S,
            }));
        }

        let pc = self.pc.0;
        let op = self.ram.borrow().read(pc);
        let Some(ins) = instruction(op) else {
            let err = CPUError::UnknownOpcode { op, pc };
            warn!("halting: {err}");
            self.state = State::Halted;
            self.halted = Some(err.clone());
            return Err(ErrReport::new(err));
        };

        if log_enabled!(Level::Trace) {
            trace!("{}", self.cpu_state());
        }

        self.state = State::Running;
        let cycles = (ins.handler)(self, ins)?;
        self.clocks += cycles;
        self.instructions += 1;
        Ok(cycles)
    }

    // next_byte returns the first operand byte of the current instruction.
    fn next_byte(&self) -> u8 {
        self.ram.borrow().read((self.pc + Wrapping(1)).0)
    }

    // next_word returns the 16 bit operand of the current instruction.
    fn next_word(&self) -> u16 {
        let lo = self.next_byte();
        let hi = self.ram.borrow().read((self.pc + Wrapping(2)).0);
        u16::from_le_bytes([lo, hi])
    }

    // advance moves PC past the current instruction and returns its base cycles.
    fn advance(&mut self, ins: &Instruction) -> usize {
        self.pc += Wrapping(ins.length);
        ins.cycles
    }

    // load_register sets the given register to val and updates N and Z.
    fn load_register(&mut self, reg: Register, val: u8) -> Result<()> {
        match reg {
            Register::A => self.a = Wrapping(val),
            Register::X => self.x = Wrapping(val),
            Register::Y => self.y = Wrapping(val),
            Register::S | Register::P | Register::PC => {
                return Err(eyre!("load_register: invalid register {reg}"));
            }
        }
        self.p.compute_negative(u16::from(val));
        self.p.compute_zero(u16::from(val));
        Ok(())
    }
}
