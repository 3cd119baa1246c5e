use std::fmt;
use std::sync::LazyLock;

use ahash::{AHashMap, AHashSet};
use color_eyre::eyre::{eyre, Result};
use strum::IntoEnumIterator;

use crate::{AddressMode, Opcode, CPU6502};

/// Handler is the function bound to an opcode. It runs the instruction
/// (operand fetch, work and PC update) and returns the cycles it took.
pub type Handler = fn(&mut CPU6502, &Instruction) -> Result<usize>;

/// Instruction describes one opcode byte. These are built once into a
/// table shared by every `CPU6502` and never change afterwards.
#[derive(Clone, Copy)]
pub struct Instruction {
    /// The opcode byte itself.
    pub opcode: u8,
    /// The mnemonic. Only used for display/debugging.
    pub op: Opcode,
    /// How the operand bytes are interpreted.
    pub mode: AddressMode,
    /// Length in bytes including the opcode.
    pub length: u16,
    /// Base cycle count.
    pub cycles: usize,
    /// Cycle count for a taken branch before any page crossing. Same as
    /// cycles for everything which isn't a branch.
    pub taken_cycles: usize,
    pub(crate) handler: Handler,
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("opcode", &format_args!("{:#04X}", self.opcode))
            .field("op", &self.op)
            .field("mode", &self.mode)
            .field("length", &self.length)
            .field("cycles", &self.cycles)
            .field("taken_cycles", &self.taken_cycles)
            .finish_non_exhaustive()
    }
}

// NMOS_DEFINITIONS lists every documented opcode grouped by mnemonic along with
// its addressing mode, byte value and base cycle count.
// Anything not listed here is an undocumented opcode and isn't supported.
#[rustfmt::skip]
const NMOS_DEFINITIONS: &[(Opcode, &[(AddressMode, u8, usize)])] = &[
    (Opcode::ADC, &[
        (AddressMode::Immediate, 0x69, 2), (AddressMode::ZeroPage, 0x65, 3),
        (AddressMode::ZeroPageX, 0x75, 4), (AddressMode::Absolute, 0x6D, 4),
        (AddressMode::AbsoluteX, 0x7D, 4), (AddressMode::AbsoluteY, 0x79, 4),
        (AddressMode::IndirectX, 0x61, 6), (AddressMode::IndirectY, 0x71, 5),
    ]),
    (Opcode::AND, &[
        (AddressMode::Immediate, 0x29, 2), (AddressMode::ZeroPage, 0x25, 3),
        (AddressMode::ZeroPageX, 0x35, 4), (AddressMode::Absolute, 0x2D, 4),
        (AddressMode::AbsoluteX, 0x3D, 4), (AddressMode::AbsoluteY, 0x39, 4),
        (AddressMode::IndirectX, 0x21, 6), (AddressMode::IndirectY, 0x31, 5),
    ]),
    (Opcode::ASL, &[
        (AddressMode::Accumulator, 0x0A, 2), (AddressMode::ZeroPage, 0x06, 5),
        (AddressMode::ZeroPageX, 0x16, 6), (AddressMode::Absolute, 0x0E, 6),
        (AddressMode::AbsoluteX, 0x1E, 7),
    ]),
    (Opcode::BCC, &[(AddressMode::Relative, 0x90, 2)]),
    (Opcode::BCS, &[(AddressMode::Relative, 0xB0, 2)]),
    (Opcode::BEQ, &[(AddressMode::Relative, 0xF0, 2)]),
    (Opcode::BIT, &[(AddressMode::ZeroPage, 0x24, 3), (AddressMode::Absolute, 0x2C, 4)]),
    (Opcode::BMI, &[(AddressMode::Relative, 0x30, 2)]),
    (Opcode::BNE, &[(AddressMode::Relative, 0xD0, 2)]),
    (Opcode::BPL, &[(AddressMode::Relative, 0x10, 2)]),
    (Opcode::BRK, &[(AddressMode::Implied, 0x00, 7)]),
    (Opcode::BVC, &[(AddressMode::Relative, 0x50, 2)]),
    (Opcode::BVS, &[(AddressMode::Relative, 0x70, 2)]),
    (Opcode::CLC, &[(AddressMode::Implied, 0x18, 2)]),
    (Opcode::CLD, &[(AddressMode::Implied, 0xD8, 2)]),
    (Opcode::CLI, &[(AddressMode::Implied, 0x58, 2)]),
    (Opcode::CLV, &[(AddressMode::Implied, 0xB8, 2)]),
    (Opcode::CMP, &[
        (AddressMode::Immediate, 0xC9, 2), (AddressMode::ZeroPage, 0xC5, 3),
        (AddressMode::ZeroPageX, 0xD5, 4), (AddressMode::Absolute, 0xCD, 4),
        (AddressMode::AbsoluteX, 0xDD, 4), (AddressMode::AbsoluteY, 0xD9, 4),
        (AddressMode::IndirectX, 0xC1, 6), (AddressMode::IndirectY, 0xD1, 5),
    ]),
    (Opcode::CPX, &[
        (AddressMode::Immediate, 0xE0, 2), (AddressMode::ZeroPage, 0xE4, 3),
        (AddressMode::Absolute, 0xEC, 4),
    ]),
    (Opcode::CPY, &[
        (AddressMode::Immediate, 0xC0, 2), (AddressMode::ZeroPage, 0xC4, 3),
        (AddressMode::Absolute, 0xCC, 4),
    ]),
    (Opcode::DEC, &[
        (AddressMode::ZeroPage, 0xC6, 5), (AddressMode::ZeroPageX, 0xD6, 6),
        (AddressMode::Absolute, 0xCE, 6), (AddressMode::AbsoluteX, 0xDE, 7),
    ]),
    (Opcode::DEX, &[(AddressMode::Implied, 0xCA, 2)]),
    (Opcode::DEY, &[(AddressMode::Implied, 0x88, 2)]),
    (Opcode::EOR, &[
        (AddressMode::Immediate, 0x49, 2), (AddressMode::ZeroPage, 0x45, 3),
        (AddressMode::ZeroPageX, 0x55, 4), (AddressMode::Absolute, 0x4D, 4),
        (AddressMode::AbsoluteX, 0x5D, 4), (AddressMode::AbsoluteY, 0x59, 4),
        (AddressMode::IndirectX, 0x41, 6), (AddressMode::IndirectY, 0x51, 5),
    ]),
    (Opcode::INC, &[
        (AddressMode::ZeroPage, 0xE6, 5), (AddressMode::ZeroPageX, 0xF6, 6),
        (AddressMode::Absolute, 0xEE, 6), (AddressMode::AbsoluteX, 0xFE, 7),
    ]),
    (Opcode::INX, &[(AddressMode::Implied, 0xE8, 2)]),
    (Opcode::INY, &[(AddressMode::Implied, 0xC8, 2)]),
    (Opcode::JMP, &[(AddressMode::Absolute, 0x4C, 3), (AddressMode::AbsoluteIndirect, 0x6C, 5)]),
    (Opcode::JSR, &[(AddressMode::Absolute, 0x20, 6)]),
    (Opcode::LDA, &[
        (AddressMode::Immediate, 0xA9, 2), (AddressMode::ZeroPage, 0xA5, 3),
        (AddressMode::ZeroPageX, 0xB5, 4), (AddressMode::Absolute, 0xAD, 4),
        (AddressMode::AbsoluteX, 0xBD, 4), (AddressMode::AbsoluteY, 0xB9, 4),
        (AddressMode::IndirectX, 0xA1, 6), (AddressMode::IndirectY, 0xB1, 5),
    ]),
    (Opcode::LDX, &[
        (AddressMode::Immediate, 0xA2, 2), (AddressMode::ZeroPage, 0xA6, 3),
        (AddressMode::ZeroPageY, 0xB6, 4), (AddressMode::Absolute, 0xAE, 4),
        (AddressMode::AbsoluteY, 0xBE, 4),
    ]),
    (Opcode::LDY, &[
        (AddressMode::Immediate, 0xA0, 2), (AddressMode::ZeroPage, 0xA4, 3),
        (AddressMode::ZeroPageX, 0xB4, 4), (AddressMode::Absolute, 0xAC, 4),
        (AddressMode::AbsoluteX, 0xBC, 4),
    ]),
    (Opcode::LSR, &[
        (AddressMode::Accumulator, 0x4A, 2), (AddressMode::ZeroPage, 0x46, 5),
        (AddressMode::ZeroPageX, 0x56, 6), (AddressMode::Absolute, 0x4E, 6),
        (AddressMode::AbsoluteX, 0x5E, 7),
    ]),
    (Opcode::NOP, &[(AddressMode::Implied, 0xEA, 2)]),
    (Opcode::ORA, &[
        (AddressMode::Immediate, 0x09, 2), (AddressMode::ZeroPage, 0x05, 3),
        (AddressMode::ZeroPageX, 0x15, 4), (AddressMode::Absolute, 0x0D, 4),
        (AddressMode::AbsoluteX, 0x1D, 4), (AddressMode::AbsoluteY, 0x19, 4),
        (AddressMode::IndirectX, 0x01, 6), (AddressMode::IndirectY, 0x11, 5),
    ]),
    (Opcode::PHA, &[(AddressMode::Implied, 0x48, 3)]),
    (Opcode::PHP, &[(AddressMode::Implied, 0x08, 3)]),
    (Opcode::PLA, &[(AddressMode::Implied, 0x68, 4)]),
    (Opcode::PLP, &[(AddressMode::Implied, 0x28, 4)]),
    (Opcode::ROL, &[
        (AddressMode::Accumulator, 0x2A, 2), (AddressMode::ZeroPage, 0x26, 5),
        (AddressMode::ZeroPageX, 0x36, 6), (AddressMode::Absolute, 0x2E, 6),
        (AddressMode::AbsoluteX, 0x3E, 7),
    ]),
    (Opcode::ROR, &[
        (AddressMode::Accumulator, 0x6A, 2), (AddressMode::ZeroPage, 0x66, 5),
        (AddressMode::ZeroPageX, 0x76, 6), (AddressMode::Absolute, 0x6E, 6),
        (AddressMode::AbsoluteX, 0x7E, 7),
    ]),
    (Opcode::RTI, &[(AddressMode::Implied, 0x40, 6)]),
    (Opcode::RTS, &[(AddressMode::Implied, 0x60, 6)]),
    (Opcode::SBC, &[
        (AddressMode::Immediate, 0xE9, 2), (AddressMode::ZeroPage, 0xE5, 3),
        (AddressMode::ZeroPageX, 0xF5, 4), (AddressMode::Absolute, 0xED, 4),
        (AddressMode::AbsoluteX, 0xFD, 4), (AddressMode::AbsoluteY, 0xF9, 4),
        (AddressMode::IndirectX, 0xE1, 6), (AddressMode::IndirectY, 0xF1, 5),
    ]),
    (Opcode::SEC, &[(AddressMode::Implied, 0x38, 2)]),
    (Opcode::SED, &[(AddressMode::Implied, 0xF8, 2)]),
    (Opcode::SEI, &[(AddressMode::Implied, 0x78, 2)]),
    (Opcode::STA, &[
        (AddressMode::ZeroPage, 0x85, 3), (AddressMode::ZeroPageX, 0x95, 4),
        (AddressMode::Absolute, 0x8D, 4), (AddressMode::AbsoluteX, 0x9D, 5),
        (AddressMode::AbsoluteY, 0x99, 5), (AddressMode::IndirectX, 0x81, 6),
        (AddressMode::IndirectY, 0x91, 6),
    ]),
    (Opcode::STX, &[
        (AddressMode::ZeroPage, 0x86, 3), (AddressMode::ZeroPageY, 0x96, 4),
        (AddressMode::Absolute, 0x8E, 4),
    ]),
    (Opcode::STY, &[
        (AddressMode::ZeroPage, 0x84, 3), (AddressMode::ZeroPageX, 0x94, 4),
        (AddressMode::Absolute, 0x8C, 4),
    ]),
    (Opcode::TAX, &[(AddressMode::Implied, 0xAA, 2)]),
    (Opcode::TAY, &[(AddressMode::Implied, 0xA8, 2)]),
    (Opcode::TSX, &[(AddressMode::Implied, 0xBA, 2)]),
    (Opcode::TXA, &[(AddressMode::Implied, 0x8A, 2)]),
    (Opcode::TXS, &[(AddressMode::Implied, 0x9A, 2)]),
    (Opcode::TYA, &[(AddressMode::Implied, 0x98, 2)]),
];

// handler binds each mnemonic to the CPU6502 method which implements it.
// JMP covers both its modes as do all the read/modify/write instructions.
fn handler(op: Opcode) -> Handler {
    match op {
        Opcode::ADC => CPU6502::adc,
        Opcode::AND => CPU6502::and,
        Opcode::ASL => CPU6502::asl,
        Opcode::BCC => CPU6502::bcc,
        Opcode::BCS => CPU6502::bcs,
        Opcode::BEQ => CPU6502::beq,
        Opcode::BIT => CPU6502::bit,
        Opcode::BMI => CPU6502::bmi,
        Opcode::BNE => CPU6502::bne,
        Opcode::BPL => CPU6502::bpl,
        Opcode::BRK => CPU6502::brk,
        Opcode::BVC => CPU6502::bvc,
        Opcode::BVS => CPU6502::bvs,
        Opcode::CLC => CPU6502::clc,
        Opcode::CLD => CPU6502::cld,
        Opcode::CLI => CPU6502::cli,
        Opcode::CLV => CPU6502::clv,
        Opcode::CMP => CPU6502::cmp,
        Opcode::CPX => CPU6502::cpx,
        Opcode::CPY => CPU6502::cpy,
        Opcode::DEC => CPU6502::dec,
        Opcode::DEX => CPU6502::dex,
        Opcode::DEY => CPU6502::dey,
        Opcode::EOR => CPU6502::eor,
        Opcode::INC => CPU6502::inc,
        Opcode::INX => CPU6502::inx,
        Opcode::INY => CPU6502::iny,
        Opcode::JMP => CPU6502::jmp,
        Opcode::JSR => CPU6502::jsr,
        Opcode::LDA => CPU6502::lda,
        Opcode::LDX => CPU6502::ldx,
        Opcode::LDY => CPU6502::ldy,
        Opcode::LSR => CPU6502::lsr,
        Opcode::NOP => CPU6502::nop,
        Opcode::ORA => CPU6502::ora,
        Opcode::PHA => CPU6502::pha,
        Opcode::PHP => CPU6502::php,
        Opcode::PLA => CPU6502::pla,
        Opcode::PLP => CPU6502::plp,
        Opcode::ROL => CPU6502::rol,
        Opcode::ROR => CPU6502::ror,
        Opcode::RTI => CPU6502::rti,
        Opcode::RTS => CPU6502::rts,
        Opcode::SBC => CPU6502::sbc,
        Opcode::SEC => CPU6502::sec,
        Opcode::SED => CPU6502::sed,
        Opcode::SEI => CPU6502::sei,
        Opcode::STA => CPU6502::sta,
        Opcode::STX => CPU6502::stx,
        Opcode::STY => CPU6502::sty,
        Opcode::TAX => CPU6502::tax,
        Opcode::TAY => CPU6502::tay,
        Opcode::TSX => CPU6502::tsx,
        Opcode::TXA => CPU6502::txa,
        Opcode::TXS => CPU6502::txs,
        Opcode::TYA => CPU6502::tya,
    }
}

// INSTRUCTIONS is indexed directly by opcode byte. Undocumented opcodes are None.
static INSTRUCTIONS: LazyLock<[Option<Instruction>; 256]> = LazyLock::new(|| {
    let mut table: [Option<Instruction>; 256] = [None; 256];
    for (op, modes) in NMOS_DEFINITIONS {
        for &(mode, opcode, cycles) in *modes {
            let slot = &mut table[usize::from(opcode)];
            assert!(
                slot.is_none(),
                "NMOS_DEFINITIONS contains multiple entries for {opcode:#04X} found in opcode {op} but we already have {slot:?}"
            );
            let taken_cycles = if mode == AddressMode::Relative {
                cycles + 1
            } else {
                cycles
            };
            *slot = Some(Instruction {
                opcode,
                op: *op,
                mode,
                length: mode.length(),
                cycles,
                taken_cycles,
                handler: handler(*op),
            });
        }
    }
    table
});

// NMOS_OPCODES is the inverse of INSTRUCTIONS. It maps an Opcode to the valid addressing
// modes for it and the byte value for each. Used by anything assembling code.
static NMOS_OPCODES: LazyLock<AHashMap<Opcode, AHashMap<AddressMode, u8>>> = LazyLock::new(|| {
    let mut m: AHashMap<Opcode, AHashMap<AddressMode, u8>> = AHashMap::new();
    let mut seen = AHashSet::new();
    for ins in INSTRUCTIONS.iter().flatten() {
        m.entry(ins.op).or_default().insert(ins.mode, ins.opcode);
        seen.insert(ins.opcode);
    }

    // Make sure every opcode in the enum has a map entry.
    assert!(
        Opcode::iter().all(|op| m.contains_key(&op)),
        "Not all opcodes covered! - {m:?}"
    );
    assert!(seen.len() == 151, "Expected 151 documented opcodes and found {}", seen.len());
    m
});

/// instruction returns the descriptor for the given opcode byte or None if
/// it isn't a documented opcode.
#[must_use]
pub fn instruction(op: u8) -> Option<&'static Instruction> {
    INSTRUCTIONS[usize::from(op)].as_ref()
}

/// Given an `Opcode` and `AddressMode` return the byte value for it.
///
/// # Errors
/// If the `AddressMode` is not valid for this opcode an error will result.
pub fn resolve_opcode(op: Opcode, mode: AddressMode) -> Result<u8> {
    NMOS_OPCODES
        .get(&op)
        .and_then(|modes| modes.get(&mode))
        .copied()
        .ok_or_else(|| eyre!("address mode {mode} isn't valid for opcode {op}"))
}
