use std::num::Wrapping;

use memory::Memory;

use crate::{instruction, AddressMode};

/// disassemble will take the given pc and Memory implementation and disassemble the segment
/// at that location. It will return a string of the dissembly as well as the next pc
/// to continue disassembling.
/// As a real 6502 will wrap around if it's asked to step off the end
/// this will do the same. i.e. disassembling 0xFFFF with a multi-byte opcode will result
/// in reading 0x0000 and 0x0001 and returning a pc from that area as well.
/// Undocumented opcodes show up as ??? and are treated as a single byte.
#[must_use]
pub fn disassemble(pc: u16, r: &dyn Memory) -> (String, u16) {
    let pc = Wrapping(pc);
    let op = r.read(pc.0);
    let pc1 = r.read((pc + Wrapping(1)).0);
    let pc2 = r.read((pc + Wrapping(2)).0);

    let Some(ins) = instruction(op) else {
        return (
            format!("{:04X} {op:02X}         ???", pc.0),
            (pc + Wrapping(1)).0,
        );
    };
    let opcode = ins.op;

    let operands = match ins.mode {
        AddressMode::Immediate => format!("{pc1:02X}      {opcode} #${pc1:02X}"),
        AddressMode::ZeroPage => format!("{pc1:02X}      {opcode} ${pc1:02X}"),
        AddressMode::ZeroPageX => format!("{pc1:02X}      {opcode} ${pc1:02X},X"),
        AddressMode::ZeroPageY => format!("{pc1:02X}      {opcode} ${pc1:02X},Y"),
        AddressMode::IndirectX => format!("{pc1:02X}      {opcode} (${pc1:02X},X)"),
        AddressMode::IndirectY => format!("{pc1:02X}      {opcode} (${pc1:02X}),Y"),
        AddressMode::Absolute => format!("{pc1:02X} {pc2:02X}   {opcode} ${pc2:02X}{pc1:02X}"),
        AddressMode::AbsoluteX => format!("{pc1:02X} {pc2:02X}   {opcode} ${pc2:02X}{pc1:02X},X"),
        AddressMode::AbsoluteY => format!("{pc1:02X} {pc2:02X}   {opcode} ${pc2:02X}{pc1:02X},Y"),
        AddressMode::AbsoluteIndirect => {
            format!("{pc1:02X} {pc2:02X}   {opcode} (${pc2:02X}{pc1:02X})")
        }
        AddressMode::Accumulator => format!("        {opcode} A"),
        AddressMode::Implied => format!("        {opcode}"),
        AddressMode::Relative => {
            // Sign extend a 16 bit value so it can be added to PC for branch offsets
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
            let offset = Wrapping(i16::from(pc1 as i8) as u16);
            format!(
                "{pc1:02X}      {opcode} ${pc1:02X} (${:04X})",
                pc + offset + Wrapping(2u16)
            )
        }
    };

    (
        format!("{:04X} {op:02X} {operands}", pc.0),
        (pc + Wrapping(ins.length)).0,
    )
}
