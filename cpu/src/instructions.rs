//! The per opcode handlers bound into the instruction table. Each one reads
//! its operands relative to the current PC, does its work, moves PC and
//! returns the cycles taken.
// Every handler has to match the Handler signature even if it can't fail.
#![allow(clippy::unnecessary_wraps)]

use std::num::Wrapping;

use color_eyre::eyre::{eyre, Result};
use log::debug;

use crate::addressing::detect_page_crossing;
use crate::alu;
use crate::flags::P_B;
use crate::{AddressMode, Flags, Instruction, Register, CPU6502, IRQ_VECTOR};

impl CPU6502 {
    // load implements LDA/LDX/LDY. A page crossing on indexed modes costs a cycle.
    fn load(&mut self, ins: &Instruction, reg: Register) -> Result<usize> {
        let (val, crossed) = self.read_operand(ins.mode)?;
        self.load_register(reg, val)?;
        Ok(self.advance(ins) + usize::from(crossed))
    }

    pub(crate) fn lda(&mut self, ins: &Instruction) -> Result<usize> {
        self.load(ins, Register::A)
    }

    pub(crate) fn ldx(&mut self, ins: &Instruction) -> Result<usize> {
        self.load(ins, Register::X)
    }

    pub(crate) fn ldy(&mut self, ins: &Instruction) -> Result<usize> {
        self.load(ins, Register::Y)
    }

    // store implements STA/STX/STY. Stores always take their full cycle count
    // so there's no page crossing adjustment.
    fn store(&mut self, ins: &Instruction, val: u8) -> Result<usize> {
        self.write_operand(ins.mode, val)?;
        Ok(self.advance(ins))
    }

    pub(crate) fn sta(&mut self, ins: &Instruction) -> Result<usize> {
        self.store(ins, self.a.0)
    }

    pub(crate) fn stx(&mut self, ins: &Instruction) -> Result<usize> {
        self.store(ins, self.x.0)
    }

    pub(crate) fn sty(&mut self, ins: &Instruction) -> Result<usize> {
        self.store(ins, self.y.0)
    }

    // accumulate implements the instructions which combine an operand into A
    // through an ALU function.
    fn accumulate(&mut self, ins: &Instruction, f: fn(&mut Flags, u8, u8) -> u8) -> Result<usize> {
        let (val, crossed) = self.read_operand(ins.mode)?;
        self.a = Wrapping(f(&mut self.p, self.a.0, val));
        Ok(self.advance(ins) + usize::from(crossed))
    }

    pub(crate) fn and(&mut self, ins: &Instruction) -> Result<usize> {
        self.accumulate(ins, alu::and)
    }

    pub(crate) fn eor(&mut self, ins: &Instruction) -> Result<usize> {
        self.accumulate(ins, alu::xor)
    }

    pub(crate) fn ora(&mut self, ins: &Instruction) -> Result<usize> {
        self.accumulate(ins, alu::or)
    }

    // adc and sbc both cost an extra cycle when run in decimal mode.
    pub(crate) fn adc(&mut self, ins: &Instruction) -> Result<usize> {
        let (val, crossed) = self.read_operand(ins.mode)?;
        let carry = self.p.carry();
        self.a = Wrapping(alu::add(&mut self.p, self.a.0, val, carry));
        Ok(self.advance(ins) + usize::from(crossed) + usize::from(self.p.decimal()))
    }

    pub(crate) fn sbc(&mut self, ins: &Instruction) -> Result<usize> {
        let (val, crossed) = self.read_operand(ins.mode)?;
        let carry = self.p.carry();
        self.a = Wrapping(alu::subtract(&mut self.p, self.a.0, val, carry));
        Ok(self.advance(ins) + usize::from(crossed) + usize::from(self.p.decimal()))
    }

    // compare implements CMP/CPX/CPY against the given register value.
    fn compare(&mut self, ins: &Instruction, reg: u8) -> Result<usize> {
        let (val, crossed) = self.read_operand(ins.mode)?;
        alu::compare(&mut self.p, reg, val);
        Ok(self.advance(ins) + usize::from(crossed))
    }

    pub(crate) fn cmp(&mut self, ins: &Instruction) -> Result<usize> {
        self.compare(ins, self.a.0)
    }

    pub(crate) fn cpx(&mut self, ins: &Instruction) -> Result<usize> {
        self.compare(ins, self.x.0)
    }

    pub(crate) fn cpy(&mut self, ins: &Instruction) -> Result<usize> {
        self.compare(ins, self.y.0)
    }

    pub(crate) fn bit(&mut self, ins: &Instruction) -> Result<usize> {
        let (val, _) = self.read_operand(ins.mode)?;
        alu::bit_test(&mut self.p, self.a.0, val);
        Ok(self.advance(ins))
    }

    // rmw implements the read/modify/write instructions. Accumulator mode
    // works on A directly, everything else reads and writes back through
    // the same addressing mode.
    fn rmw(&mut self, ins: &Instruction, f: fn(&mut Flags, u8) -> u8) -> Result<usize> {
        if ins.mode == AddressMode::Accumulator {
            self.a = Wrapping(f(&mut self.p, self.a.0));
            return Ok(self.advance(ins));
        }
        let (val, _) = self.read_operand(ins.mode)?;
        let res = f(&mut self.p, val);
        self.write_operand(ins.mode, res)?;
        Ok(self.advance(ins))
    }

    pub(crate) fn asl(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::shift_left)
    }

    pub(crate) fn lsr(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::shift_right)
    }

    pub(crate) fn rol(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::rotate_left)
    }

    pub(crate) fn ror(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::rotate_right)
    }

    pub(crate) fn inc(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::increment)
    }

    pub(crate) fn dec(&mut self, ins: &Instruction) -> Result<usize> {
        self.rmw(ins, alu::decrement)
    }

    pub(crate) fn inx(&mut self, ins: &Instruction) -> Result<usize> {
        self.x = Wrapping(alu::increment(&mut self.p, self.x.0));
        Ok(self.advance(ins))
    }

    pub(crate) fn iny(&mut self, ins: &Instruction) -> Result<usize> {
        self.y = Wrapping(alu::increment(&mut self.p, self.y.0));
        Ok(self.advance(ins))
    }

    pub(crate) fn dex(&mut self, ins: &Instruction) -> Result<usize> {
        self.x = Wrapping(alu::decrement(&mut self.p, self.x.0));
        Ok(self.advance(ins))
    }

    pub(crate) fn dey(&mut self, ins: &Instruction) -> Result<usize> {
        self.y = Wrapping(alu::decrement(&mut self.p, self.y.0));
        Ok(self.advance(ins))
    }

    // transfer implements the register to register moves which set N/Z.
    fn transfer(&mut self, ins: &Instruction, reg: Register, val: u8) -> Result<usize> {
        self.load_register(reg, val)?;
        Ok(self.advance(ins))
    }

    pub(crate) fn tax(&mut self, ins: &Instruction) -> Result<usize> {
        self.transfer(ins, Register::X, self.a.0)
    }

    pub(crate) fn tay(&mut self, ins: &Instruction) -> Result<usize> {
        self.transfer(ins, Register::Y, self.a.0)
    }

    pub(crate) fn tsx(&mut self, ins: &Instruction) -> Result<usize> {
        self.transfer(ins, Register::X, self.s.0)
    }

    pub(crate) fn txa(&mut self, ins: &Instruction) -> Result<usize> {
        self.transfer(ins, Register::A, self.x.0)
    }

    pub(crate) fn tya(&mut self, ins: &Instruction) -> Result<usize> {
        self.transfer(ins, Register::A, self.y.0)
    }

    // txs doesn't touch any flags.
    pub(crate) fn txs(&mut self, ins: &Instruction) -> Result<usize> {
        self.s = self.x;
        Ok(self.advance(ins))
    }

    pub(crate) fn pha(&mut self, ins: &Instruction) -> Result<usize> {
        self.push_byte(self.a.0);
        Ok(self.advance(ins))
    }

    // php always pushes with B set.
    pub(crate) fn php(&mut self, ins: &Instruction) -> Result<usize> {
        self.push_byte(self.p.register() | P_B);
        Ok(self.advance(ins))
    }

    pub(crate) fn pla(&mut self, ins: &Instruction) -> Result<usize> {
        let val = self.pop_byte();
        self.load_register(Register::A, val)?;
        Ok(self.advance(ins))
    }

    // plp restores P from the stack and then leaves B set.
    pub(crate) fn plp(&mut self, ins: &Instruction) -> Result<usize> {
        let val = self.pop_byte();
        self.p.set_register(val);
        self.p.set_brk(true);
        Ok(self.advance(ins))
    }

    // flag implements the single flag set/clear instructions.
    fn flag(&mut self, ins: &Instruction, f: fn(&mut Flags, bool), on: bool) -> Result<usize> {
        f(&mut self.p, on);
        Ok(self.advance(ins))
    }

    pub(crate) fn clc(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_carry, false)
    }

    pub(crate) fn cld(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_decimal, false)
    }

    pub(crate) fn cli(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_irq_disabled, false)
    }

    pub(crate) fn clv(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_overflow, false)
    }

    pub(crate) fn sec(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_carry, true)
    }

    pub(crate) fn sed(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_decimal, true)
    }

    pub(crate) fn sei(&mut self, ins: &Instruction) -> Result<usize> {
        self.flag(ins, Flags::set_irq_disabled, true)
    }

    pub(crate) fn nop(&mut self, ins: &Instruction) -> Result<usize> {
        Ok(self.advance(ins))
    }

    // branch is shared by all the conditional branches. The target is relative
    // to the next instruction and costs an extra cycle if it lands in a
    // different page from it.
    fn branch(&mut self, ins: &Instruction, taken: bool) -> Result<usize> {
        let next = self.pc + Wrapping(ins.length);
        if !taken {
            self.pc = next;
            return Ok(ins.cycles);
        }
        // Sign extend the offset so it can simply be added.
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
        let offset = Wrapping(i16::from(self.next_byte() as i8) as u16);
        let target = next + offset;
        self.pc = target;
        Ok(ins.taken_cycles + usize::from(detect_page_crossing(next.0, target.0)))
    }

    pub(crate) fn bcc(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, !self.p.carry())
    }

    pub(crate) fn bcs(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, self.p.carry())
    }

    pub(crate) fn beq(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, self.p.zero())
    }

    pub(crate) fn bne(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, !self.p.zero())
    }

    pub(crate) fn bmi(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, self.p.negative())
    }

    pub(crate) fn bpl(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, !self.p.negative())
    }

    pub(crate) fn bvc(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, !self.p.overflow())
    }

    pub(crate) fn bvs(&mut self, ins: &Instruction) -> Result<usize> {
        self.branch(ins, self.p.overflow())
    }

    // jmp handles both absolute and indirect forms. The indirect form
    // reproduces the NMOS bug where the pointer's high byte is read from the
    // start of the same page if the low byte is at 0xFF.
    pub(crate) fn jmp(&mut self, ins: &Instruction) -> Result<usize> {
        let addr = self.next_word();
        match ins.mode {
            AddressMode::Absolute => self.pc = Wrapping(addr),
            AddressMode::AbsoluteIndirect => {
                let hi_addr = (addr & 0xFF00) | ((addr.wrapping_add(1)) & 0x00FF);
                let lo = self.read_absolute(addr);
                let hi = self.read_absolute(hi_addr);
                self.pc = Wrapping(u16::from_le_bytes([lo, hi]));
            }
            _ => return Err(eyre!("jmp: invalid mode {}", ins.mode)),
        }
        Ok(ins.cycles)
    }

    // jsr pushes the address of its own last byte. rts adds the one back.
    pub(crate) fn jsr(&mut self, ins: &Instruction) -> Result<usize> {
        let addr = self.next_word();
        self.push_word((self.pc + Wrapping(2)).0);
        self.pc = Wrapping(addr);
        Ok(ins.cycles)
    }

    pub(crate) fn rts(&mut self, ins: &Instruction) -> Result<usize> {
        self.pc = Wrapping(self.pop_word()) + Wrapping(1);
        Ok(ins.cycles)
    }

    // brk skips its padding byte, pushes PC and P (with B set) and
    // vectors through IRQ_VECTOR with interrupts disabled.
    pub(crate) fn brk(&mut self, ins: &Instruction) -> Result<usize> {
        self.pc += Wrapping(2);
        self.p.set_brk(true);
        self.push_word(self.pc.0);
        self.push_byte(self.p.register());
        self.p.set_irq_disabled(true);
        let vec = self.ram.borrow().read_word(IRQ_VECTOR);
        debug!("BRK from {:04X} to {vec:04X}", (self.pc - Wrapping(2)).0);
        self.pc = Wrapping(vec);
        Ok(ins.cycles)
    }

    // rti restores P and then PC as pushed. No adjustment to PC.
    pub(crate) fn rti(&mut self, ins: &Instruction) -> Result<usize> {
        let p = self.pop_byte();
        self.p.set_register(p);
        self.pc = Wrapping(self.pop_word());
        debug!("RTI to {:04X}", self.pc.0);
        Ok(ins.cycles)
    }
}
