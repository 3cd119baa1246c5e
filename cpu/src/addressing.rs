//! Effective address resolution and the read/write pair for each addressing
//! mode family. Everything in zero page wraps within zero page, including the
//! second byte of a pointer read from 0xFF.
use std::num::Wrapping;

use color_eyre::eyre::{eyre, Result};

use crate::{AddressMode, CPU6502};

/// `detect_page_crossing` returns true if the two addresses are in different
/// 256 byte pages.
#[must_use]
pub const fn detect_page_crossing(addr1: u16, addr2: u16) -> bool {
    (addr1 & 0xFF00) != (addr2 & 0xFF00)
}

impl CPU6502 {
    // zero_page_pointer reads a 16 bit pointer out of zero page. The high byte
    // comes from zp+1 wrapped back into zero page.
    fn zero_page_pointer(&self, zp: u8) -> u16 {
        let ram = self.ram.borrow();
        let lo = ram.read(u16::from(zp));
        let hi = ram.read(u16::from(zp.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    /// `absolute_indexed_address` adds index to base and reports whether that
    /// moved into a different page.
    #[must_use]
    pub fn absolute_indexed_address(&self, base: u16, index: u8) -> (u16, bool) {
        let addr = (Wrapping(base) + Wrapping(u16::from(index))).0;
        (addr, detect_page_crossing(base, addr))
    }

    /// `zero_page_indexed_address` adds index to zp and wraps within zero page.
    #[must_use]
    pub fn zero_page_indexed_address(&self, zp: u8, index: u8) -> u16 {
        u16::from(zp.wrapping_add(index))
    }

    /// `indexed_indirect_address` resolves (zp,X).
    #[must_use]
    pub fn indexed_indirect_address(&self, zp: u8) -> u16 {
        self.zero_page_pointer(zp.wrapping_add(self.x.0))
    }

    /// `indirect_indexed_address` resolves (zp),Y and reports whether adding Y
    /// moved the pointer into a different page.
    #[must_use]
    pub fn indirect_indexed_address(&self, zp: u8) -> (u16, bool) {
        let base = self.zero_page_pointer(zp);
        self.absolute_indexed_address(base, self.y.0)
    }

    /// Read from a 16 bit address.
    #[must_use]
    pub fn read_absolute(&self, addr: u16) -> u8 {
        self.ram.borrow().read(addr)
    }

    /// Write to a 16 bit address.
    pub fn write_absolute(&mut self, addr: u16, val: u8) {
        self.ram.borrow_mut().write(addr, val);
    }

    /// Read from base+index. Also returns whether a page was crossed.
    #[must_use]
    pub fn read_absolute_indexed(&self, base: u16, index: u8) -> (u8, bool) {
        let (addr, crossed) = self.absolute_indexed_address(base, index);
        (self.read_absolute(addr), crossed)
    }

    /// Write to base+index.
    pub fn write_absolute_indexed(&mut self, base: u16, index: u8, val: u8) {
        let (addr, _) = self.absolute_indexed_address(base, index);
        self.write_absolute(addr, val);
    }

    /// Read from zero page.
    #[must_use]
    pub fn read_zero_page(&self, zp: u8) -> u8 {
        self.ram.borrow().read(u16::from(zp))
    }

    /// Write to zero page.
    pub fn write_zero_page(&mut self, zp: u8, val: u8) {
        self.ram.borrow_mut().write(u16::from(zp), val);
    }

    /// Read from zp+index wrapped within zero page.
    #[must_use]
    pub fn read_zero_page_indexed(&self, zp: u8, index: u8) -> u8 {
        self.read_absolute(self.zero_page_indexed_address(zp, index))
    }

    /// Write to zp+index wrapped within zero page.
    pub fn write_zero_page_indexed(&mut self, zp: u8, index: u8, val: u8) {
        let addr = self.zero_page_indexed_address(zp, index);
        self.write_absolute(addr, val);
    }

    /// Read through (zp,X).
    #[must_use]
    pub fn read_indexed_indirect(&self, zp: u8) -> u8 {
        self.read_absolute(self.indexed_indirect_address(zp))
    }

    /// Write through (zp,X).
    pub fn write_indexed_indirect(&mut self, zp: u8, val: u8) {
        let addr = self.indexed_indirect_address(zp);
        self.write_absolute(addr, val);
    }

    /// Read through (zp),Y. Also returns whether a page was crossed.
    #[must_use]
    pub fn read_indirect_indexed(&self, zp: u8) -> (u8, bool) {
        let (addr, crossed) = self.indirect_indexed_address(zp);
        (self.read_absolute(addr), crossed)
    }

    /// Write through (zp),Y.
    pub fn write_indirect_indexed(&mut self, zp: u8, val: u8) {
        let (addr, _) = self.indirect_indexed_address(zp);
        self.write_absolute(addr, val);
    }

    // read_operand returns the operand value for the current instruction and
    // whether indexing crossed a page.
    pub(crate) fn read_operand(&self, mode: AddressMode) -> Result<(u8, bool)> {
        match mode {
            AddressMode::Immediate => Ok((self.next_byte(), false)),
            AddressMode::ZeroPage => Ok((self.read_zero_page(self.next_byte()), false)),
            AddressMode::ZeroPageX => Ok((
                self.read_zero_page_indexed(self.next_byte(), self.x.0),
                false,
            )),
            AddressMode::ZeroPageY => Ok((
                self.read_zero_page_indexed(self.next_byte(), self.y.0),
                false,
            )),
            AddressMode::IndirectX => Ok((self.read_indexed_indirect(self.next_byte()), false)),
            AddressMode::IndirectY => Ok(self.read_indirect_indexed(self.next_byte())),
            AddressMode::Absolute => Ok((self.read_absolute(self.next_word()), false)),
            AddressMode::AbsoluteX => Ok(self.read_absolute_indexed(self.next_word(), self.x.0)),
            AddressMode::AbsoluteY => Ok(self.read_absolute_indexed(self.next_word(), self.y.0)),
            AddressMode::AbsoluteIndirect
            | AddressMode::Accumulator
            | AddressMode::Implied
            | AddressMode::Relative => Err(eyre!("read_operand: invalid mode {mode}")),
        }
    }

    // write_operand stores val using the current instruction's mode.
    pub(crate) fn write_operand(&mut self, mode: AddressMode, val: u8) -> Result<()> {
        let zp = self.next_byte();
        match mode {
            AddressMode::ZeroPage => self.write_zero_page(zp, val),
            AddressMode::ZeroPageX => self.write_zero_page_indexed(zp, self.x.0, val),
            AddressMode::ZeroPageY => self.write_zero_page_indexed(zp, self.y.0, val),
            AddressMode::IndirectX => self.write_indexed_indirect(zp, val),
            AddressMode::IndirectY => self.write_indirect_indexed(zp, val),
            AddressMode::Absolute => self.write_absolute(self.next_word(), val),
            AddressMode::AbsoluteX => self.write_absolute_indexed(self.next_word(), self.x.0, val),
            AddressMode::AbsoluteY => self.write_absolute_indexed(self.next_word(), self.y.0, val),
            AddressMode::Immediate
            | AddressMode::AbsoluteIndirect
            | AddressMode::Accumulator
            | AddressMode::Implied
            | AddressMode::Relative => return Err(eyre!("write_operand: invalid mode {mode}")),
        }
        Ok(())
    }
}
