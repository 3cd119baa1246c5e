use std::num::Wrapping;

use crate::{CPU6502, STACK_START};

// The stack lives in page 1 and S simply wraps in either direction.
// There's no overflow/underflow detection as the hardware has none.
impl CPU6502 {
    /// `push_byte` writes val at the current stack location and decrements S.
    pub fn push_byte(&mut self, val: u8) {
        self.ram
            .borrow_mut()
            .write(u16::from(self.s.0) | STACK_START, val);
        self.s -= Wrapping(1);
    }

    /// `pop_byte` increments S and returns the value it now points at.
    pub fn pop_byte(&mut self) -> u8 {
        self.s += Wrapping(1);
        self.ram.borrow().read(u16::from(self.s.0) | STACK_START)
    }

    /// `push_word` pushes the high byte and then the low byte so the
    /// word ends up little endian in memory.
    pub fn push_word(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    /// `pop_word` pops the low byte and then the high byte.
    pub fn pop_word(&mut self) -> u16 {
        let lo = self.pop_byte();
        let hi = self.pop_byte();
        u16::from_le_bytes([lo, hi])
    }
}
