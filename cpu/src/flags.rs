use std::fmt;

use serde::{Deserialize, Serialize};

// The bitmasks for all of the Flags bits.
pub(crate) const P_NEGATIVE: u8 = 0x80;
pub(crate) const P_OVERFLOW: u8 = 0x40;
pub(crate) const P_S1: u8 = 0x20; // Always on
pub(crate) const P_B: u8 = 0x10;
pub(crate) const P_DECIMAL: u8 = 0x08;
pub(crate) const P_INTERRUPT: u8 = 0x04;
pub(crate) const P_ZERO: u8 = 0x02;
pub(crate) const P_CARRY: u8 = 0x01;

/// Flags defines a type to represent the processor status register.
/// It will print out with all of the flag values and can be converted
/// to/from a u8 when needed.
/// NOTE: S1 is always on. Every way of building or writing a Flags forces it
/// so there's no way to hold an invalid status byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Flags(u8);

impl Default for Flags {
    fn default() -> Self {
        Self(P_S1)
    }
}

impl From<u8> for Flags {
    fn from(val: u8) -> Self {
        Self::new(val)
    }
}

impl From<Flags> for u8 {
    fn from(p: Flags) -> Self {
        p.0
    }
}

impl Flags {
    /// Create a Flags from the given byte with S1 forced on.
    #[must_use]
    pub const fn new(val: u8) -> Self {
        Self(val | P_S1)
    }

    /// The raw status byte.
    #[must_use]
    pub const fn register(self) -> u8 {
        self.0
    }

    /// Replace the whole status byte. S1 stays on regardless of val.
    pub fn set_register(&mut self, val: u8) {
        self.0 = val | P_S1;
    }

    const fn get(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Carry flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.get(P_CARRY)
    }

    /// Set or clear carry.
    pub fn set_carry(&mut self, on: bool) {
        self.set(P_CARRY, on);
    }

    /// Zero flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.get(P_ZERO)
    }

    /// Set or clear zero.
    pub fn set_zero(&mut self, on: bool) {
        self.set(P_ZERO, on);
    }

    /// Interrupt disable flag.
    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.get(P_INTERRUPT)
    }

    /// Set or clear interrupt disable.
    pub fn set_irq_disabled(&mut self, on: bool) {
        self.set(P_INTERRUPT, on);
    }

    /// Decimal (BCD) mode flag.
    #[must_use]
    pub const fn decimal(self) -> bool {
        self.get(P_DECIMAL)
    }

    /// Set or clear decimal mode.
    pub fn set_decimal(&mut self, on: bool) {
        self.set(P_DECIMAL, on);
    }

    /// Break flag.
    #[must_use]
    pub const fn brk(self) -> bool {
        self.get(P_B)
    }

    /// Set or clear break.
    pub fn set_brk(&mut self, on: bool) {
        self.set(P_B, on);
    }

    /// Overflow flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.get(P_OVERFLOW)
    }

    /// Set or clear overflow.
    pub fn set_overflow(&mut self, on: bool) {
        self.set(P_OVERFLOW, on);
    }

    /// Negative flag.
    #[must_use]
    pub const fn negative(self) -> bool {
        self.get(P_NEGATIVE)
    }

    /// Set or clear negative.
    pub fn set_negative(&mut self, on: bool) {
        self.set(P_NEGATIVE, on);
    }

    // The compute_* functions all take the widened (pre-truncation) result
    // so carry and overflow can be seen before the 8 bit value is taken.

    /// Zero is set iff the low 8 bits of value are 0.
    pub fn compute_zero(&mut self, value: u16) {
        self.set_zero(value & 0x00FF == 0);
    }

    /// Negative is bit 7 of the low 8 bits of value.
    pub fn compute_negative(&mut self, value: u16) {
        self.set_negative(value & 0x0080 != 0);
    }

    /// Standard two's complement overflow. Set if both operands have the same
    /// sign and the result sign differs from them.
    pub fn compute_overflow(&mut self, op1: u8, op2: u8, result: u16) {
        let result = (result & 0x00FF) as u8;
        self.set_overflow((op1 ^ result) & (op2 ^ result) & 0x80 != 0);
    }

    /// Carry out of an add. In decimal mode anything above 99 (BCD) carries
    /// which with an unadjusted high nibble sum shows up as > 0x9F.
    pub fn compute_carry_from_add(&mut self, result: u16) {
        let limit = if self.decimal() { 0x9F } else { 0xFF };
        self.set_carry(result > limit);
    }

    /// Carry out of a subtract computed as 0xFF + A - operand + carry.
    /// Carry set means no borrow happened.
    pub fn compute_carry_from_subtract(&mut self, result: u16) {
        self.set_carry(result > 0xFF);
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (mask, on, off) in [
            (P_NEGATIVE, 'N', 'n'),
            (P_OVERFLOW, 'V', 'v'),
            (P_S1, 'S', 's'),
            (P_B, 'B', 'b'),
            (P_DECIMAL, 'D', 'd'),
            (P_INTERRUPT, 'I', 'i'),
            (P_ZERO, 'Z', 'z'),
            (P_CARRY, 'C', 'c'),
        ] {
            out.push(if self.get(mask) { on } else { off });
        }
        write!(f, "{out}")
    }
}
