//! The arithmetic and logic operations. None of these touch memory or PC.
//! They take operand values, update the given Flags and return the result
//! for the caller to store wherever the instruction wants it.
use crate::Flags;

/// add implements ADC. In binary mode this is A + operand + carry with all
/// flags coming from the widened sum.
///
/// In decimal mode the nibbles are added separately. N/Z/V/C are derived from
/// the combination of nibbles before any decimal adjustment is done, which
/// is how an NMOS part behaves (the flags other than C don't match the BCD
/// result). Then the low nibble gets +6 on a half carry and the high nibble
/// +0x60 when it went past 9.
pub fn add(p: &mut Flags, a: u8, operand: u8, carry: bool) -> u8 {
    let c = u16::from(carry);
    let (a16, op16) = (u16::from(a), u16::from(operand));

    if !p.decimal() {
        let sum = a16 + op16 + c;
        p.compute_negative(sum);
        p.compute_zero(sum);
        p.compute_overflow(a, operand, sum);
        p.compute_carry_from_add(sum);
        return (sum & 0xFF) as u8;
    }

    let mut lnibble = (a16 & 0x0F) + (op16 & 0x0F) + c;
    let half_carry = if lnibble > 0x09 { 0x10 } else { 0x00 };
    let mut hnibble = (a16 & 0xF0) + (op16 & 0xF0) + half_carry;

    let binary = (lnibble & 0x0F) + (hnibble & 0xF0);
    p.compute_negative(binary);
    p.compute_zero(binary);
    p.compute_overflow(a, operand, binary);
    p.compute_carry_from_add(hnibble);

    if half_carry != 0 {
        lnibble += 0x06;
    }
    if hnibble >= 0x9F {
        hnibble += 0x60;
    }
    ((lnibble & 0x0F) + (hnibble & 0xF0)) as u8
}

/// subtract implements SBC using the no borrow convention. Binary mode is
/// computed as 0xFF + A - operand + carry so a result above 0xFF means
/// no borrow happened.
///
/// Decimal mode mirrors `add`: each nibble is biased so it can't go negative,
/// a half borrow is detected on the low nibble, flags come from the unadjusted
/// combination and then -6 / -0x60 adjustments are applied on borrow.
pub fn subtract(p: &mut Flags, a: u8, operand: u8, carry: bool) -> u8 {
    let c = u16::from(carry);
    let (a16, op16) = (u16::from(a), u16::from(operand));

    if !p.decimal() {
        let diff = 0xFF + a16 - op16 + c;
        p.compute_negative(diff);
        p.compute_zero(diff);
        p.compute_overflow(a, !operand, diff);
        p.compute_carry_from_subtract(diff);
        return (diff & 0xFF) as u8;
    }

    let mut lnibble = 0x0F + (a16 & 0x0F) - (op16 & 0x0F) + c;
    let half_carry = if lnibble > 0x0F { 0x10 } else { 0x00 };
    let mut hnibble = 0xF0 + (a16 & 0xF0) - (op16 & 0xF0) + half_carry;

    let binary = (lnibble & 0x0F) + (hnibble & 0xF0);
    p.compute_negative(binary);
    p.compute_zero(binary);
    p.compute_overflow(a, !operand, binary);
    p.compute_carry_from_subtract(hnibble);

    if half_carry == 0 {
        lnibble = lnibble.wrapping_sub(0x06);
    }
    if hnibble < 0xFF {
        hnibble = hnibble.wrapping_sub(0x60);
    }
    ((lnibble & 0x0F) + (hnibble & 0xF0)) as u8
}

// set_nz updates the N and Z flags for a result which was just loaded
// into a register.
fn set_nz(p: &mut Flags, val: u8) {
    p.compute_negative(u16::from(val));
    p.compute_zero(u16::from(val));
}

/// and implements AND.
pub fn and(p: &mut Flags, op1: u8, op2: u8) -> u8 {
    let res = op1 & op2;
    set_nz(p, res);
    res
}

/// xor implements EOR.
pub fn xor(p: &mut Flags, op1: u8, op2: u8) -> u8 {
    let res = op1 ^ op2;
    set_nz(p, res);
    res
}

/// or implements ORA.
pub fn or(p: &mut Flags, op1: u8, op2: u8) -> u8 {
    let res = op1 | op2;
    set_nz(p, res);
    res
}

/// compare implements CMP/CPX/CPY. Neither reg nor val change.
pub fn compare(p: &mut Flags, reg: u8, val: u8) {
    p.set_carry(reg >= val);
    set_nz(p, reg.wrapping_sub(val));
}

/// `bit_test` implements BIT. N and V come straight from data, Z from the mask.
pub fn bit_test(p: &mut Flags, reg: u8, data: u8) {
    p.set_negative(data & 0x80 != 0);
    p.set_overflow(data & 0x40 != 0);
    p.set_zero(data & reg == 0);
}

/// increment implements INC/INX/INY.
pub fn increment(p: &mut Flags, val: u8) -> u8 {
    let res = val.wrapping_add(1);
    set_nz(p, res);
    res
}

/// decrement implements DEC/DEX/DEY.
pub fn decrement(p: &mut Flags, val: u8) -> u8 {
    let res = val.wrapping_sub(1);
    set_nz(p, res);
    res
}

/// `shift_left` implements ASL. Bit 7 moves into carry.
pub fn shift_left(p: &mut Flags, val: u8) -> u8 {
    p.set_carry(val & 0x80 != 0);
    let res = val << 1;
    set_nz(p, res);
    res
}

/// `shift_right` implements LSR. Bit 0 moves into carry and N always clears.
pub fn shift_right(p: &mut Flags, val: u8) -> u8 {
    p.set_carry(val & 0x01 != 0);
    let res = val >> 1;
    set_nz(p, res);
    res
}

/// `rotate_left` implements ROL. Carry comes in at bit 0.
pub fn rotate_left(p: &mut Flags, val: u8) -> u8 {
    let carry = u8::from(p.carry());
    p.set_carry(val & 0x80 != 0);
    let res = (val << 1) | carry;
    set_nz(p, res);
    res
}

/// `rotate_right` implements ROR. Carry comes in at bit 7.
pub fn rotate_right(p: &mut Flags, val: u8) -> u8 {
    let carry = u8::from(p.carry()) << 7;
    p.set_carry(val & 0x01 != 0);
    let res = (val >> 1) | carry;
    set_nz(p, res);
    res
}
