//! Fixed-point helpers for 18-decimal amounts.
//!
//! `amount * ONE` leaves u128 once an amount passes ~340 whole units, so products are formed in
//! 256 bits and only the quotient has to fit.

use crate::error::SettlementError;

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of `a * b` as `(high, low)` words.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let lo_lo = a_lo * b_lo;
    let hi_lo = a_hi * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_hi = a_hi * b_hi;

    let middle = (lo_lo >> 64) + (hi_lo & LOW_MASK) + (lo_hi & LOW_MASK);
    let low = (middle << 64) | (lo_lo & LOW_MASK);
    let high = hi_hi + (hi_lo >> 64) + (lo_hi >> 64) + (middle >> 64);
    (high, low)
}

/// `floor(a * b / d)` with a 256-bit intermediate.
///
/// Fails with `Overflow` when `d == 0` or the quotient does not fit in u128.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, SettlementError> {
    if d == 0 {
        return Err(SettlementError::Overflow);
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Ok(low / d);
    }
    if high >= d {
        return Err(SettlementError::Overflow);
    }

    // Restoring long division of the low word; `remainder < d` holds between steps.
    let mut remainder = high;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((low >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || remainder >= d {
            remainder = remainder.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Ok(quotient)
}
