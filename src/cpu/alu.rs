//! 16-bit arithmetic with flag computation.
//!
//! Each operation returns the truncated result together with the complete
//! status it produces, so the caller assigns result and flags in one go.

use crate::cpu::registers::Flags;

const SIGN_BIT: u16 = 0x8000;

#[inline]
fn negative(v: u16) -> bool {
    v & SIGN_BIT != 0
}

/// Add two words, returning (a + b mod 2^16, flags).
///
/// Carry is the unsigned carry out of bit 15.
pub fn add(a: u16, b: u16) -> (u16, Flags) {
    let (result, carry) = a.overflowing_add(b);
    let overflow = negative(a) == negative(b) && negative(result) != negative(a);
    (result, flags_for(result, carry, overflow))
}

/// Subtract two words, returning (a - b mod 2^16, flags).
///
/// Carry is the unsigned borrow (set when b > a).
pub fn sub(a: u16, b: u16) -> (u16, Flags) {
    let (result, borrow) = a.overflowing_sub(b);
    let overflow = negative(a) != negative(b) && negative(result) != negative(a);
    (result, flags_for(result, borrow, overflow))
}

fn flags_for(result: u16, carry: bool, overflow: bool) -> Flags {
    Flags {
        zero: result == 0,
        carry,
        overflow,
        sign: negative(result),
    }
}

/// Interpret a word as two's complement and widen it.
#[inline]
pub fn sign_extend(v: u16) -> i32 {
    v as i16 as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_carry_without_overflow() {
        let (result, flags) = add(0xFFFF, 20);
        assert_eq!(result, 19);
        assert!(flags.carry);
        assert!(!flags.overflow);
        assert!(!flags.zero);
        assert!(!flags.sign);
    }

    #[test]
    fn test_add_signed_overflow() {
        let (result, flags) = add(0x7FFF, 1);
        assert_eq!(result, 0x8000);
        assert!(flags.overflow);
        assert!(flags.sign);
        assert!(!flags.carry);
    }

    #[test]
    fn test_add_zero() {
        let (result, flags) = add(0x8000, 0x8000);
        assert_eq!(result, 0);
        assert!(flags.zero);
        assert!(flags.carry);
        assert!(flags.overflow);
    }

    #[test]
    fn test_sub_wraps() {
        let (result, flags) = sub(3, 5);
        assert_eq!(result, 0xFFFE);
        assert!(flags.carry);
        assert!(flags.sign);
        assert!(!flags.overflow);
    }

    #[test]
    fn test_sub_signed_overflow() {
        // -32768 - 1 does not fit.
        let (result, flags) = sub(0x8000, 1);
        assert_eq!(result, 0x7FFF);
        assert!(flags.overflow);
        assert!(!flags.sign);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFFFE), -2);
        assert_eq!(sign_extend(0x0022), 0x22);
    }

    proptest! {
        #[test]
        fn prop_add_modular(a: u16, b: u16) {
            let (result, flags) = add(a, b);
            prop_assert_eq!(result as u32, (a as u32 + b as u32) % 0x1_0000);
            prop_assert_eq!(flags.carry, a as u32 + b as u32 > 0xFFFF);
            prop_assert_eq!(flags.zero, result == 0);
            prop_assert_eq!(flags.sign, result & 0x8000 != 0);

            let same_sign = (a & 0x8000) == (b & 0x8000);
            let flipped = (result & 0x8000) != (a & 0x8000);
            prop_assert_eq!(flags.overflow, same_sign && flipped);
        }

        #[test]
        fn prop_sub_modular(a: u16, b: u16) {
            let (result, flags) = sub(a, b);
            prop_assert_eq!(result as i64, (a as i64 - b as i64).rem_euclid(0x1_0000));
            prop_assert_eq!(flags.carry, b > a);

            let diff_sign = (a & 0x8000) != (b & 0x8000);
            let flipped = (result & 0x8000) != (a & 0x8000);
            prop_assert_eq!(flags.overflow, diff_sign && flipped);
        }

        #[test]
        fn prop_overflow_matches_signed_arithmetic(a: i16, b: i16) {
            let (_, flags) = add(a as u16, b as u16);
            prop_assert_eq!(flags.overflow, a.checked_add(b).is_none());

            let (_, flags) = sub(a as u16, b as u16);
            prop_assert_eq!(flags.overflow, a.checked_sub(b).is_none());
        }
    }
}
