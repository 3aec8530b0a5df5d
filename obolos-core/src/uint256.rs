//! 256-bit unsigned integer arithmetic (§4.6), stored as a 32-byte
//! big-endian array (index 0 most significant, matching EVM word
//! order). Distinct from `talanton_core::consensus::difficulty::Target256`,
//! which is the unrelated, least-significant-byte-first proof-of-work
//! target representation (see `SPEC_FULL.md` §4.2). Grounded in
//! `original_source/layer1/evm/vm.cpp` (`Add`/`Sub`/`Mul`/`Div`/`Mod`/
//! `Exp`, long multiplication and bit-by-bit long division) and
//! `state.h` (`ToUint256`/`ToUint64`).

use std::cmp::Ordering;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Rem, Shl, Shr, Sub};

/// A 256-bit word, big-endian: `bytes[0]` is the most significant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct U256(pub [u8; 32]);

impl U256 {
    pub const ZERO: U256 = U256([0u8; 32]);
    pub const ONE: U256 = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        U256(bytes)
    };
    pub const MAX: U256 = U256([0xffu8; 32]);

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..32].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Truncates to the low 64 bits, matching EVM's `ToUint64` used for
    /// memory offsets, jump destinations, and shift amounts.
    #[must_use]
    pub fn low_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[24..32]);
        u64::from_be_bytes(bytes)
    }

    /// Whether this value fits in a `u64` without truncation, used by
    /// callers that must reject oversized memory offsets rather than
    /// silently wrap them.
    #[must_use]
    pub fn fits_u64(&self) -> bool {
        self.0[..24].iter().all(|&b| b == 0)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Big-endian numeric comparison, used directly by `Lt`/`Gt`/long
    /// division rather than relying on `PartialOrd`'s derive (arrays
    /// already compare lexicographically, which is exactly big-endian
    /// numeric order here, but the explicit helper matches the
    /// original's bytewise loop).
    #[must_use]
    fn less_than(&self, other: &Self) -> bool {
        for i in 0..32 {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Less => return true,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
        false
    }

    /// Division and modulo via bit-by-bit long division (§4.6):
    /// returns `(quotient, remainder)`. Division or modulo by zero
    /// yields `(0, 0)`, matching EVM's zero-on-divide-by-zero
    /// convention rather than panicking.
    #[must_use]
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        if divisor.is_zero() {
            return (U256::ZERO, U256::ZERO);
        }
        let mut quotient = U256::ZERO;
        let mut remainder = U256::ZERO;
        for i in 0..256 {
            remainder = remainder.shl_one();
            let byte_idx = i / 8;
            let bit_idx = 7 - (i % 8);
            if (self.0[byte_idx] >> bit_idx) & 1 == 1 {
                remainder.0[31] |= 1;
            }
            if !remainder.less_than(divisor) {
                remainder = remainder - *divisor;
                let quot_byte = i / 8;
                let quot_bit = 7 - (i % 8);
                quotient.0[quot_byte] |= 1 << quot_bit;
            }
        }
        (quotient, remainder)
    }

    fn shl_one(&self) -> Self {
        let mut result = [0u8; 32];
        let mut carry = 0u8;
        for i in (0..32).rev() {
            let shifted = (self.0[i] << 1) | carry;
            carry = (self.0[i] & 0x80) >> 7;
            result[i] = shifted;
        }
        U256(result)
    }

    /// Binary exponentiation (square-and-multiply), modular over
    /// 2^256 since every intermediate `Mul` already truncates.
    #[must_use]
    pub fn pow(&self, exponent: &Self) -> Self {
        if exponent.is_zero() {
            return U256::ONE;
        }
        if self.is_zero() {
            return U256::ZERO;
        }
        let mut result = U256::ONE;
        let mut base = *self;
        for i in 0..256 {
            let byte_idx = 31 - (i / 8);
            let bit_idx = i % 8;
            if (exponent.0[byte_idx] >> bit_idx) & 1 == 1 {
                result = result * base;
            }
            base = base * base;
            if base.is_zero() {
                break;
            }
            if base == U256::ONE && result != U256::ONE {
                break;
            }
        }
        result
    }

    #[must_use]
    pub fn shift_left(&self, amount: u64) -> Self {
        if amount >= 256 {
            return U256::ZERO;
        }
        let mut result = *self;
        for _ in 0..amount {
            result = result.shl_one();
        }
        result
    }

    #[must_use]
    pub fn shift_right(&self, amount: u64) -> Self {
        if amount >= 256 {
            return U256::ZERO;
        }
        let mut result = *self;
        for _ in 0..amount {
            let mut carry = 0u8;
            for i in 0..32 {
                let new_carry = (result.0[i] & 0x01) << 7;
                result.0[i] = (result.0[i] >> 1) | carry;
                carry = new_carry;
            }
        }
        result
    }
}

impl Add for U256 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        let mut carry: u16 = 0;
        for i in (0..32).rev() {
            let sum = u16::from(self.0[i]) + u16::from(rhs.0[i]) + carry;
            result[i] = sum as u8;
            carry = sum >> 8;
        }
        // Overflow wraps modulo 2^256, matching EVM semantics.
        U256(result)
    }
}

impl Sub for U256 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        let mut borrow: i16 = 0;
        for i in (0..32).rev() {
            let mut diff = i16::from(self.0[i]) - i16::from(rhs.0[i]) - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            result[i] = diff as u8;
        }
        // Underflow wraps modulo 2^256 (two's complement), matching EVM.
        U256(result)
    }
}

impl Mul for U256 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        for i in (0..32).rev() {
            if rhs.0[i] == 0 {
                continue;
            }
            let mut carry: u32 = 0;
            for j in (0..32).rev() {
                let result_idx = j as isize - (31 - i) as isize;
                if result_idx < 0 {
                    continue; // carries past byte 0 overflow out of 256 bits and are dropped.
                }
                let result_idx = result_idx as usize;
                let product = u32::from(self.0[j]) * u32::from(rhs.0[i]) + u32::from(result[result_idx]) + carry;
                result[result_idx] = product as u8;
                carry = product >> 8;
            }
        }
        U256(result)
    }
}

impl Div for U256 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.div_rem(&rhs).0
    }
}

impl Rem for U256 {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        self.div_rem(&rhs).1
    }
}

impl BitAnd for U256 {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        for i in 0..32 {
            result[i] = self.0[i] & rhs.0[i];
        }
        U256(result)
    }
}

impl BitOr for U256 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        for i in 0..32 {
            result[i] = self.0[i] | rhs.0[i];
        }
        U256(result)
    }
}

impl BitXor for U256 {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        let mut result = [0u8; 32];
        for i in 0..32 {
            result[i] = self.0[i] ^ rhs.0[i];
        }
        U256(result)
    }
}

impl Not for U256 {
    type Output = Self;
    fn not(self) -> Self {
        let mut result = [0u8; 32];
        for i in 0..32 {
            result[i] = !self.0[i];
        }
        U256(result)
    }
}

impl Shl<u64> for U256 {
    type Output = Self;
    fn shl(self, rhs: u64) -> Self {
        self.shift_left(rhs)
    }
}

impl Shr<u64> for U256 {
    type Output = Self;
    fn shr(self, rhs: u64) -> Self {
        self.shift_right(rhs)
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256::from_u64(value)
    }
}

impl Default for U256 {
    fn default() -> Self {
        U256::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps_on_overflow() {
        assert_eq!(U256::MAX + U256::ONE, U256::ZERO);
    }

    #[test]
    fn add_propagates_carry() {
        let a = U256::from_u64(u64::MAX);
        let b = U256::from_u64(1);
        let expected = {
            let mut bytes = [0u8; 32];
            bytes[23] = 1;
            U256(bytes)
        };
        assert_eq!(a + b, expected);
    }

    #[test]
    fn sub_wraps_on_underflow() {
        assert_eq!(U256::ZERO - U256::ONE, U256::MAX);
    }

    #[test]
    fn mul_basic() {
        assert_eq!(U256::from_u64(10) * U256::from_u64(33), U256::from_u64(330));
    }

    #[test]
    fn div_and_mod_basic() {
        assert_eq!(U256::from_u64(10) / U256::from_u64(3), U256::from_u64(3));
        assert_eq!(U256::from_u64(10) % U256::from_u64(3), U256::from_u64(1));
    }

    #[test]
    fn div_by_zero_yields_zero() {
        assert_eq!(U256::from_u64(10) / U256::ZERO, U256::ZERO);
        assert_eq!(U256::from_u64(10) % U256::ZERO, U256::ZERO);
    }

    #[test]
    fn pow_basic() {
        assert_eq!(U256::from_u64(2).pow(&U256::from_u64(10)), U256::from_u64(1024));
        assert_eq!(U256::from_u64(5).pow(&U256::ZERO), U256::ONE);
        assert_eq!(U256::ZERO.pow(&U256::from_u64(5)), U256::ZERO);
    }

    #[test]
    fn ordering_matches_numeric_value() {
        assert!(U256::from_u64(5) < U256::from_u64(10));
        assert!(U256::from_u64(10) > U256::from_u64(5));
        assert_eq!(U256::from_u64(7), U256::from_u64(7));
    }

    #[test]
    fn shift_left_and_right() {
        assert_eq!(U256::from_u64(1).shift_left(8), U256::from_u64(256));
        assert_eq!(U256::from_u64(256).shift_right(8), U256::from_u64(1));
        assert_eq!(U256::from_u64(1).shift_left(256), U256::ZERO);
    }

    #[test]
    fn low_u64_truncates_and_fits_u64_detects_overflow() {
        assert!(U256::from_u64(42).fits_u64());
        assert_eq!(U256::from_u64(42).low_u64(), 42);
        let big = U256::MAX;
        assert!(!big.fits_u64());
    }
}
