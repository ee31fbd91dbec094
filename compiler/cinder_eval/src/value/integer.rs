//! Integer values of every width.
//!
//! All kinds share one arbitrary-precision representation; the kind decides
//! the legal range. Results outside the range are overflow/underflow errors,
//! except for `Word` kinds, which wrap modulo 2^width.

use std::cmp::Ordering;
use std::fmt;

use cinder_ir::IntegerKind;
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::errors::{division_by_zero, negative_shift, overflow, underflow, EvalResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntegerValue {
    kind: IntegerKind,
    value: BigInt,
}

fn modulus(bits: u32) -> BigInt {
    BigInt::one() << bits
}

/// Inclusive bounds of a kind; `None` means unbounded in that direction.
fn bounds(kind: IntegerKind) -> (Option<BigInt>, Option<BigInt>) {
    match kind.bit_width() {
        None if kind.is_signed() => (None, None),
        None => (Some(BigInt::zero()), None),
        Some(bits) if kind.is_signed() => {
            let half = modulus(bits - 1);
            (Some(-half.clone()), Some(half - 1))
        }
        Some(bits) => (Some(BigInt::zero()), Some(modulus(bits) - 1)),
    }
}

/// Reduce into the two's complement range of `bits`, signed or not.
fn wrap(value: &BigInt, bits: u32, signed: bool) -> BigInt {
    let m = modulus(bits);
    let mut r = value % &m;
    if r.is_negative() {
        r += &m;
    }
    if signed && r >= modulus(bits - 1) {
        r -= m;
    }
    r
}

impl IntegerValue {
    /// Create a value of `kind`, checking the range.
    pub fn new(kind: IntegerKind, value: BigInt) -> EvalResult<Self> {
        if kind.is_wrapping() {
            let bits = kind.bit_width().unwrap_or(64);
            return Ok(IntegerValue {
                kind,
                value: wrap(&value, bits, false),
            });
        }
        let (min, max) = bounds(kind);
        if let Some(min) = min {
            if value < min {
                return Err(underflow(kind.name()));
            }
        }
        if let Some(max) = max {
            if value > max {
                return Err(overflow(kind.name()));
            }
        }
        Ok(IntegerValue { kind, value })
    }

    /// An `Int`, which is always in range.
    pub fn int(value: i64) -> Self {
        IntegerValue {
            kind: IntegerKind::Int,
            value: BigInt::from(value),
        }
    }

    pub fn of(kind: IntegerKind, value: i64) -> EvalResult<Self> {
        Self::new(kind, BigInt::from(value))
    }

    /// An `Int` from a collection length or index.
    pub fn from_usize(value: usize) -> Self {
        IntegerValue {
            kind: IntegerKind::Int,
            value: BigInt::from(value),
        }
    }

    /// A `UInt8`, for byte arrays.
    pub fn from_u8(value: u8) -> Self {
        IntegerValue {
            kind: IntegerKind::UInt8,
            value: BigInt::from(value),
        }
    }

    #[inline]
    pub fn kind(&self) -> IntegerKind {
        self.kind
    }

    #[inline]
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// The value as an `i128`, saturating at the bounds.
    pub fn to_i128_saturating(&self) -> i128 {
        self.value.to_i128().unwrap_or(if self.value.is_negative() {
            i128::MIN
        } else {
            i128::MAX
        })
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Convert into another kind, checking the target range.
    pub fn convert(&self, kind: IntegerKind) -> EvalResult<Self> {
        Self::new(kind, self.value.clone())
    }

    fn with(&self, value: BigInt) -> EvalResult<Self> {
        Self::new(self.kind, value)
    }

    pub fn add(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value + &other.value)
    }

    pub fn sub(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value - &other.value)
    }

    pub fn mul(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value * &other.value)
    }

    /// Truncating division.
    pub fn div(&self, other: &Self) -> EvalResult<Self> {
        if other.value.is_zero() {
            return Err(division_by_zero());
        }
        self.with(&self.value / &other.value)
    }

    /// Remainder with the sign of the dividend.
    pub fn rem(&self, other: &Self) -> EvalResult<Self> {
        if other.value.is_zero() {
            return Err(division_by_zero());
        }
        self.with(&self.value % &other.value)
    }

    pub fn neg(&self) -> EvalResult<Self> {
        self.with(-&self.value)
    }

    pub fn bit_and(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value & &other.value)
    }

    pub fn bit_or(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value | &other.value)
    }

    pub fn bit_xor(&self, other: &Self) -> EvalResult<Self> {
        self.with(&self.value ^ &other.value)
    }

    fn shift_amount(amount: &Self) -> EvalResult<Option<usize>> {
        if amount.value.is_negative() {
            return Err(negative_shift());
        }
        Ok(amount.value.to_usize())
    }

    /// Left shift. Fixed-width kinds keep only the low bits.
    pub fn shl(&self, amount: &Self) -> EvalResult<Self> {
        let amount = Self::shift_amount(amount)?;
        match self.kind.bit_width() {
            Some(bits) => {
                let shifted = match amount {
                    Some(n) if n < bits as usize => &self.value << n,
                    _ => BigInt::zero(),
                };
                Ok(IntegerValue {
                    kind: self.kind,
                    value: wrap(&shifted, bits, self.kind.is_signed()),
                })
            }
            None => match amount.filter(|n| u32::try_from(*n).is_ok()) {
                Some(n) => self.with(&self.value << n),
                None if self.value.is_zero() => Ok(self.clone()),
                None => Err(overflow(self.kind.name())),
            },
        }
    }

    /// Arithmetic right shift.
    pub fn shr(&self, amount: &Self) -> EvalResult<Self> {
        let amount = Self::shift_amount(amount)?;
        let value = match amount {
            Some(n) => &self.value >> n,
            None if self.value.is_negative() => -BigInt::one(),
            None => BigInt::zero(),
        };
        self.with(value)
    }

    /// Big-endian two's complement bytes; fixed-width kinds use their full width.
    pub fn to_big_endian_bytes(&self) -> Vec<u8> {
        match self.kind.bit_width() {
            Some(bits) => {
                let width = (bits / 8) as usize;
                let unsigned = wrap(&self.value, bits, false);
                let (_, mut bytes) = unsigned.to_bytes_be();
                if bytes.len() < width {
                    let mut padded = vec![0u8; width - bytes.len()];
                    padded.append(&mut bytes);
                    bytes = padded;
                }
                bytes
            }
            None if self.kind.is_signed() => self.value.to_signed_bytes_be(),
            None => match self.value.sign() {
                Sign::NoSign => vec![0],
                _ => self.value.to_bytes_be().1,
            },
        }
    }
}

impl PartialOrd for IntegerValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.value.cmp(&other.value))
    }
}

impl fmt::Display for IntegerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn v(kind: IntegerKind, value: i64) -> IntegerValue {
        IntegerValue::of(kind, value).unwrap()
    }

    #[test]
    fn test_fixed_width_overflow_is_an_error() {
        let err = v(IntegerKind::Int8, 127).add(&v(IntegerKind::Int8, 1)).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::Overflow {
                type_name: "Int8".into()
            }
        );
        let err = v(IntegerKind::UInt8, 0).sub(&v(IntegerKind::UInt8, 1)).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::Underflow {
                type_name: "UInt8".into()
            }
        );
    }

    #[test]
    fn test_unsigned_arbitrary_precision_underflows_at_zero() {
        let err = v(IntegerKind::UInt, 3).sub(&v(IntegerKind::UInt, 4)).unwrap_err();
        assert_eq!(err.category(), crate::errors::ErrorCategory::Arithmetic);
    }

    #[test]
    fn test_word_kinds_wrap() {
        assert_eq!(
            v(IntegerKind::Word8, 255).add(&v(IntegerKind::Word8, 2)).unwrap(),
            v(IntegerKind::Word8, 1)
        );
        assert_eq!(
            v(IntegerKind::Word16, 0).sub(&v(IntegerKind::Word16, 1)).unwrap(),
            v(IntegerKind::Word16, 65535)
        );
    }

    #[test]
    fn test_signed_min_divided_by_minus_one_overflows() {
        let err = v(IntegerKind::Int64, i64::MIN)
            .div(&v(IntegerKind::Int64, -1))
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::Overflow { .. }));
    }

    #[test]
    fn test_division_truncates_and_rejects_zero() {
        assert_eq!(
            v(IntegerKind::Int, -7).div(&v(IntegerKind::Int, 2)).unwrap(),
            IntegerValue::int(-3)
        );
        assert_eq!(
            v(IntegerKind::Int, -7).rem(&v(IntegerKind::Int, 2)).unwrap(),
            IntegerValue::int(-1)
        );
        assert_eq!(
            IntegerValue::int(1).rem(&IntegerValue::int(0)).unwrap_err().kind,
            EvalErrorKind::DivisionByZero
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(
            v(IntegerKind::UInt8, 0b1100_0001)
                .shl(&v(IntegerKind::UInt8, 1))
                .unwrap(),
            v(IntegerKind::UInt8, 0b1000_0010)
        );
        assert_eq!(
            v(IntegerKind::Int8, 1).shl(&v(IntegerKind::Int8, 7)).unwrap(),
            v(IntegerKind::Int8, -128)
        );
        assert_eq!(
            v(IntegerKind::Int, -8).shr(&v(IntegerKind::Int, 1)).unwrap(),
            IntegerValue::int(-4)
        );
        assert_eq!(
            IntegerValue::int(1).shl(&IntegerValue::int(-1)).unwrap_err().kind,
            EvalErrorKind::NegativeShift
        );
    }

    #[test]
    fn test_big_endian_bytes() {
        assert_eq!(v(IntegerKind::UInt16, 7).to_big_endian_bytes(), vec![0, 7]);
        assert_eq!(v(IntegerKind::Int8, -1).to_big_endian_bytes(), vec![0xff]);
        assert_eq!(IntegerValue::int(256).to_big_endian_bytes(), vec![1, 0]);
    }

    proptest! {
        #[test]
        fn prop_int32_add_matches_checked_add(a in any::<i32>(), b in any::<i32>()) {
            let result =
                v(IntegerKind::Int32, i64::from(a)).add(&v(IntegerKind::Int32, i64::from(b)));
            match a.checked_add(b) {
                Some(sum) => {
                    prop_assert_eq!(result.unwrap(), v(IntegerKind::Int32, i64::from(sum)));
                }
                None => prop_assert!(result.is_err()),
            }
        }

        #[test]
        fn prop_word32_mul_matches_wrapping_mul(a in any::<u32>(), b in any::<u32>()) {
            let result = v(IntegerKind::Word32, i64::from(a))
                .mul(&v(IntegerKind::Word32, i64::from(b)))
                .unwrap();
            prop_assert_eq!(result, v(IntegerKind::Word32, i64::from(a.wrapping_mul(b))));
        }
    }
}
