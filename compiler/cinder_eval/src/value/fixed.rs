//! Fixed-point values with 8 decimal places.

use std::cmp::Ordering;
use std::fmt;

use cinder_ir::FixedPointKind;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::errors::{division_by_zero, overflow, underflow, EvalResult};

/// 10^8.
pub const SCALE_FACTOR: i128 = 100_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FixedPointValue {
    kind: FixedPointKind,
    scaled: i128,
}

fn range(kind: FixedPointKind) -> (i128, i128) {
    match kind {
        FixedPointKind::Fix64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
        FixedPointKind::UFix64 => (0, i128::from(u64::MAX)),
    }
}

impl FixedPointValue {
    /// Create a value from its scaled representation, checking the range.
    pub fn new(kind: FixedPointKind, scaled: i128) -> EvalResult<Self> {
        let (min, max) = range(kind);
        if scaled < min {
            return Err(underflow(kind.name()));
        }
        if scaled > max {
            return Err(overflow(kind.name()));
        }
        Ok(FixedPointValue { kind, scaled })
    }

    fn from_big(kind: FixedPointKind, scaled: &BigInt) -> EvalResult<Self> {
        match scaled.to_i128() {
            Some(scaled) => Self::new(kind, scaled),
            None if scaled < &BigInt::zero() => Err(underflow(kind.name())),
            None => Err(overflow(kind.name())),
        }
    }

    /// A whole number converted to fixed point.
    pub fn from_integer(kind: FixedPointKind, value: &BigInt) -> EvalResult<Self> {
        Self::from_big(kind, &(value * SCALE_FACTOR))
    }

    #[inline]
    pub fn kind(&self) -> FixedPointKind {
        self.kind
    }

    #[inline]
    pub fn scaled(&self) -> i128 {
        self.scaled
    }

    /// The integer part, truncated toward zero.
    pub fn integer_part(&self) -> i128 {
        self.scaled / SCALE_FACTOR
    }

    pub fn convert(&self, kind: FixedPointKind) -> EvalResult<Self> {
        Self::new(kind, self.scaled)
    }

    fn with(&self, scaled: i128) -> EvalResult<Self> {
        Self::new(self.kind, scaled)
    }

    pub fn add(&self, other: &Self) -> EvalResult<Self> {
        // Both operands fit in 65 bits, so the sum cannot overflow i128.
        self.with(self.scaled + other.scaled)
    }

    pub fn sub(&self, other: &Self) -> EvalResult<Self> {
        self.with(self.scaled - other.scaled)
    }

    pub fn mul(&self, other: &Self) -> EvalResult<Self> {
        let product = BigInt::from(self.scaled) * BigInt::from(other.scaled) / SCALE_FACTOR;
        Self::from_big(self.kind, &product)
    }

    pub fn div(&self, other: &Self) -> EvalResult<Self> {
        if other.scaled == 0 {
            return Err(division_by_zero());
        }
        let quotient = BigInt::from(self.scaled) * SCALE_FACTOR / BigInt::from(other.scaled);
        Self::from_big(self.kind, &quotient)
    }

    pub fn rem(&self, other: &Self) -> EvalResult<Self> {
        if other.scaled == 0 {
            return Err(division_by_zero());
        }
        self.with(self.scaled % other.scaled)
    }

    pub fn neg(&self) -> EvalResult<Self> {
        self.with(-self.scaled)
    }

    /// Big-endian bytes of the scaled 64-bit representation.
    pub fn to_big_endian_bytes(&self) -> Vec<u8> {
        match self.kind {
            FixedPointKind::Fix64 => i64::try_from(self.scaled)
                .map(|v| v.to_be_bytes().to_vec())
                .unwrap_or_default(),
            FixedPointKind::UFix64 => u64::try_from(self.scaled)
                .map(|v| v.to_be_bytes().to_vec())
                .unwrap_or_default(),
        }
    }
}

impl PartialOrd for FixedPointValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.scaled.cmp(&other.scaled))
    }
}

impl fmt::Display for FixedPointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.scaled < 0 { "-" } else { "" };
        let magnitude = self.scaled.unsigned_abs();
        let scale = SCALE_FACTOR.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:08}",
            magnitude / scale,
            magnitude % scale
        )
    }
}
