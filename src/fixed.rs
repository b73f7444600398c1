// 2.0: fixed-point layer. decimals from the outside are scaled by 10^3 into an
// i64 once, at the validation boundary. all ledger arithmetic after that is
// exact integer arithmetic.

use crate::error::LedgerError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Number of fractional decimal digits kept in ledger state.
pub const SCALE_DIGITS: u32 = 3;

/// Multiplier between a decimal amount and its raw representation.
pub const SCALE: i64 = 1_000;

/// A scaled monetary amount. `Fixed(5150)` is `5.15`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fixed(i64);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    /// Scale an external decimal, rounding extra digits half away from zero.
    pub fn from_decimal(value: Decimal) -> Result<Self, LedgerError> {
        value
            .checked_mul(Decimal::from(SCALE))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("amount {value} is out of range")))
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, SCALE_DIGITS).normalize()
    }

    pub fn checked_add(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_add(other.0).map(Fixed)
    }

    pub fn checked_neg(&self) -> Option<Fixed> {
        self.0.checked_neg().map(Fixed)
    }

    /// `i64::MIN` saturates to `i64::MAX`.
    pub fn abs(&self) -> Fixed {
        Fixed(self.0.saturating_abs())
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Checked total: `None` once the running sum leaves the `i64` range.
impl Sum<Fixed> for Option<Fixed> {
    fn sum<I: Iterator<Item = Fixed>>(mut iter: I) -> Self {
        iter.try_fold(Fixed::ZERO, |total, f| total.checked_add(f))
    }
}
