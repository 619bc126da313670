//! # Whole-Unit Currency Representation
//!
//! Contract amounts are whole currency units (no sub-unit precision in the
//! source data), so a single signed 64-bit mantissa is sufficient. All
//! arithmetic is checked; overflow surfaces as `None` and is handled at the
//! call site rather than wrapping silently.

use serde::{Deserialize, Serialize};

/// A monetary amount in whole currency units.
///
/// Percentages applied to an `Amount` round half-up per application; callers
/// that need an exact partition correct the remainder explicitly (see the
/// engine's balancer and resolver).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Create a new amount from whole currency units.
    pub fn new(units: i64) -> Self {
        Self(units)
    }

    /// Raw whole-unit value.
    pub fn units(&self) -> i64 {
        self.0
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Subtraction clamped at zero. Used for "remaining" figures where a
    /// budget can be over-executed but never reported negative.
    pub fn saturating_remaining(&self, executed: Amount) -> Amount {
        Amount(self.0.saturating_sub(executed.0).max(0))
    }

    /// Apply a whole-number percentage with half-up rounding.
    ///
    /// Computed in 128-bit to avoid intermediate overflow for amounts up to
    /// the full i64 range. Percentages are expected in `[0, 100]`; values
    /// outside that range are rejected at validation time, not here.
    pub fn percent_half_up(&self, percent: i64) -> Amount {
        let scaled = i128::from(self.0) * i128::from(percent);
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        // A whole-unit percentage of an i64 amount always fits back in i64.
        Amount(rounded as i64)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        // 1,000,000 * 33% = 330,000 exactly
        assert_eq!(Amount::new(1_000_000).percent_half_up(33), Amount::new(330_000));
        // 333 * 33% = 109.89 -> 110
        assert_eq!(Amount::new(333).percent_half_up(33), Amount::new(110));
        // 50 * 1% = 0.5 -> 1 (half-up)
        assert_eq!(Amount::new(50).percent_half_up(1), Amount::new(1));
        // 49 * 1% = 0.49 -> 0
        assert_eq!(Amount::new(49).percent_half_up(1), Amount::ZERO);
    }

    #[test]
    fn percent_of_large_amount_does_not_overflow() {
        let large = Amount::new(i64::MAX / 2);
        let half = large.percent_half_up(50);
        assert!(half.is_positive());
        assert!(half.units() <= large.units());
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Amount::new(i64::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(
            Amount::new(2).checked_add(Amount::new(3)),
            Some(Amount::new(5))
        );
    }

    #[test]
    fn saturating_remaining_never_negative() {
        let budget = Amount::new(1_000);
        assert_eq!(budget.saturating_remaining(Amount::new(400)), Amount::new(600));
        assert_eq!(budget.saturating_remaining(Amount::new(1_500)), Amount::ZERO);
    }
}
