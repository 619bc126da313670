//! # Equal Split Balancer
//!
//! Keep a set of N allocation rows summing to exactly the target (100 for
//! percentage rows, the line item total for fixed rows) after a row is
//! added or removed, without the user rebalancing by hand.
//!
//! ## Core Question
//! "After this add/remove, what does every row get so the total is exact?"
//!
//! ## Hard Laws
//! 1. Every row receives `floor(target / N)`
//! 2. The last row receives `target - floor(target / N) * (N - 1)`, the
//!    remainder absorber, so the sum is exact for any target and N
//! 3. Row order is preserved; "last" is positional, so callers must append
//!    new rows and must not reorder survivors on removal
//! 4. N = 0 yields an empty list, never an error
//!
//! Re-running the balancer on its own output reproduces that output. It is
//! not order-insensitive: permuting rows moves the remainder.

use kosha_models::{AllocationKind, AllocationRule, Amount};

/// Target total for percentage-kind rows.
pub const PERCENT_TARGET: i64 = 100;

/// Compute the equal shares for `slots` rows against `target`.
///
/// Pure integer partition: `floor(target / slots)` per slot, remainder on
/// the last slot. Exported separately so interactive callers can preview
/// values without building rule rows.
pub fn equal_shares(target: i64, slots: usize) -> Vec<i64> {
    if slots == 0 {
        return Vec::new();
    }
    let n = slots as i64;
    let share = target / n;
    let mut shares = vec![share; slots];
    shares[slots - 1] = target - share * (n - 1);
    shares
}

/// Rebalance percentage-kind rows to sum to exactly 100.
///
/// Departments and order are preserved; every returned row is
/// percentage-kind regardless of the input kinds (mirrors the interactive
/// equal-split action, which resets the whole set).
pub fn rebalance_percentages(rows: &[AllocationRule]) -> Vec<AllocationRule> {
    rebalance(rows, PERCENT_TARGET, AllocationKind::Percentage)
}

/// Rebalance fixed-kind rows to sum to exactly the owning item's total.
pub fn rebalance_fixed(rows: &[AllocationRule], total: Amount) -> Vec<AllocationRule> {
    rebalance(rows, total.units(), AllocationKind::Fixed)
}

fn rebalance(rows: &[AllocationRule], target: i64, kind: AllocationKind) -> Vec<AllocationRule> {
    let shares = equal_shares(target, rows.len());
    rows.iter()
        .zip(shares)
        .map(|(row, value)| AllocationRule {
            department: row.department.clone(),
            kind,
            value,
        })
        .collect()
}
