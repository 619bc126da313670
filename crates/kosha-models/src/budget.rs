//! # Business Budget
//!
//! A business budget is an allocated ceiling plus a derived execution
//! figure. `executed_amount` is a materialized view over approved proposals:
//! it is only ever written by the reconciliation engine, never authored by
//! budget-management flows.

use crate::ids::BudgetId;
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business budget row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Unique budget identifier.
    pub id: BudgetId,

    /// Budget name (initiative or project title).
    pub name: String,

    /// Allocated ceiling.
    pub budget_amount: Amount,

    /// Sum of `total_amount` over approved proposals referencing this
    /// budget. Derived state: overwritten wholesale on every
    /// reconciliation, never incremented in place.
    pub executed_amount: Amount,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Budget {
    /// Create a budget with zero execution.
    pub fn new(id: BudgetId, name: impl Into<String>, budget_amount: Amount) -> Self {
        Self {
            id,
            name: name.into(),
            budget_amount,
            executed_amount: Amount::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Unexecuted headroom, clamped at zero for over-executed budgets.
    pub fn remaining(&self) -> Amount {
        self.budget_amount.saturating_remaining(self.executed_amount)
    }

    /// Execution ratio as basis points (0-10000).
    /// Returns 0 if the ceiling is zero, clamps at 10000 when over-executed.
    pub fn utilization_bps(&self) -> u32 {
        if self.budget_amount.is_zero() || !self.budget_amount.is_positive() {
            return 0;
        }
        let executed = i128::from(self.executed_amount.units().max(0));
        let ceiling = i128::from(self.budget_amount.units());
        let ratio = (executed * 10_000) / ceiling;
        ratio.clamp(0, 10_000) as u32
    }

    /// Check if approved execution has exceeded the ceiling.
    pub fn is_over_executed(&self) -> bool {
        self.executed_amount > self.budget_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(ceiling: i64, executed: i64) -> Budget {
        let mut b = Budget::new(
            BudgetId::new("b-2026-it"),
            "IT infrastructure refresh",
            Amount::new(ceiling),
        );
        b.executed_amount = Amount::new(executed);
        b
    }

    #[test]
    fn remaining_clamps_at_zero() {
        assert_eq!(budget(1_000_000, 400_000).remaining(), Amount::new(600_000));
        assert_eq!(budget(1_000_000, 1_200_000).remaining(), Amount::ZERO);
    }

    #[test]
    fn utilization_bps_bounds() {
        assert_eq!(budget(0, 0).utilization_bps(), 0);
        assert_eq!(budget(1_000_000, 250_000).utilization_bps(), 2_500);
        assert_eq!(budget(1_000_000, 2_000_000).utilization_bps(), 10_000);
    }

    #[test]
    fn over_execution_flag() {
        assert!(!budget(1_000_000, 1_000_000).is_over_executed());
        assert!(budget(1_000_000, 1_000_001).is_over_executed());
    }
}
