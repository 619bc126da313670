//! # Allocation Rules
//!
//! An `AllocationRule` is one cost attribution target: a department plus a
//! split expressed either as a whole-number percentage of the owner's total
//! or as a fixed currency amount. Rules are owned by exactly one line item
//! or by a proposal (as its default allocation) and are never shared.
//!
//! ## Core Invariants
//! - Within one owning collection of all-percentage rules, values sum to 100
//!   after a balancing pass completes (transient violation allowed mid-edit)
//! - Rule order is stable: new rows append at the end, removals do not
//!   reorder survivors; the last row is the designated remainder absorber

use crate::ids::DepartmentId;
use crate::money::Amount;
use serde::{Deserialize, Serialize};

/// How a rule's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    /// `value` is a whole-number percentage of the owner's total amount.
    Percentage,
    /// `value` is an absolute amount in whole currency units.
    Fixed,
}

impl std::fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationKind::Percentage => write!(f, "percentage"),
            AllocationKind::Fixed => write!(f, "fixed"),
        }
    }
}

/// One split target on a line item or proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRule {
    /// Department receiving this share of the cost.
    pub department: DepartmentId,

    /// Interpretation of `value`.
    pub kind: AllocationKind,

    /// Whole percent (`Percentage`) or whole currency units (`Fixed`).
    pub value: i64,
}

impl AllocationRule {
    /// Create a percentage-kind rule.
    pub fn percentage(department: DepartmentId, percent: i64) -> Self {
        Self {
            department,
            kind: AllocationKind::Percentage,
            value: percent,
        }
    }

    /// Create a fixed-amount rule.
    pub fn fixed(department: DepartmentId, amount: Amount) -> Self {
        Self {
            department,
            kind: AllocationKind::Fixed,
            value: amount.units(),
        }
    }

    /// Check if this rule is percentage-kind.
    pub fn is_percentage(&self) -> bool {
        self.kind == AllocationKind::Percentage
    }

    /// Check if this rule is fixed-kind.
    pub fn is_fixed(&self) -> bool {
        self.kind == AllocationKind::Fixed
    }
}
