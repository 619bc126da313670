//! # Line Item Allocation Resolver
//!
//! Convert a line item's allocation rules into absolute currency amounts,
//! plus the save-time validation that guards what may be persisted.
//!
//! ## Resolution Rules
//! - Percentage rules round half-up independently per rule
//! - Fixed rules pass their value through verbatim (the cap against the
//!   item total is a validation concern, not a resolution concern)
//! - When the rule set is all-percentage and sums to 100, the last rule's
//!   amount is biased so the resolved sum equals the item total exactly,
//!   the same "last entry absorbs the remainder" convention the balancer
//!   uses at edit time
//! - An empty rule set resolves to an empty list; the aggregator owns the
//!   proposal-level fallback, not this resolver
//!
//! ## Validation Severity
//! Negative values, out-of-range percentages, and percentage sets not
//! summing to 100 block the save. Fixed-kind totals exceeding the item
//! total alongside percentage rules are surfaced as warnings; there is no
//! unambiguous auto-correction, so the caller decides.

use kosha_models::{AllocationRule, Amount, DepartmentId, LineItem};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance::PERCENT_TARGET;

/// One rule resolved to an absolute amount. Order matches the input rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAllocation {
    pub department: DepartmentId,
    pub amount: Amount,
}

/// Resolve a line item's own rules against its total.
pub fn resolve_line_item(item: &LineItem) -> Vec<ResolvedAllocation> {
    resolve_rules(&item.allocations, item.total_amount)
}

/// Resolve a rule set against an owning total.
///
/// Shared by per-item resolution and the proposal-level default pass; the
/// remainder-bias rule applies identically in both.
pub fn resolve_rules(rules: &[AllocationRule], total: Amount) -> Vec<ResolvedAllocation> {
    let mut resolved: Vec<ResolvedAllocation> = rules
        .iter()
        .map(|rule| ResolvedAllocation {
            department: rule.department.clone(),
            amount: if rule.is_percentage() {
                total.percent_half_up(rule.value)
            } else {
                Amount::new(rule.value)
            },
        })
        .collect();

    // Remainder correction: only meaningful when the percentages partition
    // the whole total. A set that does not sum to 100 is invalid at save
    // time and must not be silently forced to the total here.
    let all_percentage = !rules.is_empty() && rules.iter().all(AllocationRule::is_percentage);
    if all_percentage && rules.iter().map(|r| r.value).sum::<i64>() == PERCENT_TARGET {
        let head: i64 = resolved[..resolved.len() - 1]
            .iter()
            .map(|r| r.amount.units())
            .sum();
        if let Some(last) = resolved.last_mut() {
            last.amount = Amount::new(total.units() - head);
        }
    }

    resolved
}

/// Sum of resolved amounts, checked.
pub fn resolved_total(resolved: &[ResolvedAllocation]) -> Option<Amount> {
    resolved
        .iter()
        .try_fold(Amount::ZERO, |acc, r| acc.checked_add(r.amount))
}

/// A save-time validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("allocation for {department} has negative value {value}")]
    NegativeValue { department: DepartmentId, value: i64 },

    #[error("allocation for {department} has percentage {value} outside 0-100")]
    PercentageOutOfRange { department: DepartmentId, value: i64 },

    #[error("percentage allocations sum to {actual}, expected 100")]
    PercentageSumMismatch { actual: i64 },

    #[error("fixed allocations sum to {fixed_total}, item total is {item_total}")]
    FixedSumMismatch {
        fixed_total: Amount,
        item_total: Amount,
    },

    #[error(
        "fixed allocations total {fixed_total} exceeds item total {item_total} \
         with percentage rules also present"
    )]
    OverAllocation {
        fixed_total: Amount,
        item_total: Amount,
    },
}

impl ValidationError {
    /// Warning-severity findings are surfaced but do not block the save.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationError::OverAllocation { .. })
    }
}

/// Tolerance, in currency units, absorbed by integer-division remainders.
pub const ROUNDING_TOLERANCE: i64 = 1;

/// Validate a rule set at save time. Returns every finding, warnings
/// included; mid-edit states are not validated (transient imbalance while
/// rows are being added is expected).
pub fn validate_rules(rules: &[AllocationRule], total: Amount) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    for rule in rules {
        if rule.value < 0 {
            findings.push(ValidationError::NegativeValue {
                department: rule.department.clone(),
                value: rule.value,
            });
        } else if rule.is_percentage() && rule.value > PERCENT_TARGET {
            findings.push(ValidationError::PercentageOutOfRange {
                department: rule.department.clone(),
                value: rule.value,
            });
        }
    }

    if rules.is_empty() {
        return findings;
    }

    let all_percentage = rules.iter().all(AllocationRule::is_percentage);
    let all_fixed = rules.iter().all(AllocationRule::is_fixed);
    let fixed_total: i64 = rules.iter().filter(|r| r.is_fixed()).map(|r| r.value).sum();

    if all_percentage {
        let sum: i64 = rules.iter().map(|r| r.value).sum();
        if sum != PERCENT_TARGET {
            findings.push(ValidationError::PercentageSumMismatch { actual: sum });
        }
    } else if all_fixed {
        if (fixed_total - total.units()).abs() > ROUNDING_TOLERANCE {
            findings.push(ValidationError::FixedSumMismatch {
                fixed_total: Amount::new(fixed_total),
                item_total: total,
            });
        }
    } else if fixed_total > total.units() {
        findings.push(ValidationError::OverAllocation {
            fixed_total: Amount::new(fixed_total),
            item_total: total,
        });
    }

    findings
}

/// Check whether any finding blocks the save.
pub fn has_blocking(findings: &[ValidationError]) -> bool {
    findings.iter().any(|f| !f.is_warning())
}
