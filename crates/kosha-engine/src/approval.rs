//! # Approval Threshold Resolver
//!
//! Maps a proposal's total amount onto the approval-line rule table: which
//! approver roles are mandatory and who holds final sign-off for a contract
//! of this size. Read-only consumer of the aggregator's scalar total; it
//! never inspects the department breakdown.
//!
//! Bands partition the amount axis as half-open intervals `(min, max]`
//! ("over X, up to and including Y"), with the top band unbounded.

use kosha_models::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An approver role in the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApproverRole(pub String);

impl ApproverRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }
}

impl std::fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One amount band of the approval rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalBand {
    /// Exclusive lower bound.
    pub min_amount: Amount,

    /// Inclusive upper bound; `None` for the unbounded top band.
    pub max_amount: Option<Amount>,

    /// Roles that must appear on the approval line in this band.
    pub included_approvers: Vec<ApproverRole>,

    /// Final sign-off for this band.
    pub final_approver: ApproverRole,
}

impl ApprovalBand {
    /// Check if `total` falls in this band: `min < total <= max`.
    pub fn contains(&self, total: Amount) -> bool {
        total > self.min_amount && self.max_amount.map_or(true, |max| total <= max)
    }
}

/// Rule table construction error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalTableError {
    #[error("approval table is empty")]
    Empty,

    #[error("band starting over {min} does not continue from {expected}")]
    Gap { min: Amount, expected: Amount },

    #[error("only the last band may be unbounded")]
    UnboundedNotLast,
}

/// Resolves mandatory approvers from the proposal total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalThresholdResolver {
    bands: Vec<ApprovalBand>,
}

impl ApprovalThresholdResolver {
    /// Build a resolver, checking the bands are contiguous from zero with
    /// at most one unbounded band at the top.
    pub fn new(mut bands: Vec<ApprovalBand>) -> Result<Self, ApprovalTableError> {
        if bands.is_empty() {
            return Err(ApprovalTableError::Empty);
        }
        bands.sort_by_key(|b| b.min_amount);

        let mut expected = Amount::ZERO;
        for (index, band) in bands.iter().enumerate() {
            if band.min_amount != expected {
                return Err(ApprovalTableError::Gap {
                    min: band.min_amount,
                    expected,
                });
            }
            match band.max_amount {
                Some(max) => expected = max,
                None => {
                    if index != bands.len() - 1 {
                        return Err(ApprovalTableError::UnboundedNotLast);
                    }
                }
            }
        }

        Ok(Self { bands })
    }

    /// The band a proposal total falls into. `None` only for non-positive
    /// totals (nothing to approve) or totals beyond a bounded top band.
    pub fn resolve(&self, total: Amount) -> Option<&ApprovalBand> {
        self.bands.iter().find(|band| band.contains(total))
    }

    /// Mandatory roles for a total: the band's included approvers plus its
    /// final approver, in table order.
    pub fn required_roles(&self, total: Amount) -> Vec<ApproverRole> {
        match self.resolve(total) {
            Some(band) => band
                .included_approvers
                .iter()
                .cloned()
                .chain(std::iter::once(band.final_approver.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The standard four-band table: team lead up to 10M, division head to
    /// 50M, compliance review to 300M, executive sign-off above.
    ///
    /// Statically contiguous, so construction bypasses `new`.
    pub fn standard() -> Self {
        let bands = vec![
            ApprovalBand {
                min_amount: Amount::ZERO,
                max_amount: Some(Amount::new(10_000_000)),
                included_approvers: vec![],
                final_approver: ApproverRole::new("team_lead"),
            },
            ApprovalBand {
                min_amount: Amount::new(10_000_000),
                max_amount: Some(Amount::new(50_000_000)),
                included_approvers: vec![ApproverRole::new("management_office")],
                final_approver: ApproverRole::new("division_head"),
            },
            ApprovalBand {
                min_amount: Amount::new(50_000_000),
                max_amount: Some(Amount::new(300_000_000)),
                included_approvers: vec![
                    ApproverRole::new("management_office"),
                    ApproverRole::new("compliance_officer"),
                ],
                final_approver: ApproverRole::new("division_head"),
            },
            ApprovalBand {
                min_amount: Amount::new(300_000_000),
                max_amount: None,
                included_approvers: vec![
                    ApproverRole::new("management_office"),
                    ApproverRole::new("compliance_officer"),
                    ApproverRole::new("audit_head"),
                ],
                final_approver: ApproverRole::new("ceo"),
            },
        ];
        Self { bands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_half_open_intervals() {
        let resolver = ApprovalThresholdResolver::standard();

        // Exactly 10M stays in the first band; one unit over moves up.
        let first = resolver.resolve(Amount::new(10_000_000)).unwrap();
        assert_eq!(first.final_approver, ApproverRole::new("team_lead"));

        let second = resolver.resolve(Amount::new(10_000_001)).unwrap();
        assert_eq!(second.final_approver, ApproverRole::new("division_head"));
    }

    #[test]
    fn top_band_is_unbounded() {
        let resolver = ApprovalThresholdResolver::standard();
        let band = resolver.resolve(Amount::new(5_000_000_000)).unwrap();
        assert_eq!(band.final_approver, ApproverRole::new("ceo"));
        assert_eq!(band.included_approvers.len(), 3);
    }

    #[test]
    fn zero_total_resolves_to_no_band() {
        let resolver = ApprovalThresholdResolver::standard();
        assert!(resolver.resolve(Amount::ZERO).is_none());
        assert!(resolver.required_roles(Amount::ZERO).is_empty());
    }

    #[test]
    fn required_roles_end_with_final_approver() {
        let resolver = ApprovalThresholdResolver::standard();
        let roles = resolver.required_roles(Amount::new(70_000_000));
        assert_eq!(
            roles,
            vec![
                ApproverRole::new("management_office"),
                ApproverRole::new("compliance_officer"),
                ApproverRole::new("division_head"),
            ]
        );
    }

    #[test]
    fn gapped_tables_are_rejected() {
        let err = ApprovalThresholdResolver::new(vec![
            ApprovalBand {
                min_amount: Amount::ZERO,
                max_amount: Some(Amount::new(1_000)),
                included_approvers: vec![],
                final_approver: ApproverRole::new("team_lead"),
            },
            ApprovalBand {
                min_amount: Amount::new(2_000),
                max_amount: None,
                included_approvers: vec![],
                final_approver: ApproverRole::new("ceo"),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, ApprovalTableError::Gap { .. }));
    }

    #[test]
    fn unbounded_band_must_be_last() {
        let err = ApprovalThresholdResolver::new(vec![
            ApprovalBand {
                min_amount: Amount::ZERO,
                max_amount: None,
                included_approvers: vec![],
                final_approver: ApproverRole::new("team_lead"),
            },
            ApprovalBand {
                min_amount: Amount::new(1_000),
                max_amount: None,
                included_approvers: vec![],
                final_approver: ApproverRole::new("ceo"),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, ApprovalTableError::UnboundedNotLast));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(
            ApprovalThresholdResolver::new(vec![]).unwrap_err(),
            ApprovalTableError::Empty
        );
    }
}
