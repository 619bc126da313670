//! # Contract Proposal Value Objects
//!
//! A `Proposal` is a purchase, service, or bidding contract request carrying
//! monetary line items, allocation rules, and an approval lifecycle status.
//! The engine treats proposals as immutable snapshots: edits produce new
//! values, never in-place mutation, so downstream recomputation can never
//! observe a half-edited proposal.

use crate::allocation::AllocationRule;
use crate::ids::{BudgetId, DepartmentId, ProposalId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a line item is a purchased good or a contracted service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    /// Purchased goods (hardware, software licenses, supplies).
    Purchase,
    /// Contracted services (personnel, maintenance, development).
    Service,
}

impl std::fmt::Display for LineItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineItemKind::Purchase => write!(f, "purchase"),
            LineItemKind::Service => write!(f, "service"),
        }
    }
}

/// One monetary line of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Purchase or service item.
    pub kind: LineItemKind,

    /// Human-readable item description.
    pub label: String,

    /// The item's contract amount.
    pub total_amount: Amount,

    /// Cost attribution rules for this item. Empty means the proposal-level
    /// default allocation applies.
    pub allocations: Vec<AllocationRule>,
}

impl LineItem {
    /// Create a purchase line item with no allocations.
    pub fn purchase(label: impl Into<String>, total_amount: Amount) -> Self {
        Self {
            kind: LineItemKind::Purchase,
            label: label.into(),
            total_amount,
            allocations: Vec::new(),
        }
    }

    /// Create a service line item with no allocations.
    pub fn service(label: impl Into<String>, total_amount: Amount) -> Self {
        Self {
            kind: LineItemKind::Service,
            label: label.into(),
            total_amount,
            allocations: Vec::new(),
        }
    }

    /// Attach allocation rules (builder style).
    pub fn with_allocations(mut self, allocations: Vec<AllocationRule>) -> Self {
        self.allocations = allocations;
        self
    }

    /// Check if this item carries its own allocation rules.
    pub fn has_allocations(&self) -> bool {
        !self.allocations.is_empty()
    }
}

/// Approval lifecycle status of a proposal.
///
/// `Approved` is the only status that counts toward budget execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

impl ProposalStatus {
    /// Only approved proposals are counted into `Budget::executed_amount`.
    pub fn counts_toward_execution(&self) -> bool {
        matches!(self, ProposalStatus::Approved)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Approved | ProposalStatus::Rejected | ProposalStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Draft => write!(f, "draft"),
            ProposalStatus::Submitted => write!(f, "submitted"),
            ProposalStatus::Approved => write!(f, "approved"),
            ProposalStatus::Rejected => write!(f, "rejected"),
            ProposalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A contract proposal with its line items and allocation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal identifier.
    pub id: ProposalId,

    /// Proposal title.
    pub title: String,

    /// Approval lifecycle status.
    pub status: ProposalStatus,

    /// Business budget this proposal executes against, if any.
    pub budget_id: Option<BudgetId>,

    /// Department that raised the proposal. Used as the attribution
    /// fallback when no allocation rules exist anywhere on the proposal.
    pub requesting_department: Option<DepartmentId>,

    /// Total contract amount (sum of line item totals).
    pub total_amount: Amount,

    /// Monetary line items.
    pub line_items: Vec<LineItem>,

    /// Proposal-level default allocation, applied to line items that carry
    /// no rules of their own.
    pub default_allocations: Vec<AllocationRule>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a draft proposal with no line items.
    pub fn draft(id: ProposalId, title: impl Into<String>, total_amount: Amount) -> Self {
        Self {
            id,
            title: title.into(),
            status: ProposalStatus::Draft,
            budget_id: None,
            requesting_department: None,
            total_amount,
            line_items: Vec::new(),
            default_allocations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the business budget reference (builder style).
    pub fn with_budget(mut self, budget_id: BudgetId) -> Self {
        self.budget_id = Some(budget_id);
        self
    }

    /// Set the requesting department (builder style).
    pub fn with_requesting_department(mut self, department: DepartmentId) -> Self {
        self.requesting_department = Some(department);
        self
    }

    /// Set line items (builder style).
    pub fn with_line_items(mut self, line_items: Vec<LineItem>) -> Self {
        self.line_items = line_items;
        self
    }

    /// Set proposal-level default allocations (builder style).
    pub fn with_default_allocations(mut self, allocations: Vec<AllocationRule>) -> Self {
        self.default_allocations = allocations;
        self
    }

    /// Set the lifecycle status (builder style).
    pub fn with_status(mut self, status: ProposalStatus) -> Self {
        self.status = status;
        self
    }

    /// Sum of line item totals, checked. `None` on overflow.
    pub fn line_item_total(&self) -> Option<Amount> {
        self.line_items
            .iter()
            .try_fold(Amount::ZERO, |acc, item| acc.checked_add(item.total_amount))
    }

    /// Check if any line item carries its own allocation rules.
    pub fn has_item_allocations(&self) -> bool {
        self.line_items.iter().any(LineItem::has_allocations)
    }

    /// Reduced view used by the reconciler.
    pub fn snapshot(&self) -> ProposalSnapshot {
        ProposalSnapshot {
            id: self.id.clone(),
            status: self.status,
            budget_id: self.budget_id.clone(),
            total_amount: self.total_amount,
        }
    }
}

/// The reduced proposal view persisted for budget execution recomputation.
///
/// Carries exactly the fields the reconciler needs: status, budget
/// reference, and gross total. The per-department breakdown is
/// informational and deliberately not part of this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    pub id: ProposalId,
    pub status: ProposalStatus,
    pub budget_id: Option<BudgetId>,
    pub total_amount: Amount,
}
