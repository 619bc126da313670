//! # Proposal Lifecycle Events
//!
//! Every create/edit/delete/status-change of a proposal emits one event.
//! The reconciliation engine consumes these events and recomputes execution
//! figures for the budgets each event touches: full recompute, never
//! incremental arithmetic, so a missed or duplicated event can never leave
//! drift behind.
//!
//! Events carry `ProposalSnapshot`s rather than live proposals: the reducer
//! must not observe state newer than the event that triggered it.

use crate::ids::BudgetId;
use crate::proposal::{ProposalSnapshot, ProposalStatus};
use serde::{Deserialize, Serialize};

/// A proposal lifecycle event, as emitted by the (out-of-scope) request
/// handlers after their own persistence completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProposalEvent {
    /// A proposal was created. `snapshot` reflects the created state.
    Created { snapshot: ProposalSnapshot },

    /// A proposal changed status. `snapshot` reflects the new status.
    StatusChanged {
        snapshot: ProposalSnapshot,
        previous: ProposalStatus,
    },

    /// A proposal's amount or allocation rules were edited without a
    /// status change. `snapshot` reflects the post-edit state.
    Edited { snapshot: ProposalSnapshot },

    /// A proposal was deleted. `snapshot` is the last persisted state.
    Deleted { snapshot: ProposalSnapshot },

    /// A proposal was moved to a different budget. `snapshot` reflects the
    /// new budget reference; `previous_budget` is where it was counted
    /// before the move.
    BudgetReassigned {
        snapshot: ProposalSnapshot,
        previous_budget: Option<BudgetId>,
    },
}

impl ProposalEvent {
    /// The budgets whose `executed_amount` must be recomputed for this
    /// event. Empty when the event cannot have changed any execution figure
    /// (e.g. a draft was edited).
    ///
    /// A reassignment always returns both sides of the move; updating only
    /// the destination is the classic lost-subtraction bug this engine
    /// exists to prevent.
    pub fn budgets_to_reconcile(&self) -> Vec<BudgetId> {
        match self {
            ProposalEvent::Created { snapshot } | ProposalEvent::Edited { snapshot } => {
                if snapshot.status.counts_toward_execution() {
                    snapshot.budget_id.clone().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            ProposalEvent::StatusChanged { snapshot, previous } => {
                if snapshot.status.counts_toward_execution()
                    || previous.counts_toward_execution()
                {
                    snapshot.budget_id.clone().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            ProposalEvent::Deleted { snapshot } => {
                if snapshot.status.counts_toward_execution() {
                    snapshot.budget_id.clone().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            ProposalEvent::BudgetReassigned {
                snapshot,
                previous_budget,
            } => {
                let mut budgets: Vec<BudgetId> = previous_budget
                    .clone()
                    .into_iter()
                    .chain(snapshot.budget_id.clone())
                    .collect();
                budgets.dedup();
                budgets
            }
        }
    }
}
