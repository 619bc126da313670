//! # Budget Execution Reconciler
//!
//! Maintains the materialized-view invariant: a budget's `executed_amount`
//! equals the sum of `total_amount` over approved proposals referencing it.
//!
//! ## Hard Laws
//! 1. Full recompute per budget, unconditional overwrite: never `+=`/`-=`
//!    arithmetic, so a missed or replayed event cannot leave drift
//! 2. A failed recomputation leaves the previous figure untouched; the
//!    stale value plus a retryable error beats a silently zeroed budget
//! 3. A budget reassignment recomputes both sides of the move in the same
//!    operation
//! 4. Failures are per-budget local: one unreachable budget must not block
//!    reconciliation of the others an event touches
//!
//! ## Storage Boundary
//! The engine computes; the `ExecutionStore` persists. Implementations
//! backed by shared storage must make the read-sum-write cycle for one
//! budget atomic (transaction or row lock) and serialize concurrent
//! reconciliations of the same budget. The exclusive borrow on the store
//! gives that serialization for free in single-process use.

use std::collections::BTreeMap;

use kosha_models::{Amount, Budget, BudgetId, ProposalEvent, ProposalId, ProposalSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Storage-layer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("budget not found: {0}")]
    BudgetNotFound(BudgetId),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Reconciliation failure for one budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("reading approved proposals for {budget} failed")]
    Read {
        budget: BudgetId,
        #[source]
        source: StoreError,
    },

    #[error("writing executed amount for {budget} failed")]
    Write {
        budget: BudgetId,
        #[source]
        source: StoreError,
    },

    #[error("executed amount for {budget} overflows")]
    Overflow { budget: BudgetId },
}

/// The persistence seam the reconciler recomputes through.
///
/// `approved_snapshots` must return a consistent snapshot of every proposal
/// with `status == approved` and `budget_id == budget`, never a mix of
/// pre- and post-edit state for one proposal.
pub trait ExecutionStore {
    /// All approved proposals currently referencing `budget`.
    fn approved_snapshots(&self, budget: &BudgetId) -> Result<Vec<ProposalSnapshot>, StoreError>;

    /// Overwrite the budget's executed amount.
    fn write_executed(&mut self, budget: &BudgetId, executed: Amount) -> Result<(), StoreError>;
}

/// One successfully recomputed budget figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetExecution {
    pub budget_id: BudgetId,
    pub executed_amount: Amount,
    /// Number of approved proposals summed into the figure.
    pub proposal_count: usize,
}

/// Outcome of handling one event: which budgets were rewritten and which
/// failed. Callers treat any failure as a retryable error on the
/// triggering operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub applied: Vec<BudgetExecution>,
    pub failures: Vec<(BudgetId, ReconcileError)>,
}

impl ReconcileReport {
    pub fn all_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Recomputes budget execution figures in response to proposal lifecycle
/// events.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetExecutionReconciler;

impl BudgetExecutionReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Recompute one budget: sum approved proposal totals, overwrite the
    /// persisted figure. On any error the previous figure stays in place.
    pub fn reconcile_budget<S: ExecutionStore>(
        &self,
        store: &mut S,
        budget: &BudgetId,
    ) -> Result<BudgetExecution, ReconcileError> {
        let snapshots = store
            .approved_snapshots(budget)
            .map_err(|source| ReconcileError::Read {
                budget: budget.clone(),
                source,
            })?;

        let mut executed = Amount::ZERO;
        let mut proposal_count = 0usize;
        for snapshot in &snapshots {
            // The store contract already filters to approved; keep the
            // status check anyway so a permissive store cannot inflate the
            // figure.
            if !snapshot.status.counts_toward_execution() {
                continue;
            }
            executed = executed
                .checked_add(snapshot.total_amount)
                .ok_or_else(|| ReconcileError::Overflow {
                    budget: budget.clone(),
                })?;
            proposal_count += 1;
        }

        store
            .write_executed(budget, executed)
            .map_err(|source| ReconcileError::Write {
                budget: budget.clone(),
                source,
            })?;

        info!(
            budget = %budget,
            executed = %executed,
            proposals = proposal_count,
            "budget execution recomputed"
        );

        Ok(BudgetExecution {
            budget_id: budget.clone(),
            executed_amount: executed,
            proposal_count,
        })
    }

    /// Recompute every budget a lifecycle event touches.
    ///
    /// Budgets are processed independently: a failure on one is recorded
    /// and the rest still run, so a reassignment whose source budget is
    /// unreachable still refreshes the destination (and vice versa).
    pub fn handle_event<S: ExecutionStore>(
        &self,
        store: &mut S,
        event: &ProposalEvent,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            applied: Vec::new(),
            failures: Vec::new(),
        };

        for budget in event.budgets_to_reconcile() {
            match self.reconcile_budget(store, &budget) {
                Ok(execution) => report.applied.push(execution),
                Err(error) => {
                    warn!(
                        budget = %budget,
                        error = %error,
                        "budget reconciliation failed; previous figure left intact"
                    );
                    report.failures.push((budget, error));
                }
            }
        }

        report
    }
}

/// In-memory store: the reference `ExecutionStore` implementation and the
/// fixture for engine tests. Deterministically ordered, no interior
/// mutability; serialization comes from the exclusive borrow.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionStore {
    proposals: BTreeMap<ProposalId, ProposalSnapshot>,
    budgets: BTreeMap<BudgetId, Budget>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a budget. Replaces any existing row with the same id.
    pub fn insert_budget(&mut self, budget: Budget) {
        self.budgets.insert(budget.id.clone(), budget);
    }

    /// Insert or replace a proposal snapshot.
    pub fn upsert_proposal(&mut self, snapshot: ProposalSnapshot) {
        self.proposals.insert(snapshot.id.clone(), snapshot);
    }

    /// Remove a proposal. Returns the removed snapshot, if any.
    pub fn remove_proposal(&mut self, id: &ProposalId) -> Option<ProposalSnapshot> {
        self.proposals.remove(id)
    }

    pub fn budget(&self, id: &BudgetId) -> Option<&Budget> {
        self.budgets.get(id)
    }

    pub fn executed_amount(&self, id: &BudgetId) -> Option<Amount> {
        self.budgets.get(id).map(|b| b.executed_amount)
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn approved_snapshots(&self, budget: &BudgetId) -> Result<Vec<ProposalSnapshot>, StoreError> {
        Ok(self
            .proposals
            .values()
            .filter(|p| {
                p.status.counts_toward_execution() && p.budget_id.as_ref() == Some(budget)
            })
            .cloned()
            .collect())
    }

    fn write_executed(&mut self, budget: &BudgetId, executed: Amount) -> Result<(), StoreError> {
        let row = self
            .budgets
            .get_mut(budget)
            .ok_or_else(|| StoreError::BudgetNotFound(budget.clone()))?;
        row.executed_amount = executed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kosha_models::ProposalStatus;

    fn snapshot(id: &str, status: ProposalStatus, budget: Option<&str>, total: i64) -> ProposalSnapshot {
        ProposalSnapshot {
            id: ProposalId::new(id),
            status,
            budget_id: budget.map(BudgetId::new),
            total_amount: Amount::new(total),
        }
    }

    fn store_with_budget(id: &str, ceiling: i64) -> InMemoryExecutionStore {
        let mut store = InMemoryExecutionStore::new();
        store.insert_budget(Budget::new(BudgetId::new(id), id, Amount::new(ceiling)));
        store
    }

    #[test]
    fn recompute_sums_only_approved_proposals() {
        let mut store = store_with_budget("b-1", 10_000_000);
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-1"), 2_000_000));
        store.upsert_proposal(snapshot("p-2", ProposalStatus::Approved, Some("b-1"), 3_500_000));
        store.upsert_proposal(snapshot("p-3", ProposalStatus::Draft, Some("b-1"), 10_000_000));

        let reconciler = BudgetExecutionReconciler::new();
        let execution = reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap();

        assert_eq!(execution.executed_amount, Amount::new(5_500_000));
        assert_eq!(execution.proposal_count, 2);
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-1")),
            Some(Amount::new(5_500_000))
        );
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut store = store_with_budget("b-1", 10_000_000);
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-1"), 1_234_567));

        let reconciler = BudgetExecutionReconciler::new();
        let first = reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap();
        let second = reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap();

        assert_eq!(first.executed_amount, second.executed_amount);
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-1")),
            Some(Amount::new(1_234_567))
        );
    }

    #[test]
    fn empty_budget_reconciles_to_zero() {
        let mut store = store_with_budget("b-1", 10_000_000);
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-1"), 500_000));

        let reconciler = BudgetExecutionReconciler::new();
        reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap();
        store.remove_proposal(&ProposalId::new("p-1"));
        reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap();

        assert_eq!(
            store.executed_amount(&BudgetId::new("b-1")),
            Some(Amount::ZERO)
        );
    }

    #[test]
    fn unknown_budget_write_fails_and_is_reported() {
        let mut store = InMemoryExecutionStore::new();
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-missing"), 100));

        let reconciler = BudgetExecutionReconciler::new();
        let err = reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-missing"))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Write { .. }));
    }

    #[test]
    fn failed_write_leaves_previous_figure_intact() {
        /// Store whose writes always fail, wrapping a healthy inner store.
        struct WriteFailing(InMemoryExecutionStore);

        impl ExecutionStore for WriteFailing {
            fn approved_snapshots(
                &self,
                budget: &BudgetId,
            ) -> Result<Vec<ProposalSnapshot>, StoreError> {
                self.0.approved_snapshots(budget)
            }

            fn write_executed(&mut self, _: &BudgetId, _: Amount) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("write refused".into()))
            }
        }

        let mut inner = store_with_budget("b-1", 10_000_000);
        store_previous(&mut inner);
        let mut store = WriteFailing(inner);

        let reconciler = BudgetExecutionReconciler::new();
        let err = reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Write { .. }));
        // Previous figure untouched.
        assert_eq!(
            store.0.executed_amount(&BudgetId::new("b-1")),
            Some(Amount::new(777_000))
        );

        fn store_previous(store: &mut InMemoryExecutionStore) {
            store
                .budgets
                .get_mut(&BudgetId::new("b-1"))
                .unwrap()
                .executed_amount = Amount::new(777_000);
        }
    }

    #[test]
    fn reassignment_event_updates_both_budgets() {
        let mut store = store_with_budget("b-a", 10_000_000);
        store.insert_budget(Budget::new(BudgetId::new("b-b"), "b-b", Amount::new(10_000_000)));
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-a"), 1_000_000));
        store.upsert_proposal(snapshot("p-2", ProposalStatus::Approved, Some("b-a"), 250_000));

        let reconciler = BudgetExecutionReconciler::new();
        reconciler
            .reconcile_budget(&mut store, &BudgetId::new("b-a"))
            .unwrap();
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-a")),
            Some(Amount::new(1_250_000))
        );

        // Move p-1 from b-a to b-b, then handle the reassignment event.
        let moved = snapshot("p-1", ProposalStatus::Approved, Some("b-b"), 1_000_000);
        store.upsert_proposal(moved.clone());
        let event = ProposalEvent::BudgetReassigned {
            snapshot: moved,
            previous_budget: Some(BudgetId::new("b-a")),
        };
        let report = reconciler.handle_event(&mut store, &event);

        assert!(report.all_applied());
        assert_eq!(report.applied.len(), 2);
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-a")),
            Some(Amount::new(250_000))
        );
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-b")),
            Some(Amount::new(1_000_000))
        );
    }

    #[test]
    fn failure_on_one_budget_does_not_block_the_other() {
        // Destination exists, source budget row is missing.
        let mut store = store_with_budget("b-dst", 10_000_000);
        let moved = snapshot("p-1", ProposalStatus::Approved, Some("b-dst"), 400_000);
        store.upsert_proposal(moved.clone());

        let event = ProposalEvent::BudgetReassigned {
            snapshot: moved,
            previous_budget: Some(BudgetId::new("b-src-missing")),
        };
        let report = BudgetExecutionReconciler::new().handle_event(&mut store, &event);

        assert!(!report.all_applied());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, BudgetId::new("b-src-missing"));
        assert_eq!(report.applied.len(), 1);
        assert_eq!(
            store.executed_amount(&BudgetId::new("b-dst")),
            Some(Amount::new(400_000))
        );
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let mut store = store_with_budget("b-1", i64::MAX);
        store.upsert_proposal(snapshot("p-1", ProposalStatus::Approved, Some("b-1"), i64::MAX));
        store.upsert_proposal(snapshot("p-2", ProposalStatus::Approved, Some("b-1"), 1));

        let err = BudgetExecutionReconciler::new()
            .reconcile_budget(&mut store, &BudgetId::new("b-1"))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Overflow { .. }));
    }
}
