//! # Kosha Engine
//!
//! Cost allocation and budget execution reconciliation for contract
//! proposals: distribute each monetary line item across organizational cost
//! centers, aggregate the distributions per proposal, and keep every
//! business budget's executed amount consistent as proposals move through
//! their lifecycle.
//!
//! ## Pipeline
//! - **balance**: equal-split rebalancing of allocation rows at edit time
//! - **resolve**: rule → absolute amount resolution plus save-time validation
//! - **aggregate**: proposal-level department attribution artifact
//! - **reconcile**: materialized `executed_amount` per budget, recomputed
//!   in full on every relevant lifecycle event
//! - **approval**: amount-band lookup for mandatory approver roles
//!
//! ## Hard Laws
//! 1. Pure functions over immutable snapshots: no shared mutable arrays,
//!    no in-place bookkeeping
//! 2. Integer money only; every partition is exact, remainders land on the
//!    last row by convention
//! 3. Budget execution is recomputed wholesale, never incremented
//! 4. A failed recomputation never zeroes a figure; stale-plus-retryable
//!    beats silently wrong
//!
//! ## Usage
//! ```ignore
//! use kosha_engine::{BudgetExecutionReconciler, ProposalAllocationAggregator};
//!
//! let breakdown = ProposalAllocationAggregator::with_default_policy().aggregate(&proposal);
//! let report = BudgetExecutionReconciler::new().handle_event(&mut store, &event);
//! ```

pub mod aggregate;
pub mod approval;
pub mod balance;
pub mod reconcile;
pub mod resolve;

pub use aggregate::{
    AggregationPolicy, AllocationBreakdown, AttributionSource, ProposalAllocationAggregator,
    BREAKDOWN_SCHEMA,
};
pub use approval::{
    ApprovalBand, ApprovalTableError, ApprovalThresholdResolver, ApproverRole,
};
pub use balance::{equal_shares, rebalance_fixed, rebalance_percentages, PERCENT_TARGET};
pub use reconcile::{
    BudgetExecution, BudgetExecutionReconciler, ExecutionStore, InMemoryExecutionStore,
    ReconcileError, ReconcileReport, StoreError,
};
pub use resolve::{
    has_blocking, resolve_line_item, resolve_rules, resolved_total, ResolvedAllocation,
    ValidationError, ROUNDING_TOLERANCE,
};
