//! # Kosha Models
//!
//! Shared value types for the Kosha cost allocation and budget execution
//! engine. All monetary values use whole-currency-unit integer encoding to
//! ensure deterministic arithmetic without floating-point drift.
//!
//! ## Type Groups
//! - `Amount` - Whole-unit currency with checked arithmetic
//! - Identifier newtypes - `DepartmentId`, `ProposalId`, `BudgetId`
//! - `AllocationRule` - One cost attribution target on a line item or proposal
//! - `LineItem` / `Proposal` - Contract proposal value objects
//! - `Budget` - Business budget with derived execution figures
//! - `ProposalEvent` - Lifecycle events that trigger reconciliation
//!
//! ## Core Invariants
//! - Amounts never overflow silently; all arithmetic is checked
//! - `Budget::executed_amount` is derived state, never authored directly
//! - Events carry snapshots, not live references, so reducers stay pure

pub mod allocation;
pub mod budget;
pub mod events;
pub mod ids;
pub mod money;
pub mod proposal;

pub use allocation::{AllocationKind, AllocationRule};
pub use budget::Budget;
pub use events::ProposalEvent;
pub use ids::{BudgetId, DepartmentId, ProposalId};
pub use money::Amount;
pub use proposal::{LineItem, LineItemKind, Proposal, ProposalSnapshot, ProposalStatus};
