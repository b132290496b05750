//! Planning module for reconciliation passes.
//!
//! This module handles the comparison between desired and observed items,
//! turning the difference into ordered change plans and applying them per
//! instance.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffEngine, DiffResult, DiffType};
pub use executor::{
    InstanceOutcome, KindReport, ObjectKind, ReconcileContext, Toplevel, apply_kind,
};
pub use plan::{ActionType, ChangePlan, PlannedChange};
