// src/plan/mod.rs

//! Execution plans and the composer that builds them.
//!
//! - [`stage`] holds the plan data types.
//! - [`composer`] turns a [`crate::types::MacroTask`] or a list of step names
//!   into a flat sequence of stages.
//!
//! Ordering is entirely declared by configuration; nothing here infers
//! dependencies from overlapping inputs or outputs.

pub mod composer;
pub mod stage;

pub use composer::Composer;
pub use stage::{ExecutionPlan, PlannedTask, Stage};
