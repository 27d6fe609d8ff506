// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the plan runner, which dispatches one stage of an `ExecutionPlan` at a
//!   time and stops at the first failed stage
//! - the serve loop (`serve`), which keeps the dev server up and reruns watch
//!   rules on file changes
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::registry::TaskDefinition;

pub use crate::registry::TaskName;

/// Outcome of a single task run.
#[derive(Debug)]
pub enum TaskOutcome {
    Success,
    Failed(PipelineError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// A task handed to the executor.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Only process inputs newer than their outputs.
    pub only_newer: bool,
    /// Zero-based index of the stage this task belongs to.
    pub stage: usize,
    pub definition: Arc<TaskDefinition>,
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A task finished (successfully or not).
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
        elapsed: Duration,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Timing record for one completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: TaskName,
    pub elapsed: Duration,
    pub success: bool,
}

/// Per-task timings of one plan run, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
    pub total: Duration,
}

impl RunSummary {
    pub fn task_names(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.name.as_str()).collect()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .reports
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0)
            .max("Total".len());
        for report in &self.reports {
            writeln!(
                f,
                "  {:<width$}  {:>8.2?}{}",
                report.name,
                report.elapsed,
                if report.success { "" } else { "  (failed)" },
            )?;
        }
        write!(f, "  {:<width$}  {:>8.2?}", "Total", self.total)
    }
}

pub mod core;
pub mod runtime;
pub mod serve;

pub use core::{CoreCommand, CoreRuntime, CoreStep};
pub use runtime::{execute_plan, Runtime};
pub use serve::{ServeState, WatchLoop};
