// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `RealExecutorBackend` is the implementation used by `sitepipe`. Each
//!   task becomes its own Tokio task that reports `TaskCompleted` when done.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledTask};
use crate::errors::Result;

use super::task_runner::run_task;
use super::TaskContext;

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't touch the filesystem.
pub trait ExecutorBackend: Send {
    /// Start the given tasks. Must not wait for them to finish; completion
    /// is reported through `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<TaskContext>,
}

impl RealExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: Arc<TaskContext>) -> Self {
        Self { runtime_tx, ctx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let ctx = Arc::clone(&self.ctx);

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_task(task, Arc::clone(&ctx), tx.clone()));
            }
            Ok(())
        })
    }
}
