// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, ScheduledTask, TaskOutcome};
use crate::errors::{PipelineError, Result};
use crate::registry::TaskAction;

use super::{command, processors, TaskContext};

/// Run a single task, log its outcome and emit exactly one `TaskCompleted`.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<TaskContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(
        task = %task.name,
        kind = task.definition.action.label(),
        newer = task.only_newer,
        "starting task"
    );
    let started = Instant::now();
    let result = execute(&task, &ctx).await;
    let elapsed = started.elapsed();

    let outcome = match result {
        Ok(files) => {
            info!(task = %task.name, files, elapsed_ms = elapsed.as_millis() as u64, "task finished");
            TaskOutcome::Success
        }
        Err(err) if ctx.force_lint && err.is_lint_violation() => {
            warn!(task = %task.name, error = %err, "lint violations ignored (--force)");
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, error = %err, "task failed");
            TaskOutcome::Failed(err)
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
            elapsed,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, "runtime gone; dropping completion");
    }
}

/// Run the task's processor. Blocking processors go to the blocking pool;
/// external programs run as child processes.
pub async fn execute(task: &ScheduledTask, ctx: &Arc<TaskContext>) -> Result<usize> {
    let def = Arc::clone(&task.definition);
    if let TaskAction::Command(opts) = &def.action {
        return command::run(ctx, &def, opts, task.only_newer).await;
    }

    let ctx = Arc::clone(ctx);
    let only_newer = task.only_newer;
    tokio::task::spawn_blocking(move || processors::run(&ctx, &def, only_newer))
        .await
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("task panicked: {e}")))?
}
