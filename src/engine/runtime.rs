// src/engine/runtime.rs

use std::fmt;
use std::future::{self, Future};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{RunSummary, ScheduledTask};
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;
use crate::plan::ExecutionPlan;
use crate::registry::TaskRegistry;

use super::core::{CoreCommand, CoreRuntime, CoreStep};
use super::RuntimeEvent;

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives one plan run in response to `RuntimeEvent`s and delegates the
/// actual work to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run the plan to completion.
    pub async fn run(self) -> Result<RunSummary> {
        self.run_until(future::pending()).await
    }

    /// Run the plan, treating `shutdown` resolving as a shutdown request.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core.
    pub async fn run_until<S>(mut self, shutdown: S) -> Result<RunSummary>
    where
        S: Future<Output = ()>,
    {
        let started = Instant::now();
        tokio::pin!(shutdown);
        let mut shutdown_seen = false;

        let mut step = self.core.start();
        loop {
            let keep_running = step.keep_running;
            self.execute(step).await?;
            if !keep_running {
                break;
            }

            let event = tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(e) => e,
                    None => {
                        return Err(PipelineError::Other(anyhow::anyhow!(
                            "runtime event channel closed with tasks still running"
                        )));
                    }
                },
                _ = &mut shutdown, if !shutdown_seen => {
                    shutdown_seen = true;
                    RuntimeEvent::ShutdownRequested
                }
            };

            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        self.core.into_result(started.elapsed())
    }

    async fn execute(&mut self, step: CoreStep) -> Result<()> {
        for command in step.commands {
            match command {
                CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
                CoreCommand::RequestExit => debug!("core issued RequestExit command"),
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        info!(stage = tasks[0].stage + 1, tasks = ?names, "running");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

/// Run `plan` with an executor built around the runtime's event sender.
pub async fn execute_plan<E, F, S>(
    plan: &ExecutionPlan,
    registry: &TaskRegistry,
    make_executor: F,
    shutdown: S,
) -> Result<RunSummary>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
    S: Future<Output = ()>,
{
    let core = CoreRuntime::new(plan, registry)?;
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let executor = make_executor(tx);
    Runtime::new(core, rx, executor).run_until(shutdown).await
}
