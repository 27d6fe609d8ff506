// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels, handing `ScheduledTask`s to the executor and
//! watching for Ctrl+C.
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::{RunSummary, RuntimeEvent, ScheduledTask, TaskName, TaskOutcome, TaskReport};
use crate::errors::{PipelineError, Result};
use crate::plan::ExecutionPlan;
use crate::registry::TaskRegistry;

/// What the IO shell should do next.
#[derive(Debug)]
pub enum CoreCommand {
    /// Start every task of the next stage.
    DispatchTasks(Vec<ScheduledTask>),
    /// The plan is over (finished, failed or interrupted).
    RequestExit,
}

/// Result of feeding one event into the core.
#[derive(Debug)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn wait() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn exit() -> Self {
        Self {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        }
    }
}

/// Pure core runtime state for one plan run.
///
/// Stages run strictly in order. The first failure is remembered; once the
/// failing stage has drained no further stage is dispatched. A shutdown
/// request has the same effect without recording a failure.
#[derive(Debug)]
pub struct CoreRuntime {
    stages: Vec<Vec<ScheduledTask>>,
    next_stage: usize,
    in_flight: BTreeSet<TaskName>,
    failure: Option<PipelineError>,
    interrupted: bool,
    reports: Vec<TaskReport>,
}

impl CoreRuntime {
    /// Resolve every planned task against the registry up front, so a
    /// dangling name fails before anything runs.
    pub fn new(plan: &ExecutionPlan, registry: &TaskRegistry) -> Result<Self> {
        let mut stages = Vec::with_capacity(plan.len());
        for (index, stage) in plan.stages().iter().enumerate() {
            let mut tasks = Vec::with_capacity(stage.tasks().len());
            for planned in stage.tasks() {
                tasks.push(ScheduledTask {
                    name: planned.name.clone(),
                    only_newer: planned.only_newer,
                    stage: index,
                    definition: registry.resolve(&planned.name)?,
                });
            }
            stages.push(tasks);
        }

        Ok(Self {
            stages,
            next_stage: 0,
            in_flight: BTreeSet::new(),
            failure: None,
            interrupted: false,
            reports: Vec::new(),
        })
    }

    /// Dispatch the first stage (or finish right away for an empty plan).
    pub fn start(&mut self) -> CoreStep {
        self.advance()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted {
                task,
                outcome,
                elapsed,
            } => self.handle_completion(task, outcome, elapsed),
            RuntimeEvent::ShutdownRequested => {
                if !self.interrupted {
                    info!(
                        running = self.in_flight.len(),
                        "shutdown requested; finishing running tasks"
                    );
                }
                self.interrupted = true;
                self.advance()
            }
        }
    }

    fn handle_completion(
        &mut self,
        task: TaskName,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> CoreStep {
        if !self.in_flight.remove(&task) {
            warn!(task = %task, "completion for a task that is not running; ignoring");
            return CoreStep::wait();
        }

        self.reports.push(TaskReport {
            name: task.clone(),
            elapsed,
            success: outcome.is_success(),
        });

        if let TaskOutcome::Failed(err) = outcome {
            if self.failure.is_none() {
                self.failure = Some(PipelineError::in_task(task, err));
            } else {
                error!(task = %task, error = %err, "additional failure in the same stage");
            }
        }

        self.advance()
    }

    fn advance(&mut self) -> CoreStep {
        if !self.in_flight.is_empty() {
            return CoreStep::wait();
        }

        if self.failure.is_some() || self.interrupted || self.next_stage >= self.stages.len() {
            return CoreStep::exit();
        }

        let index = self.next_stage;
        self.next_stage += 1;
        let tasks = self.stages[index].clone();
        self.in_flight = tasks.iter().map(|t| t.name.clone()).collect();

        debug!(
            stage = index + 1,
            of = self.stages.len(),
            tasks = ?tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "dispatching stage"
        );

        CoreStep {
            commands: vec![CoreCommand::DispatchTasks(tasks)],
            keep_running: true,
        }
    }

    /// Final result once the core asked to exit.
    pub fn into_result(self, total: Duration) -> Result<RunSummary> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        if self.interrupted && self.next_stage < self.stages.len() {
            return Err(PipelineError::Interrupted);
        }
        Ok(RunSummary {
            reports: self.reports,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{PathsSection, TaskConfig};
    use crate::config::vars::PathVars;
    use crate::plan::{PlannedTask, Stage};
    use crate::registry::TaskDefinition;

    fn registry(names: &[&str]) -> TaskRegistry {
        let vars = PathVars::new(&PathsSection::default());
        let cfg: TaskConfig = toml::from_str("kind = \"clean\"\noutput = \"dist\"").unwrap();
        let mut registry = TaskRegistry::new();
        for name in names {
            registry
                .register(TaskDefinition::from_config(name, &cfg, &vars).unwrap())
                .unwrap();
        }
        registry
    }

    fn plan(stages: &[&[&str]]) -> ExecutionPlan {
        ExecutionPlan::new(
            stages
                .iter()
                .map(|s| Stage::new(s.iter().map(|n| PlannedTask::new(*n)).collect()))
                .collect(),
        )
    }

    fn done(task: &str, ok: bool) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome: if ok {
                TaskOutcome::Success
            } else {
                TaskOutcome::Failed(PipelineError::ExternalTool {
                    tool: "uglify".to_string(),
                    message: "boom".to_string(),
                })
            },
            elapsed: Duration::from_millis(1),
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => tasks.iter().map(|t| t.name.clone()).collect(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn next_stage_waits_for_whole_stage() {
        let registry = registry(&["a", "b", "c"]);
        let mut core = CoreRuntime::new(&plan(&[&["a", "b"], &["c"]]), &registry).unwrap();

        assert_eq!(dispatched(&core.start()), vec!["a", "b"]);
        assert!(dispatched(&core.step(done("a", true))).is_empty());
        assert_eq!(dispatched(&core.step(done("b", true))), vec!["c"]);

        let last = core.step(done("c", true));
        assert!(!last.keep_running);
        let summary = core.into_result(Duration::ZERO).unwrap();
        assert_eq!(summary.task_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failure_drains_stage_then_aborts() {
        let registry = registry(&["a", "b", "c"]);
        let mut core = CoreRuntime::new(&plan(&[&["a", "b"], &["c"]]), &registry).unwrap();
        core.start();

        let step = core.step(done("a", false));
        assert!(step.keep_running, "b is still running");
        let step = core.step(done("b", true));
        assert!(!step.keep_running);
        assert!(dispatched(&step).is_empty());

        let err = core.into_result(Duration::ZERO).unwrap_err();
        assert_eq!(err.task_name(), Some("a"));
    }

    #[test]
    fn shutdown_stops_before_next_stage() {
        let registry = registry(&["a", "b"]);
        let mut core = CoreRuntime::new(&plan(&[&["a"], &["b"]]), &registry).unwrap();
        core.start();

        assert!(core.step(RuntimeEvent::ShutdownRequested).keep_running);
        assert!(!core.step(done("a", true)).keep_running);
        assert!(matches!(
            core.into_result(Duration::ZERO),
            Err(PipelineError::Interrupted)
        ));
    }

    #[test]
    fn unknown_task_is_rejected_up_front() {
        let registry = registry(&["a"]);
        let err = CoreRuntime::new(&plan(&[&["a"], &["ghost"]]), &registry).unwrap_err();
        assert!(matches!(err, PipelineError::TaskNotFound(name) if name == "ghost"));
    }

    #[test]
    fn empty_plan_exits_immediately() {
        let registry = registry(&["a"]);
        let mut core = CoreRuntime::new(&ExecutionPlan::default(), &registry).unwrap();
        assert!(!core.start().keep_running);
        assert!(core.into_result(Duration::ZERO).unwrap().reports.is_empty());
    }
}
