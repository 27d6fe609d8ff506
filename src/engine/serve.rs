// src/engine/serve.rs

//! `serve` orchestration: initial build, dev server, watch loop.
//!
//! ```text
//! Idle -> Building -> Failed -> Idle
//!                  -> Serving -> Watching <-> Rebuilding
//! (Idle | Building | Serving | Watching | Rebuilding) -> Stopped
//! ```

use std::fmt;
use std::future::{self, Future};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::model::ConfigFile;
use crate::engine::runtime::execute_plan;
use crate::engine::RuntimeEvent;
use crate::errors::{PipelineError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend, TaskContext};
use crate::plan::ExecutionPlan;
use crate::registry::TaskRegistry;
use crate::server::{DevServer, ReloadBroadcaster, ServerConfig};
use crate::types::{MacroTask, ServeMode};
use crate::watch::{build_rule_profiles, select_rules, spawn_watcher, ChangeBatch, WatchRuleProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeState {
    Idle,
    Building,
    Failed,
    Serving,
    Watching,
    Rebuilding,
    Stopped,
}

impl ServeState {
    pub fn can_transition_to(self, next: ServeState) -> bool {
        use ServeState::*;
        matches!(
            (self, next),
            (Idle, Building)
                | (Building, Failed)
                | (Building, Serving)
                | (Failed, Idle)
                | (Serving, Watching)
                | (Watching, Rebuilding)
                | (Rebuilding, Watching)
                | (Idle | Building | Serving | Watching | Rebuilding, Stopped)
        )
    }

    /// Move to `next`, rejecting transitions the machine does not allow.
    pub fn transition(&mut self, next: ServeState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(PipelineError::Other(anyhow::anyhow!(
                "illegal serve state transition {self:?} -> {next:?}"
            )));
        }
        info!(from = ?*self, to = ?next, "serve state");
        *self = next;
        Ok(())
    }
}

/// What handling one change batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rules whose tasks ran (or, for task-less rules, that only reload).
    pub rules: Vec<String>,
    /// Rules whose plan failed.
    pub failed: Vec<String>,
    /// Whether a reload notification went out.
    pub reloaded: bool,
}

/// Consumer of change batches: reruns the rules a batch selects and sends at
/// most one reload per batch.
pub struct WatchLoop<F> {
    root: PathBuf,
    ignored_dirs: Vec<String>,
    rules: Vec<WatchRuleProfile>,
    plans: Vec<ExecutionPlan>,
    registry: TaskRegistry,
    reload: ReloadBroadcaster,
    make_executor: F,
}

impl<F> fmt::Debug for WatchLoop<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("root", &self.root)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<F, E> WatchLoop<F>
where
    F: FnMut(mpsc::Sender<RuntimeEvent>) -> E,
    E: ExecutorBackend,
{
    pub fn new(cfg: &ConfigFile, reload: ReloadBroadcaster, make_executor: F) -> Result<Self> {
        let rules = build_rule_profiles(cfg.watch_rules())?;
        let composer = cfg.composer();
        let plans = rules
            .iter()
            .map(|rule| composer.compose_steps(rule.tasks()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: cfg.root().to_path_buf(),
            ignored_dirs: vec![cfg.paths().dist.clone()],
            rules,
            plans,
            registry: cfg.registry().clone(),
            reload,
            make_executor,
        })
    }

    /// Run every rule the batch selects, in declaration order. Failures are
    /// logged and do not stop the remaining rules.
    pub async fn handle_batch(&mut self, batch: &ChangeBatch) -> BatchOutcome {
        let selected: Vec<usize> = select_rules(&self.root, batch, &self.rules, &self.ignored_dirs)
            .into_iter()
            .filter_map(|rule| self.rules.iter().position(|r| std::ptr::eq(r, rule)))
            .collect();

        let mut outcome = BatchOutcome::default();
        let mut reload = false;

        for index in selected {
            let rule = &self.rules[index];
            let plan = &self.plans[index];
            let name = rule.name().to_string();

            if plan.is_empty() {
                reload |= rule.livereload();
                outcome.rules.push(name);
                continue;
            }

            info!(rule = %name, "change detected; rerunning");
            let result = execute_plan(
                plan,
                &self.registry,
                &mut self.make_executor,
                future::pending(),
            )
            .await;

            match result {
                Ok(summary) => {
                    info!(rule = %name, elapsed = ?summary.total, "rebuild finished");
                    reload |= rule.livereload();
                }
                Err(err) => {
                    error!(rule = %name, error = %err, "rebuild failed");
                    outcome.failed.push(name.clone());
                }
            }
            outcome.rules.push(name);
        }

        if reload {
            self.reload.notify();
            outcome.reloaded = true;
        }
        outcome
    }

    /// Consume batches until `shutdown` resolves or the watcher goes away.
    pub async fn run<S>(
        &mut self,
        mut batches: mpsc::UnboundedReceiver<ChangeBatch>,
        state: &mut ServeState,
        shutdown: S,
    ) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let batch = tokio::select! {
                batch = batches.recv() => match batch {
                    Some(b) => b,
                    None => {
                        warn!("file watcher stopped");
                        return Ok(());
                    }
                },
                _ = &mut shutdown => return Ok(()),
            };

            state.transition(ServeState::Rebuilding)?;
            tokio::select! {
                _ = self.handle_batch(&batch) => {}
                _ = &mut shutdown => return Ok(()),
            }
            state.transition(ServeState::Watching)?;
        }
    }
}

/// `serve` / `serve dist`.
///
/// Builds (edit) or optimizes (optimized), starts the server, and in edit
/// mode watches the project until `shutdown` resolves. The watcher and the
/// server are released on every exit path.
pub async fn serve<S>(
    cfg: &ConfigFile,
    ctx: Arc<TaskContext>,
    mode: ServeMode,
    allow_remote: bool,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let shutdown = shutdown.shared();
    let mut state = ServeState::Idle;

    state.transition(ServeState::Building)?;
    let macro_task = match mode {
        ServeMode::Edit => MacroTask::Build,
        ServeMode::Optimized => MacroTask::Optimize,
    };
    let plan = cfg.composer().compose(macro_task)?;
    let build = execute_plan(
        &plan,
        cfg.registry(),
        |tx| RealExecutorBackend::new(tx, Arc::clone(&ctx)),
        shutdown.clone(),
    )
    .await;

    match build {
        Ok(summary) => info!(macro_task = %macro_task, "initial build done\n{summary}"),
        Err(PipelineError::Interrupted) => {
            state.transition(ServeState::Stopped)?;
            return Err(PipelineError::Interrupted);
        }
        Err(err) => {
            state.transition(ServeState::Failed)?;
            state.transition(ServeState::Idle)?;
            return Err(err);
        }
    }

    state.transition(ServeState::Serving)?;
    let reload = ReloadBroadcaster::new();
    let server_config = match mode {
        ServeMode::Edit => ServerConfig::edit(cfg),
        ServeMode::Optimized => ServerConfig::optimized(cfg),
    }
    .allow_remote(allow_remote);
    let server = DevServer::start(server_config, reload.clone()).await?;

    match mode {
        ServeMode::Optimized => {
            info!("serving optimized build; press Ctrl-C to stop");
            shutdown.clone().await;
        }
        ServeMode::Edit => {
            let debounce = Duration::from_millis(cfg.config_section().debounce_ms);
            let (watcher, batches) = spawn_watcher(cfg.root(), debounce)?;
            state.transition(ServeState::Watching)?;

            let mut watch_loop = WatchLoop::new(cfg, reload, |tx| {
                RealExecutorBackend::new(tx, Arc::clone(&ctx))
            })?;
            watch_loop.run(batches, &mut state, shutdown.clone()).await?;
            drop(watcher);
        }
    }

    state.transition(ServeState::Stopped)?;
    server.stop().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ServeState::*;

    #[test]
    fn happy_path_transitions() {
        let mut state = Idle;
        for next in [Building, Serving, Watching, Rebuilding, Watching, Stopped] {
            state.transition(next).unwrap();
        }
        assert_eq!(state, Stopped);
    }

    #[test]
    fn failed_build_returns_to_idle() {
        let mut state = Idle;
        state.transition(Building).unwrap();
        state.transition(Failed).unwrap();
        state.transition(Idle).unwrap();
        assert_eq!(state, Idle);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(!Idle.can_transition_to(Watching));
        assert!(!Failed.can_transition_to(Serving));
        assert!(!Stopped.can_transition_to(Building));
        assert!(!Serving.can_transition_to(Rebuilding));

        let mut state = Watching;
        assert!(state.transition(Building).is_err());
        assert_eq!(state, Watching);
    }
}
