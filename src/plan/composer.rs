// src/plan/composer.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::StepSpec;
use crate::errors::{PipelineError, Result};
use crate::plan::stage::{ExecutionPlan, PlannedTask, Stage};
use crate::registry::TaskRegistry;
use crate::types::MacroTask;

const NEWER_PREFIX: &str = "newer:";

/// What a single step name refers to.
enum Resolved {
    Macro(MacroTask),
    Tasks(Vec<PlannedTask>),
}

/// Resolves macro-tasks into flat execution plans.
///
/// Name resolution order for a step: macro key, registered task, task family
/// (`copy` runs every `copy:*` task). A `newer:` prefix is carried through to
/// the planned task.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'a> {
    registry: &'a TaskRegistry,
    macros: &'a BTreeMap<MacroTask, Vec<StepSpec>>,
}

impl<'a> Composer<'a> {
    pub fn new(
        registry: &'a TaskRegistry,
        macros: &'a BTreeMap<MacroTask, Vec<StepSpec>>,
    ) -> Self {
        Self { registry, macros }
    }

    /// Flattened plan for a macro-task.
    ///
    /// Callers must only pass configurations whose macro references were
    /// checked for cycles (see `config::validate`).
    pub fn compose(&self, task: MacroTask) -> Result<ExecutionPlan> {
        let mut stages = Vec::new();
        self.expand_macro(task, &mut stages)?;
        debug!(macro_task = %task, stages = stages.len(), "composed plan");
        Ok(ExecutionPlan::new(stages))
    }

    /// Sequential plan for an ad-hoc list of step names (watch rules).
    pub fn compose_steps(&self, names: &[String]) -> Result<ExecutionPlan> {
        let mut stages = Vec::new();
        for name in names {
            self.expand_step(&StepSpec::Single(name.clone()), &mut stages)?;
        }
        Ok(ExecutionPlan::new(stages))
    }

    fn expand_macro(&self, task: MacroTask, stages: &mut Vec<Stage>) -> Result<()> {
        let steps = self.macros.get(&task).ok_or_else(|| {
            PipelineError::ConfigError(format!(
                "macro-task '{task}' is not configured in [macro]"
            ))
        })?;
        for step in steps {
            self.expand_step(step, stages)?;
        }
        Ok(())
    }

    fn expand_step(&self, step: &StepSpec, stages: &mut Vec<Stage>) -> Result<()> {
        match step {
            StepSpec::Single(name) => match self.resolve_name(name)? {
                Resolved::Macro(inner) => self.expand_macro(inner, stages),
                Resolved::Tasks(tasks) => {
                    // A family runs its members one after another.
                    stages.extend(tasks.into_iter().map(Stage::single));
                    Ok(())
                }
            },
            StepSpec::Parallel(names) => {
                if names.is_empty() {
                    return Err(PipelineError::ConfigError(
                        "parallel group must name at least one task".to_string(),
                    ));
                }
                let mut group: Vec<PlannedTask> = Vec::new();
                for name in names {
                    match self.resolve_name(name)? {
                        Resolved::Macro(inner) => {
                            return Err(PipelineError::ConfigError(format!(
                                "macro-task '{inner}' cannot be part of a parallel group"
                            )));
                        }
                        Resolved::Tasks(tasks) => {
                            for task in tasks {
                                // Listed twice: a full run wins over `newer:`.
                                match group.iter_mut().find(|t| t.name == task.name) {
                                    Some(existing) => existing.only_newer &= task.only_newer,
                                    None => group.push(task),
                                }
                            }
                        }
                    }
                }
                stages.push(Stage::new(group));
                Ok(())
            }
        }
    }

    fn resolve_name(&self, raw: &str) -> Result<Resolved> {
        let (name, only_newer) = match raw.strip_prefix(NEWER_PREFIX) {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        if let Ok(task) = name.parse::<MacroTask>() {
            if only_newer {
                return Err(PipelineError::ConfigError(format!(
                    "`newer:` cannot be applied to macro-task '{task}'"
                )));
            }
            return Ok(Resolved::Macro(task));
        }

        let planned = |n: &str| PlannedTask {
            name: n.to_string(),
            only_newer,
        };

        if self.registry.contains(name) {
            return Ok(Resolved::Tasks(vec![planned(name)]));
        }

        let family = self.registry.family(name);
        if !family.is_empty() {
            return Ok(Resolved::Tasks(family.into_iter().map(planned).collect()));
        }

        Err(PipelineError::TaskNotFound(raw.to_string()))
    }
}
