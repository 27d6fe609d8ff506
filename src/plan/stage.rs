// src/plan/stage.rs

use std::fmt;

use crate::registry::TaskName;

/// A task reference inside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlannedTask {
    pub name: TaskName,
    /// Process only inputs newer than their outputs (`newer:` prefix).
    pub only_newer: bool,
}

impl PlannedTask {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            only_newer: false,
        }
    }

    pub fn newer(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            only_newer: true,
        }
    }
}

impl fmt::Display for PlannedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.only_newer {
            write!(f, "newer:{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// One step of a plan: tasks that may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    tasks: Vec<PlannedTask>,
}

impl Stage {
    pub(crate) fn new(tasks: Vec<PlannedTask>) -> Self {
        Self { tasks }
    }

    pub fn single(task: PlannedTask) -> Self {
        Self { tasks: vec![task] }
    }

    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn is_parallel(&self) -> bool {
        self.tasks.len() > 1
    }
}

/// Ordered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    stages: Vec<Stage>,
}

impl ExecutionPlan {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Every task name referenced by the plan, in stage order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|s| s.tasks.iter().map(|t| t.name.as_str()))
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, stage) in self.stages.iter().enumerate() {
            let names: Vec<String> = stage.tasks.iter().map(|t| t.to_string()).collect();
            if stage.is_parallel() {
                writeln!(f, "  {:>2}. [parallel] {}", idx + 1, names.join(", "))?;
            } else {
                writeln!(f, "  {:>2}. {}", idx + 1, names.join(", "))?;
            }
        }
        Ok(())
    }
}
