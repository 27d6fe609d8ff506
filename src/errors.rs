// src/errors.rs

//! Crate-wide error type.
//!
//! Configuration problems are reported once at startup; everything that goes
//! wrong while a task runs is wrapped into [`PipelineError::TaskFailed`] so the
//! CLI can name the failing task next to the underlying cause.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in macro-task references: {0}")]
    MacroCycle(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("no input file matched `{pattern}`")]
    MissingInput { pattern: String },

    #[error("{tool} reported lint violations: {message}")]
    LintViolation { tool: String, message: String },

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("interrupted before the plan finished")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap a processor error with the name of the task it came from.
    pub fn in_task(task: impl Into<String>, source: PipelineError) -> Self {
        PipelineError::TaskFailed {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// Name of the failing task, if this error came out of a task run.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            PipelineError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }

    pub fn is_lint_violation(&self) -> bool {
        match self {
            PipelineError::LintViolation { .. } => true,
            PipelineError::TaskFailed { source, .. } => source.is_lint_violation(),
            _ => false,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
