// src/exec/processors/mod.rs

//! In-process processors.
//!
//! Every processor here is synchronous and runs on the blocking pool. External
//! programs live in [`crate::exec::command`] instead.

pub mod clean;
pub mod concat;
pub mod copy;
pub mod css;
pub mod sass;
pub mod template;

use std::path::PathBuf;

use crate::errors::{PipelineError, Result};
use crate::exec::TaskContext;
use crate::registry::{TaskAction, TaskDefinition};

/// Run a non-command task to completion. Returns the number of files written
/// (or removed, for `clean`).
pub fn run(ctx: &TaskContext, def: &TaskDefinition, only_newer: bool) -> Result<usize> {
    match &def.action {
        TaskAction::Clean(opts) => clean::run(ctx, def, opts),
        TaskAction::Copy(opts) => copy::run(ctx, def, opts, only_newer),
        TaskAction::Concat(opts) => concat::run(ctx, def, opts),
        TaskAction::Sass(opts) => sass::run(ctx, def, opts),
        TaskAction::Autoprefix(opts) => css::autoprefix(ctx, def, opts),
        TaskAction::CssMinify(opts) => css::minify(ctx, def, opts),
        TaskAction::Template(opts) => template::run(ctx, def, opts),
        TaskAction::Command(opts) => Err(PipelineError::ConfigError(format!(
            "task '{}' runs `{}` and cannot execute in-process",
            def.name, opts.program
        ))),
    }
}

/// Absolute output path of a task that requires one.
pub(crate) fn output_path(ctx: &TaskContext, def: &TaskDefinition) -> Result<PathBuf> {
    def.output
        .as_ref()
        .map(|o| ctx.resolve(o))
        .ok_or_else(|| {
            PipelineError::ConfigError(format!("task '{}' has no `output`", def.name))
        })
}
