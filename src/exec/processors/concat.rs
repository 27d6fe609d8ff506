// src/exec/processors/concat.rs

use anyhow::Context;
use tracing::warn;

use crate::errors::{PipelineError, Result};
use crate::exec::expand::expand_inputs;
use crate::exec::TaskContext;
use crate::registry::{ConcatOptions, TaskDefinition};

use super::output_path;

/// Join every input, in declared pattern order, into the output file.
pub fn run(ctx: &TaskContext, def: &TaskDefinition, opts: &ConcatOptions) -> Result<usize> {
    let base = ctx.resolve(&def.cwd);
    let out = output_path(ctx, def)?;
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;

    if let Some(pattern) = inputs.unmatched.first() {
        if opts.nonull {
            return Err(PipelineError::MissingInput {
                pattern: pattern.clone(),
            });
        }
        for pattern in &inputs.unmatched {
            warn!(task = %def.name, %pattern, "pattern matched no files");
        }
    }

    let mut parts = Vec::with_capacity(inputs.files.len());
    for src in inputs.absolute() {
        let text = ctx
            .fs
            .read_to_string(&src)
            .with_context(|| format!("concat input {}", src.display()))?;
        parts.push(text);
    }

    ctx.fs.write(&out, parts.join(&opts.separator).as_bytes())?;
    Ok(1)
}
