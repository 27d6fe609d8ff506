// src/exec/processors/copy.rs

use tracing::{debug, warn};

use crate::errors::Result;
use crate::exec::expand::{dest_path, expand_inputs, is_newer};
use crate::exec::TaskContext;
use crate::registry::{CopyOptions, TaskDefinition};

use super::output_path;

pub fn run(
    ctx: &TaskContext,
    def: &TaskDefinition,
    opts: &CopyOptions,
    only_newer: bool,
) -> Result<usize> {
    let base = ctx.resolve(&def.cwd);
    let out = output_path(ctx, def)?;
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;
    for pattern in &inputs.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    let mut copied = 0;
    for rel in &inputs.files {
        let src = base.join(rel);
        let dest = dest_path(&out, rel, def.ext.as_deref(), opts.flatten);
        if only_newer && !is_newer(ctx.fs.as_ref(), &src, &dest) {
            debug!(task = %def.name, file = %rel.display(), "up to date");
            continue;
        }
        ctx.fs.copy(&src, &dest)?;
        copied += 1;
    }
    Ok(copied)
}
