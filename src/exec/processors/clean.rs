// src/exec/processors/clean.rs

use tracing::debug;

use crate::errors::Result;
use crate::exec::expand::build_globset;
use crate::exec::TaskContext;
use crate::registry::{CleanOptions, TaskDefinition};

use super::output_path;

/// Wipe the output directory, keeping top-level entries matched by `keep`.
pub fn run(ctx: &TaskContext, def: &TaskDefinition, opts: &CleanOptions) -> Result<usize> {
    let out = output_path(ctx, def)?;
    let fs = &ctx.fs;
    let keep = build_globset(&opts.keep)?;

    let mut removed = 0;
    if fs.is_dir(&out) {
        for entry in fs.read_dir(&out)? {
            let name = entry
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if keep.is_match(&name) {
                debug!(task = %def.name, entry = %name, "kept");
                continue;
            }
            if fs.is_dir(&entry) {
                fs.remove_dir_all(&entry)?;
            } else {
                fs.remove_file(&entry)?;
            }
            removed += 1;
        }
    } else if fs.exists(&out) {
        fs.remove_file(&out)?;
        removed += 1;
    }

    fs.create_dir_all(&out)?;
    Ok(removed)
}
