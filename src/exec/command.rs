// src/exec/command.rs

//! External program tasks (JS minifiers, image optimizers, linters, ...).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::expand::{dest_path, expand_inputs, is_newer};
use crate::exec::TaskContext;
use crate::registry::{CommandOptions, TaskDefinition};

/// Lines of tool output kept in error messages.
const OUTPUT_TAIL_LINES: usize = 20;

pub async fn run(
    ctx: &TaskContext,
    def: &TaskDefinition,
    opts: &CommandOptions,
    only_newer: bool,
) -> Result<usize> {
    let base = ctx.resolve(&def.cwd);
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;
    for pattern in &inputs.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    if opts.per_file {
        let out = super::processors::output_path(ctx, def)?;
        let mut runs = 0;
        for rel in &inputs.files {
            let src = base.join(rel);
            let dest = dest_path(&out, rel, def.ext.as_deref(), false);
            if only_newer && !is_newer(ctx.fs.as_ref(), &src, &dest) {
                debug!(task = %def.name, file = %rel.display(), "up to date");
                continue;
            }
            if let Some(parent) = dest.parent() {
                ctx.fs.create_dir_all(parent)?;
            }
            let args = render_args(
                &opts.args,
                Some(&src),
                Some(&dest),
                std::slice::from_ref(&src),
                &opts.ignore,
            );
            invoke(ctx, def, opts, &args).await?;
            runs += 1;
        }
        return Ok(runs);
    }

    if !def.inputs.is_empty() && inputs.is_empty() {
        info!(task = %def.name, "no inputs matched; nothing to do");
        return Ok(0);
    }

    let output = def.output.as_ref().map(|o| ctx.resolve(o));
    if let Some(parent) = output.as_deref().and_then(Path::parent) {
        ctx.fs.create_dir_all(parent)?;
    }
    let args = render_args(
        &opts.args,
        None,
        output.as_deref(),
        &inputs.absolute(),
        &opts.ignore,
    );
    invoke(ctx, def, opts, &args).await?;
    Ok(1)
}

/// Substitute placeholders in `templates`.
///
/// An argument that is exactly `{inputs}` expands to one argument per input.
pub fn render_args(
    templates: &[String],
    input: Option<&Path>,
    output: Option<&Path>,
    inputs: &[PathBuf],
    ignore: &[String],
) -> Vec<String> {
    let ignore = ignore.join(",");
    let mut args = Vec::with_capacity(templates.len() + inputs.len());

    for template in templates {
        if template == "{inputs}" {
            args.extend(inputs.iter().map(|p| p.to_string_lossy().to_string()));
            continue;
        }
        let mut arg = template.replace("{ignore}", &ignore);
        if let Some(input) = input {
            arg = arg.replace("{input}", &input.to_string_lossy());
        }
        if let Some(output) = output {
            arg = arg.replace("{output}", &output.to_string_lossy());
        }
        args.push(arg);
    }
    args
}

async fn invoke(
    ctx: &TaskContext,
    def: &TaskDefinition,
    opts: &CommandOptions,
    args: &[String],
) -> Result<()> {
    debug!(task = %def.name, program = %opts.program, ?args, "spawning");

    let output = Command::new(&opts.program)
        .args(args)
        .current_dir(&ctx.root)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| PipelineError::ExternalTool {
            tool: opts.program.clone(),
            message: format!("failed to start: {e}"),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stdout.lines() {
        debug!(task = %def.name, "stdout: {}", line);
    }
    for line in stderr.lines() {
        debug!(task = %def.name, "stderr: {}", line);
    }

    if output.status.success() {
        return Ok(());
    }

    let code = output
        .status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let message = format!(
        "exit status {code}\n{}",
        output_tail(&stdout, &stderr, OUTPUT_TAIL_LINES)
    );

    if opts.lint {
        Err(PipelineError::LintViolation {
            tool: opts.program.clone(),
            message,
        })
    } else {
        Err(PipelineError::ExternalTool {
            tool: opts.program.clone(),
            message,
        })
    }
}

fn output_tail(stdout: &str, stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| !l.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
