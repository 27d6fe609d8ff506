// src/exec/processors/template.rs

//! Page rendering with minijinja.
//!
//! Pages see every data file under its stem (`site.json` is `site`) and
//! `page.name` / `page.path`. With a layout, the rendered page is handed to
//! the layout as the already-safe `body` value.

use std::path::Path;

use anyhow::Context as _;
use minijinja::{context, Environment, Value};
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::expand::{dest_path, expand_inputs, key_for};
use crate::exec::TaskContext;
use crate::registry::{TaskDefinition, TemplateOptions};

use super::output_path;

const LAYOUT: &str = "@layout";

pub fn run(ctx: &TaskContext, def: &TaskDefinition, opts: &TemplateOptions) -> Result<usize> {
    let fs = ctx.fs.as_ref();
    let root = ctx.resolve(Path::new(""));
    let out = output_path(ctx, def)?;
    let mut env = Environment::new();

    for rel in expand_inputs(fs, &root, &opts.partials)?.files {
        let name = key_for(&rel);
        let source = fs.read_to_string(&root.join(&rel))?;
        debug!(task = %def.name, partial = %name, "registered partial");
        env.add_template_owned(name, source)
            .map_err(|e| render_error(&rel, e))?;
    }

    if let Some(layout) = &opts.layout {
        let source = fs
            .read_to_string(&ctx.resolve(Path::new(layout)))
            .with_context(|| format!("reading layout {layout}"))?;
        env.add_template_owned(LAYOUT, source)
            .map_err(|e| render_error(Path::new(layout), e))?;
    }

    let mut data = serde_json::Map::new();
    for rel in expand_inputs(fs, &root, &opts.data)?.files {
        let text = fs.read_to_string(&root.join(&rel))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| PipelineError::ExternalTool {
                tool: "json".to_string(),
                message: format!("{}: {e}", rel.display()),
            })?;
        data.insert(key_for(&rel), value);
    }
    let data = Value::from_serialize(&data);

    let base = ctx.resolve(&def.cwd);
    let pages = expand_inputs(fs, &base, &def.inputs)?;
    for pattern in &pages.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    let mut page_names = Vec::with_capacity(pages.files.len());
    for rel in &pages.files {
        let name = format!("page:{}", rel.display());
        let source = fs.read_to_string(&base.join(rel))?;
        env.add_template_owned(name.clone(), source)
            .map_err(|e| render_error(rel, e))?;
        page_names.push(name);
    }

    for (rel, name) in pages.files.iter().zip(&page_names) {
        let page_ctx = context! {
            page => context! {
                name => key_for(rel),
                path => rel.to_string_lossy().replace('\\', "/"),
            },
            ..data.clone()
        };

        let body = env
            .get_template(name)
            .and_then(|t| t.render(&page_ctx))
            .map_err(|e| render_error(rel, e))?;

        let html = if opts.layout.is_some() {
            env.get_template(LAYOUT)
                .and_then(|t| {
                    t.render(context! {
                        body => Value::from_safe_string(body),
                        ..page_ctx.clone()
                    })
                })
                .map_err(|e| render_error(rel, e))?
        } else {
            body
        };

        let dest = dest_path(
            &out,
            rel,
            Some(def.ext.as_deref().unwrap_or(".html")),
            opts.flatten,
        );
        fs.write(&dest, html.as_bytes())?;
    }

    Ok(pages.files.len())
}

fn render_error(rel: &Path, err: minijinja::Error) -> PipelineError {
    PipelineError::ExternalTool {
        tool: "template".to_string(),
        message: format!("{}: {err}", rel.display()),
    }
}
