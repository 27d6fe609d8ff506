// src/exec/processors/sass.rs

use std::path::Path;

use grass::{Options, OutputStyle};
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::exec::expand::{dest_path, expand_inputs};
use crate::exec::TaskContext;
use crate::registry::{SassOptions, SassStyle, TaskDefinition};

use super::output_path;

/// Compile every non-partial stylesheet into `output/<rel>.css`.
///
/// grass resolves `@import`/`@use` from the real disk, so this processor
/// needs an on-disk project even when the context uses another filesystem.
pub fn run(ctx: &TaskContext, def: &TaskDefinition, opts: &SassOptions) -> Result<usize> {
    let base = ctx.resolve(&def.cwd);
    let out = output_path(ctx, def)?;
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;
    for pattern in &inputs.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    let style = match opts.style {
        SassStyle::Expanded => OutputStyle::Expanded,
        SassStyle::Compressed => OutputStyle::Compressed,
    };
    let include_paths: Vec<_> = opts
        .include_paths
        .iter()
        .map(|p| ctx.resolve(Path::new(p)))
        .collect();

    let mut compiled = 0;
    for rel in &inputs.files {
        if is_partial(rel) {
            debug!(task = %def.name, file = %rel.display(), "skipping partial");
            continue;
        }
        let src = base.join(rel);

        let mut options = Options::default().style(style).quiet(true);
        if let Some(dir) = src.parent() {
            options = options.load_path(dir);
        }
        for path in &include_paths {
            options = options.load_path(path);
        }

        let css = grass::from_path(&src, &options).map_err(|e| PipelineError::ExternalTool {
            tool: "sass".to_string(),
            message: format!("{}: {e}", rel.display()),
        })?;

        let dest = dest_path(&out, rel, Some(def.ext.as_deref().unwrap_or(".css")), false);
        ctx.fs.write(&dest, css.as_bytes())?;
        compiled += 1;
    }
    Ok(compiled)
}

fn is_partial(rel: &Path) -> bool {
    rel.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::fs::RealFileSystem;
    use crate::registry::TaskAction;

    #[test]
    fn partials_are_skipped() {
        assert!(is_partial(Path::new("scss/_vars.scss")));
        assert!(!is_partial(Path::new("scss/main.scss")));
    }

    #[test]
    fn compiles_with_imported_partial() {
        let dir = tempfile::tempdir().unwrap();
        let scss = dir.path().join("src/scss");
        std::fs::create_dir_all(&scss).unwrap();
        std::fs::write(scss.join("_vars.scss"), "$brand: #336699;").unwrap();
        std::fs::write(
            scss.join("main.scss"),
            "@import 'vars';\n.nav { a { color: $brand; } }",
        )
        .unwrap();

        let opts = SassOptions::default();
        let def = TaskDefinition {
            name: "sass".to_string(),
            inputs: vec!["*.scss".to_string()],
            cwd: PathBuf::from("src/scss"),
            output: Some(PathBuf::from("dist/css")),
            ext: None,
            action: TaskAction::Sass(opts.clone()),
        };
        let ctx = TaskContext::new(dir.path(), Arc::new(RealFileSystem));

        assert_eq!(run(&ctx, &def, &opts).unwrap(), 1);
        let css = std::fs::read_to_string(dir.path().join("dist/css/main.css")).unwrap();
        assert!(css.contains(".nav a"));
        assert!(css.contains("#336699"));
        assert!(!dir.path().join("dist/css/_vars.css").exists());
    }
}
