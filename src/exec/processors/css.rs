// src/exec/processors/css.rs

//! Vendor prefixing and minification through lightningcss.

use anyhow::Context;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::warn;

use crate::errors::{PipelineError, Result};
use crate::exec::expand::expand_inputs;
use crate::exec::TaskContext;
use crate::registry::{AutoprefixOptions, CssMinifyOptions, TaskDefinition};

/// Rewrite each input with vendor prefixes for `browsers`.
///
/// Without an `output` the inputs are rewritten in place; otherwise each
/// input lands at `output/<rel>`.
pub fn autoprefix(ctx: &TaskContext, def: &TaskDefinition, opts: &AutoprefixOptions) -> Result<usize> {
    let targets = browser_targets(&opts.browsers)?;
    let base = ctx.resolve(&def.cwd);
    let out_dir = def.output.as_ref().map(|o| ctx.resolve(o));
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;
    for pattern in &inputs.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    for rel in &inputs.files {
        let src = base.join(rel);
        let code = ctx
            .fs
            .read_to_string(&src)
            .with_context(|| format!("autoprefix input {}", src.display()))?;
        let prefixed = transform(&code, &rel.to_string_lossy(), targets, false)?;
        let dest = out_dir.as_ref().map(|o| o.join(rel)).unwrap_or(src);
        ctx.fs.write(&dest, prefixed.as_bytes())?;
    }
    Ok(inputs.files.len())
}

/// Concatenate inputs and write them minified into the output file.
pub fn minify(ctx: &TaskContext, def: &TaskDefinition, opts: &CssMinifyOptions) -> Result<usize> {
    let base = ctx.resolve(&def.cwd);
    let out = super::output_path(ctx, def)?;
    let inputs = expand_inputs(ctx.fs.as_ref(), &base, &def.inputs)?;
    for pattern in &inputs.unmatched {
        warn!(task = %def.name, %pattern, "pattern matched no files");
    }

    let mut combined = String::new();
    for src in inputs.absolute() {
        let code = ctx
            .fs
            .read_to_string(&src)
            .with_context(|| format!("css_minify input {}", src.display()))?;
        combined.push_str(&code);
        combined.push('\n');
    }

    let file_name = out.to_string_lossy().to_string();
    let mut minified = transform(&combined, &file_name, Targets::default(), true)?;
    if opts.keep_breaks {
        minified = break_after_blocks(&minified);
    }
    ctx.fs.write(&out, minified.as_bytes())?;
    Ok(1)
}

/// Insert a newline after every `}` that closes a block. Braces inside
/// quoted strings are left alone.
fn break_after_blocks(css: &str) -> String {
    let mut out = String::with_capacity(css.len() + css.len() / 16);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in css.chars() {
        out.push(c);
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '}' => out.push('\n'),
            None => {}
        }
    }
    out
}

fn browser_targets(queries: &[String]) -> Result<Targets> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str)).map_err(|e| {
        PipelineError::ConfigError(format!("invalid browsers query {queries:?}: {e}"))
    })?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

fn transform(code: &str, filename: &str, targets: Targets, minify: bool) -> Result<String> {
    let tool_error = |message: String| PipelineError::ExternalTool {
        tool: "lightningcss".to_string(),
        message: format!("{filename}: {message}"),
    };

    let mut sheet = StyleSheet::parse(
        code,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| tool_error(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| tool_error(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| tool_error(e.to_string()))?;

    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::registry::TaskAction;

    #[test]
    fn adds_prefixes_in_place() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/css/main.css", ".a { user-select: none; }");
        let ctx = TaskContext::new(".", Arc::new(fs.clone()));
        let opts = AutoprefixOptions {
            browsers: vec!["safari 10".to_string()],
        };
        let def = TaskDefinition {
            name: "autoprefixer".to_string(),
            inputs: vec!["*.css".to_string()],
            cwd: PathBuf::from("dist/css"),
            output: None,
            ext: None,
            action: TaskAction::Autoprefix(opts.clone()),
        };

        assert_eq!(autoprefix(&ctx, &def, &opts).unwrap(), 1);
        let css = fs.read_to_string(Path::new("./dist/css/main.css")).unwrap();
        assert!(css.contains("-webkit-user-select"), "{css}");
    }

    #[test]
    fn minify_concatenates_and_keeps_breaks() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/css/a.css", ".a {\n  color: red;\n}\n");
        fs.add_file("./dist/css/b.css", ".b {\n  margin: 0px;\n}\n");
        let ctx = TaskContext::new(".", Arc::new(fs.clone()));
        let opts = CssMinifyOptions { keep_breaks: true };
        let def = TaskDefinition {
            name: "cssmin".to_string(),
            inputs: vec!["a.css".to_string(), "b.css".to_string()],
            cwd: PathBuf::from("dist/css"),
            output: Some(PathBuf::from("dist/css/site.min.css")),
            ext: None,
            action: TaskAction::CssMinify(opts.clone()),
        };

        minify(&ctx, &def, &opts).unwrap();
        let css = fs.read_to_string(Path::new("./dist/css/site.min.css")).unwrap();
        assert_eq!(css.lines().count(), 2);
        assert!(css.starts_with(".a{color:red}"), "{css}");
    }

    #[test]
    fn keep_breaks_leaves_string_literals_intact() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/css/a.css", ".a::after { content: \"}\"; }\n.b { color: red; }\n");
        let ctx = TaskContext::new(".", Arc::new(fs.clone()));
        let opts = CssMinifyOptions { keep_breaks: true };
        let def = TaskDefinition {
            name: "cssmin".to_string(),
            inputs: vec!["a.css".to_string()],
            cwd: PathBuf::from("dist/css"),
            output: Some(PathBuf::from("dist/css/a.min.css")),
            ext: None,
            action: TaskAction::CssMinify(opts.clone()),
        };

        minify(&ctx, &def, &opts).unwrap();
        let css = fs.read_to_string(Path::new("./dist/css/a.min.css")).unwrap();
        assert_eq!(css.lines().count(), 2, "{css}");
        assert!(css.lines().next().unwrap().contains("content:\"}\""), "{css}");
    }

    #[test]
    fn block_breaks_skip_quoted_and_escaped_braces() {
        assert_eq!(
            break_after_blocks(r#".a{content:"\"}"}.b{content:'}'}"#),
            ".a{content:\"\\\"}\"}\n.b{content:'}'}\n"
        );
    }

    #[test]
    fn bad_browsers_query_is_a_config_error() {
        let err = browser_targets(&["not a real browser 99".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
