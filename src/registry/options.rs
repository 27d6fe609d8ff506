// src/registry/options.rs

//! Typed option bags, one per task kind.
//!
//! Unknown keys are rejected so typos in `Sitepipe.toml` surface at startup
//! instead of silently doing nothing.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanOptions {
    /// Top-level entries of the output directory that survive the wipe
    /// (glob patterns such as `.git*`).
    #[serde(default)]
    pub keep: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyOptions {
    /// Drop the directory part of each input.
    #[serde(default)]
    pub flatten: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcatOptions {
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Fail when an input pattern matches nothing.
    #[serde(default)]
    pub nonull: bool,
}

fn default_separator() -> String {
    "\n".to_string()
}

impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            nonull: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SassStyle {
    #[default]
    Expanded,
    Compressed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SassOptions {
    /// Extra `@import` / `@use` search paths, relative to the project root.
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub style: SassStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoprefixOptions {
    /// Browserslist queries.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

fn default_browsers() -> Vec<String> {
    vec!["defaults".to_string()]
}

impl Default for AutoprefixOptions {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CssMinifyOptions {
    /// Keep a line break after every closing brace.
    #[serde(default)]
    pub keep_breaks: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateOptions {
    /// Layout template wrapping every page; receives the page as `body`.
    #[serde(default)]
    pub layout: Option<String>,
    /// Partial globs, each registered under its file stem.
    #[serde(default)]
    pub partials: Vec<String>,
    /// JSON data globs, each exposed under its file stem.
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default = "default_true")]
    pub flatten: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            layout: None,
            partials: Vec::new(),
            data: Vec::new(),
            flatten: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOptions {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Run once per input file instead of once for all inputs.
    #[serde(default)]
    pub per_file: bool,
    /// Treat a non-zero exit as a lint violation rather than a tool failure.
    #[serde(default)]
    pub lint: bool,
    /// Regex patterns handed to the tool through `{ignore}`.
    #[serde(default)]
    pub ignore: Vec<String>,
}
