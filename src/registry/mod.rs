// src/registry/mod.rs

//! Task registry: named, immutable task definitions.
//!
//! A definition is the `{inputs, output, options}` triple of one task plus the
//! processor kind that consumes it. Definitions are built once from the
//! configuration and shared behind `Arc` with the executor.

pub mod options;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;

use crate::config::model::{TaskConfig, TaskKind};
use crate::config::vars::PathVars;
use crate::errors::{PipelineError, Result};

pub use options::{
    AutoprefixOptions, CleanOptions, CommandOptions, ConcatOptions, CopyOptions,
    CssMinifyOptions, SassOptions, SassStyle, TemplateOptions,
};

/// Canonical task name type.
pub type TaskName = String;

/// Processor plus its typed options.
#[derive(Debug, Clone)]
pub enum TaskAction {
    Clean(CleanOptions),
    Copy(CopyOptions),
    Concat(ConcatOptions),
    Sass(SassOptions),
    Autoprefix(AutoprefixOptions),
    CssMinify(CssMinifyOptions),
    Template(TemplateOptions),
    Command(CommandOptions),
}

impl TaskAction {
    fn parse(kind: TaskKind, options: toml::Table) -> std::result::Result<Self, toml::de::Error> {
        let value = toml::Value::Table(options);
        Ok(match kind {
            TaskKind::Clean => TaskAction::Clean(value.try_into()?),
            TaskKind::Copy => TaskAction::Copy(value.try_into()?),
            TaskKind::Concat => TaskAction::Concat(value.try_into()?),
            TaskKind::Sass => TaskAction::Sass(value.try_into()?),
            TaskKind::Autoprefix => TaskAction::Autoprefix(value.try_into()?),
            TaskKind::CssMinify => TaskAction::CssMinify(value.try_into()?),
            TaskKind::Template => TaskAction::Template(value.try_into()?),
            TaskKind::Command => TaskAction::Command(value.try_into()?),
        })
    }

    /// Short label used in logs and error messages.
    pub fn label(&self) -> &str {
        match self {
            TaskAction::Clean(_) => "clean",
            TaskAction::Copy(_) => "copy",
            TaskAction::Concat(_) => "concat",
            TaskAction::Sass(_) => "sass",
            TaskAction::Autoprefix(_) => "autoprefix",
            TaskAction::CssMinify(_) => "css_minify",
            TaskAction::Template(_) => "template",
            TaskAction::Command(opts) => &opts.program,
        }
    }

    fn requires_output(&self) -> bool {
        match self {
            TaskAction::Autoprefix(_) => false,
            TaskAction::Command(opts) => opts.per_file,
            _ => true,
        }
    }
}

/// A fully resolved task. Paths are relative to the project root.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub name: TaskName,
    pub inputs: Vec<String>,
    pub cwd: PathBuf,
    pub output: Option<PathBuf>,
    pub ext: Option<String>,
    pub action: TaskAction,
}

impl TaskDefinition {
    /// Build a definition from its `[task.<name>]` section, expanding path
    /// variables and parsing the option bag for the task's kind.
    pub fn from_config(name: &str, cfg: &TaskConfig, vars: &PathVars) -> Result<Self> {
        let mut options = toml::Value::Table(cfg.options.clone());
        vars.expand_value(&mut options);
        let options = match options {
            toml::Value::Table(table) => table,
            _ => toml::Table::new(),
        };

        let action = TaskAction::parse(cfg.kind, options).map_err(|e| {
            PipelineError::ConfigError(format!("task '{name}' has invalid options: {e}"))
        })?;

        let output = cfg.output.as_deref().map(|o| PathBuf::from(vars.expand(o)));
        if output.is_none() && action.requires_output() {
            return Err(PipelineError::ConfigError(format!(
                "task '{name}' ({}) requires `output`",
                action.label()
            )));
        }

        if let TaskAction::Command(opts) = &action {
            for pattern in &opts.ignore {
                Regex::new(pattern).map_err(|e| {
                    PipelineError::ConfigError(format!(
                        "task '{name}' has invalid ignore pattern `{pattern}`: {e}"
                    ))
                })?;
            }
        }

        Ok(Self {
            name: name.to_string(),
            inputs: vars.expand_all(&cfg.inputs),
            cwd: PathBuf::from(cfg.cwd.as_deref().map(|c| vars.expand(c)).unwrap_or_default()),
            output,
            ext: cfg.ext.clone(),
            action,
        })
    }
}

/// In-memory table of task definitions.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Arc<TaskDefinition>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Names are unique.
    pub fn register(&mut self, definition: TaskDefinition) -> Result<()> {
        if self.tasks.contains_key(&definition.name) {
            return Err(PipelineError::ConfigError(format!(
                "task '{}' is already registered",
                definition.name
            )));
        }
        self.tasks
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<TaskDefinition>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All tasks named `<prefix>:<target>`, in name order.
    pub fn family(&self, prefix: &str) -> Vec<&str> {
        let head = format!("{prefix}:");
        self.tasks
            .keys()
            .filter(|name| name.starts_with(&head))
            .map(String::as_str)
            .collect()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<TaskDefinition>> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::PathsSection;

    fn task(toml_src: &str) -> TaskConfig {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn duplicate_registration_is_a_config_error() {
        let vars = PathVars::new(&PathsSection::default());
        let cfg = task(r#"kind = "clean"
output = "{dist}""#);
        let mut registry = TaskRegistry::new();
        registry
            .register(TaskDefinition::from_config("clean", &cfg, &vars).unwrap())
            .unwrap();
        let err = registry
            .register(TaskDefinition::from_config("clean", &cfg, &vars).unwrap())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("already registered")));
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let registry = TaskRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(PipelineError::TaskNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn family_lists_prefixed_tasks_only() {
        let vars = PathVars::new(&PathsSection::default());
        let copy = task(r#"kind = "copy"
output = "{dist}""#);
        let mut registry = TaskRegistry::new();
        for name in ["copy:styles", "copy:dist", "copyright"] {
            registry
                .register(TaskDefinition::from_config(name, &copy, &vars).unwrap())
                .unwrap();
        }
        assert_eq!(registry.family("copy"), vec!["copy:dist", "copy:styles"]);
    }

    #[test]
    fn options_are_typed_per_kind() {
        let vars = PathVars::new(&PathsSection::default());
        let cfg = task(
            r#"kind = "command"
inputs = ["{src}/js/**/*.js"]
[options]
program = "jshint"
args = ["{inputs}"]
lint = true
"#,
        );
        let def = TaskDefinition::from_config("jshint", &cfg, &vars).unwrap();
        assert_eq!(def.inputs, vec!["src/js/**/*.js".to_string()]);
        match def.action {
            TaskAction::Command(opts) => {
                assert_eq!(opts.program, "jshint");
                assert!(opts.lint);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn unknown_option_and_bad_regex_are_rejected() {
        let vars = PathVars::new(&PathsSection::default());
        let typo = task(
            r#"kind = "concat"
output = "out.js"
[options]
nonnull = true
"#,
        );
        assert!(TaskDefinition::from_config("concat:app", &typo, &vars).is_err());

        let bad_regex = task(
            r#"kind = "command"
[options]
program = "uncss"
ignore = ["item\\-[a-z"]
"#,
        );
        let err = TaskDefinition::from_config("uncss", &bad_regex, &vars).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("ignore pattern")));
    }
}
