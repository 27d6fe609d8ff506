// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, StepSpec, WatchRuleConfig};
use crate::config::vars::PathVars;
use crate::errors::{PipelineError, Result};
use crate::plan::Composer;
use crate::registry::{TaskDefinition, TaskRegistry};
use crate::types::MacroTask;
use crate::watch::patterns::build_rule_profiles;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;

        let vars = PathVars::new(&raw.paths);
        let paths = vars.expanded_paths(&raw.paths);

        let registry = build_registry(&raw, &vars)?;
        let macros = parse_macros(&raw.macros)?;
        validate_macro_graph(&macros)?;

        let composer = Composer::new(&registry, &macros);
        for task in macros.keys() {
            composer.compose(*task)?;
        }

        let watch = expand_watch_rules(&raw.watch, &vars);
        validate_watch_rules(&watch, &composer)?;

        Ok(ConfigFile::new_unchecked(
            paths,
            raw.config,
            raw.server,
            registry,
            macros,
            watch,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(PipelineError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if !cfg.server.vendor_mount.starts_with('/') {
        return Err(PipelineError::ConfigError(format!(
            "[server].vendor_mount must start with '/' (got '{}')",
            cfg.server.vendor_mount
        )));
    }

    Ok(())
}

fn build_registry(cfg: &RawConfigFile, vars: &PathVars) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    for (name, task) in cfg.task.iter() {
        if name.parse::<MacroTask>().is_ok() {
            return Err(PipelineError::ConfigError(format!(
                "task '{name}' clashes with the macro-task of the same name"
            )));
        }
        if name.starts_with("newer:") {
            return Err(PipelineError::ConfigError(format!(
                "task '{name}' must not start with the reserved `newer:` prefix"
            )));
        }
        registry.register(TaskDefinition::from_config(name, task, vars)?)?;
    }
    Ok(registry)
}

fn parse_macros(
    raw: &BTreeMap<String, Vec<StepSpec>>,
) -> Result<BTreeMap<MacroTask, Vec<StepSpec>>> {
    let mut macros = BTreeMap::new();
    for (key, steps) in raw.iter() {
        let task = key
            .parse::<MacroTask>()
            .map_err(|e| PipelineError::ConfigError(format!("[macro]: {e}")))?;
        macros.insert(task, steps.clone());
    }

    for required in MacroTask::REQUIRED {
        if !macros.contains_key(&required) {
            return Err(PipelineError::ConfigError(format!(
                "[macro] must define '{required}'"
            )));
        }
    }

    Ok(macros)
}

fn validate_macro_graph(macros: &BTreeMap<MacroTask, Vec<StepSpec>>) -> Result<()> {
    // Edge direction: referencing macro -> referenced macro.
    let mut graph: DiGraphMap<MacroTask, ()> = DiGraphMap::new();

    for (task, steps) in macros.iter() {
        graph.add_node(*task);
        for name in steps.iter().flat_map(StepSpec::names) {
            if let Ok(inner) = name.parse::<MacroTask>() {
                if inner == *task {
                    return Err(PipelineError::MacroCycle(format!(
                        "macro-task '{task}' refers to itself"
                    )));
                }
                graph.add_edge(*task, inner, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipelineError::MacroCycle(format!(
            "cycle detected in [macro] involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn expand_watch_rules(rules: &[WatchRuleConfig], vars: &PathVars) -> Vec<WatchRuleConfig> {
    rules
        .iter()
        .map(|rule| WatchRuleConfig {
            name: rule.name.clone(),
            files: vars.expand_all(&rule.files),
            tasks: rule.tasks.clone(),
            livereload: rule.livereload,
        })
        .collect()
}

fn validate_watch_rules(rules: &[WatchRuleConfig], composer: &Composer<'_>) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.name.as_str()) {
            return Err(PipelineError::ConfigError(format!(
                "watch rule '{}' is declared twice",
                rule.name
            )));
        }
        if rule.files.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "watch rule '{}' has no `files` patterns",
                rule.name
            )));
        }
        if rule.tasks.is_empty() && !rule.livereload {
            return Err(PipelineError::ConfigError(format!(
                "watch rule '{}' neither runs tasks nor reloads",
                rule.name
            )));
        }
        composer.compose_steps(&rule.tasks).map_err(|e| {
            PipelineError::ConfigError(format!("watch rule '{}': {e}", rule.name))
        })?;
    }

    build_rule_profiles(rules)?;
    Ok(())
}
