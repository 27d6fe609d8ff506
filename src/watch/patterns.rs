// src/watch/patterns.rs

use std::fmt;

use globset::GlobSet;

use crate::config::model::WatchRuleConfig;
use crate::errors::{PipelineError, Result};
use crate::exec::expand::build_globset;

/// Compiled `files` patterns for a single `[[watch]]` rule.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"src/scss/main.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchRuleProfile {
    name: String,
    tasks: Vec<String>,
    livereload: bool,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchRuleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuleProfile")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("livereload", &self.livereload)
            .finish_non_exhaustive()
    }
}

impl WatchRuleProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step names to run when this rule fires (may be empty).
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn livereload(&self) -> bool {
        self.livereload
    }

    /// Returns true if `rel_path` (relative to project root) is watched by
    /// this rule.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        match &self.exclude_set {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

/// Compile every watch rule, keeping declaration order.
pub fn build_rule_profiles(rules: &[WatchRuleConfig]) -> Result<Vec<WatchRuleProfile>> {
    let mut profiles = Vec::with_capacity(rules.len());

    for rule in rules {
        let (excludes, includes): (Vec<String>, Vec<String>) = rule
            .files
            .iter()
            .cloned()
            .partition(|p| p.starts_with('!'));
        let excludes: Vec<String> = excludes
            .into_iter()
            .map(|p| p.trim_start_matches('!').to_string())
            .collect();

        if includes.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "watch rule '{}' only has exclude patterns",
                rule.name
            )));
        }

        let include_set = build_globset(&includes).map_err(|e| {
            PipelineError::ConfigError(format!("watch rule '{}': {e:#}", rule.name))
        })?;

        let exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(build_globset(&excludes).map_err(|e| {
                PipelineError::ConfigError(format!("watch rule '{}': {e:#}", rule.name))
            })?)
        };

        profiles.push(WatchRuleProfile {
            name: rule.name.clone(),
            tasks: rule.tasks.clone(),
            livereload: rule.livereload,
            include_set,
            exclude_set,
        });
    }

    Ok(profiles)
}
