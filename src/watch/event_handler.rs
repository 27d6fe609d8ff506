// src/watch/event_handler.rs

//! Turning a debounced change batch into the set of watch rules to run.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::watch::path_utils::{is_within, relative_str};
use crate::watch::patterns::WatchRuleProfile;

/// One debounced group of changed paths (absolute, as reported by the OS).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub paths: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Select the rules a batch triggers.
///
/// Every rule appears at most once, in declaration order, however many of
/// its files changed. Paths inside any of `ignored_dirs` (root-relative,
/// typically the build output) never trigger anything.
pub fn select_rules<'a>(
    root: &Path,
    batch: &ChangeBatch,
    rules: &'a [WatchRuleProfile],
    ignored_dirs: &[String],
) -> Vec<&'a WatchRuleProfile> {
    let rel_paths: Vec<String> = batch
        .paths
        .iter()
        .filter_map(|path| {
            let rel = relative_str(root, path);
            if rel.is_none() {
                warn!(?path, ?root, "could not relativize path against root");
            }
            rel
        })
        .filter(|rel| !ignored_dirs.iter().any(|dir| is_within(rel, dir)))
        .collect();

    if rel_paths.is_empty() {
        return Vec::new();
    }

    let selected: Vec<&WatchRuleProfile> = rules
        .iter()
        .filter(|rule| rel_paths.iter().any(|rel| rule.matches(rel)))
        .collect();

    debug!(
        changed = ?rel_paths,
        rules = ?selected.iter().map(|r| r.name()).collect::<Vec<_>>(),
        "change batch matched watch rules"
    );

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::WatchRuleConfig;
    use crate::watch::patterns::build_rule_profiles;

    fn rules() -> Vec<WatchRuleProfile> {
        let cfg = |name: &str, files: &[&str], livereload: bool| WatchRuleConfig {
            name: name.to_string(),
            files: files.iter().map(|s| s.to_string()).collect(),
            tasks: vec![],
            livereload,
        };
        build_rule_profiles(&[
            cfg("sass", &["src/scss/**/*.scss"], false),
            cfg("livereload", &["src/**/*.html", "src/js/**/*.js", "dist/**"], true),
        ])
        .unwrap()
    }

    #[test]
    fn rule_selected_once_per_batch() {
        let rules = rules();
        let batch = ChangeBatch::new(vec![
            PathBuf::from("/p/src/scss/a.scss"),
            PathBuf::from("/p/src/scss/b.scss"),
            PathBuf::from("/p/src/scss/c.scss"),
        ]);
        let selected = select_rules(Path::new("/p"), &batch, &rules, &[]);
        let names: Vec<&str> = selected.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["sass"]);
    }

    #[test]
    fn declaration_order_is_kept() {
        let rules = rules();
        let batch = ChangeBatch::new(vec![
            PathBuf::from("/p/src/index.html"),
            PathBuf::from("/p/src/scss/a.scss"),
        ]);
        let names: Vec<&str> = select_rules(Path::new("/p"), &batch, &rules, &[])
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["sass", "livereload"]);
    }

    #[test]
    fn output_dir_changes_are_ignored() {
        let rules = rules();
        let batch = ChangeBatch::new(vec![PathBuf::from("/p/dist/css/main.css")]);
        assert!(select_rules(Path::new("/p"), &batch, &rules, &["dist".to_string()]).is_empty());
    }
}
