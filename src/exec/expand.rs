// src/exec/expand.rs

//! Input glob expansion and output path mapping.
//!
//! Patterns are matched against paths relative to a base directory, using
//! `/` as the separator on every platform. `*` does not cross directory
//! boundaries; `**` does. Patterns starting with `!` exclude.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

/// Result of expanding a list of patterns under one base directory.
#[derive(Debug, Clone, Default)]
pub struct InputSet {
    pub base: PathBuf,
    /// Matched files relative to `base`, in pattern order (each pattern's
    /// matches sorted), without duplicates.
    pub files: Vec<PathBuf>,
    /// Include patterns that matched no file at all.
    pub unmatched: Vec<String>,
}

impl InputSet {
    pub fn absolute(&self) -> Vec<PathBuf> {
        self.files.iter().map(|rel| self.base.join(rel)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher())
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Expand `patterns` against every file below `base`.
pub fn expand_inputs(fs: &dyn FileSystem, base: &Path, patterns: &[String]) -> Result<InputSet> {
    let (excludes, includes): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let exclude_patterns: Vec<String> = excludes
        .iter()
        .map(|p| p.trim_start_matches('!').to_string())
        .collect();
    let exclude_set = build_globset(&exclude_patterns)?;

    let candidates = walk_files(fs, base)?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut files = Vec::new();
    let mut unmatched = Vec::new();

    for pattern in includes {
        let matcher = compile_glob(pattern)?;
        let mut any = false;
        for rel in candidates.iter() {
            if !matcher.is_match(rel.as_str()) {
                continue;
            }
            any = true;
            if exclude_set.is_match(rel.as_str()) || !seen.insert(rel.as_str()) {
                continue;
            }
            files.push(PathBuf::from(rel));
        }
        if !any {
            unmatched.push(pattern.clone());
        }
    }

    Ok(InputSet {
        base: base.to_path_buf(),
        files,
        unmatched,
    })
}

/// Every file below `base`, relative, `/`-separated and sorted.
fn walk_files(fs: &dyn FileSystem, base: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    if !fs.is_dir(base) {
        return Ok(files);
    }

    let mut stack = vec![base.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(base) {
                    files.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Map an input (relative to its base) to its output location.
///
/// `ext` replaces everything after the first dot of the file name, so
/// `main.scss` becomes `main.css` for `ext = ".css"`.
pub fn dest_path(output: &Path, rel: &Path, ext: Option<&str>, flatten: bool) -> PathBuf {
    let rel = if flatten {
        rel.file_name().map(PathBuf::from).unwrap_or_else(|| rel.to_path_buf())
    } else {
        rel.to_path_buf()
    };

    let Some(ext) = ext else {
        return output.join(rel);
    };

    let file_name = rel
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    let ext = ext.trim_start_matches('.');
    let renamed = if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    };
    output.join(rel.with_file_name(renamed))
}

/// Whether `src` should be (re)processed into `dest` under `newer:` rules.
pub fn is_newer(fs: &dyn FileSystem, src: &Path, dest: &Path) -> bool {
    match (fs.modified(src), fs.modified(dest)) {
        (_, None) => true,
        (Some(s), Some(d)) => s > d,
        (None, Some(_)) => true,
    }
}

/// File stem used as a registration key for partials and data files.
pub fn key_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("./src/favicon.ico", "i");
        fs.add_file("./src/image/logo.png", "p");
        fs.add_file("./src/image/sprite/technology/a.png", "s");
        fs.add_file("./src/js/index.js", "j");
        fs.add_file("./src/js/nav/menu.js", "m");
        fs.add_file("./src/js/lib/deep/x.js", "x");
        fs
    }

    fn strs(files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|p| p.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn excludes_and_single_level_star() {
        let fs = fixture();
        let set = expand_inputs(
            &fs,
            Path::new("./src"),
            &[
                "*.{ico,png,txt}".to_string(),
                "image/**/*".to_string(),
                "!image/sprite/**".to_string(),
                "js/{,*/}*.*".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(
            strs(&set.files),
            vec![
                "favicon.ico",
                "image/logo.png",
                "js/index.js",
                "js/nav/menu.js",
            ]
        );
        assert!(set.unmatched.is_empty());
    }

    #[test]
    fn keeps_pattern_order_and_reports_unmatched() {
        let fs = fixture();
        let set = expand_inputs(
            &fs,
            Path::new("./src"),
            &[
                "js/nav/menu.js".to_string(),
                "js/missing.js".to_string(),
                "js/**/*.js".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(
            strs(&set.files),
            vec!["js/nav/menu.js", "js/index.js", "js/lib/deep/x.js"]
        );
        assert_eq!(set.unmatched, vec!["js/missing.js".to_string()]);
    }

    #[test]
    fn missing_base_expands_to_nothing() {
        let fs = fixture();
        let set = expand_inputs(&fs, Path::new("./nope"), &["**/*".to_string()]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn dest_path_replaces_extension_from_first_dot() {
        let out = Path::new("dist/css");
        assert_eq!(
            dest_path(out, Path::new("main.scss"), Some(".css"), false),
            PathBuf::from("dist/css/main.css")
        );
        assert_eq!(
            dest_path(out, Path::new("vendor/a.min.js"), Some("js"), false),
            PathBuf::from("dist/css/vendor/a.js")
        );
        assert_eq!(
            dest_path(Path::new("dist/page"), Path::new("page/index.hbs"), Some(".html"), true),
            PathBuf::from("dist/page/index.html")
        );
    }
}
