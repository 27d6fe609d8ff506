// src/exec/mod.rs

//! Task execution layer.
//!
//! This module runs a single task definition and reports back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production, which tests replace with a
//!   fake implementation.
//! - [`task_runner`] times one task and turns its result into a
//!   `TaskCompleted` event.
//! - [`processors`] holds the in-process processors (clean, copy, concat,
//!   sass, autoprefix, css_minify, template).
//! - [`command`] runs external programs.
//! - [`expand`] expands input globs and maps inputs to output paths.

pub mod backend;
pub mod command;
pub mod expand;
pub mod processors;
pub mod task_runner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::FileSystem;

pub use backend::{ExecutorBackend, RealExecutorBackend};

/// Everything a task needs besides its own definition.
#[derive(Clone)]
pub struct TaskContext {
    /// Project root; relative task paths are resolved against it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// Report lint violations as warnings instead of failures (`qa --force`).
    pub force_lint: bool,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .field("force_lint", &self.force_lint)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            force_lint: false,
        }
    }

    pub fn with_force_lint(mut self, force_lint: bool) -> Self {
        self.force_lint = force_lint;
        self
    }

    /// Join a root-relative path onto the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}
