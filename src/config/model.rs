// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::plan::Composer;
use crate::registry::TaskRegistry;
use crate::types::MacroTask;

/// Top-level configuration as read from `Sitepipe.toml`, before validation.
///
/// ```toml
/// [paths]
/// src = "src"
/// dist = "dist"
///
/// [task."sass:dist"]
/// kind = "sass"
/// cwd = "{src}/css"
/// inputs = ["*.{scss,sass}"]
/// output = "{dist}/css"
///
/// [macro]
/// build = ["clean", ["assemble", "sass:dist"], "autoprefixer"]
///
/// [[watch]]
/// name = "sass"
/// files = ["{src}/css/**/*.scss"]
/// tasks = ["sass:dist", "autoprefixer"]
/// livereload = true
/// ```
///
/// All sections except `[task.*]` and `[macro]` are optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`, keyed by task name (e.g. `"copy:dist"`).
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Macro-task plans keyed by `build`, `optimize`, `qa`, `qa:<target>`.
    #[serde(default, rename = "macro")]
    pub macros: BTreeMap<String, Vec<StepSpec>>,

    /// `[[watch]]` rules in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,
}

/// `[paths]` section: the directory conventions every other string can refer
/// to as `{src}`, `{dist}`, `{tpl}` and `{vendor}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_dist")]
    pub dist: String,
    #[serde(default = "default_tpl")]
    pub tpl: String,
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

fn default_tpl() -> String {
    "{src}/template".to_string()
}

fn default_vendor() -> String {
    "bower_components".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            tpl: default_tpl(),
            vendor: default_vendor(),
        }
    }
}

/// `[config]` section: global runtime behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Debounce window for coalescing file-system events in watch mode.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[server]` section shared by both serve modes.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL prefix under which `{vendor}` is exposed in edit mode.
    #[serde(default = "default_vendor_mount")]
    pub vendor_mount: String,
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_vendor_mount() -> String {
    "/bower_components".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            vendor_mount: default_vendor_mount(),
        }
    }
}

/// Processor a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Clean,
    Copy,
    Concat,
    Sass,
    Autoprefix,
    CssMinify,
    Template,
    Command,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKind,

    /// Input globs relative to `cwd`; a leading `!` excludes.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Base directory for `inputs`; defaults to the project root.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Output file or directory, depending on the kind.
    #[serde(default)]
    pub output: Option<String>,

    /// Replacement extension for per-file outputs (e.g. `".css"`).
    #[serde(default)]
    pub ext: Option<String>,

    /// Kind-specific option bag, parsed into typed options at startup.
    #[serde(default)]
    pub options: toml::Table,
}

/// One entry of a macro plan: a single name, or a group run in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Single(String),
    Parallel(Vec<String>),
}

impl StepSpec {
    pub fn names(&self) -> Vec<&str> {
        match self {
            StepSpec::Single(name) => vec![name.as_str()],
            StepSpec::Parallel(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `[[watch]]` rule.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    pub name: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub livereload: bool,
}

/// Validated, immutable configuration.
///
/// Construct through [`ConfigFile::try_from`] (see `validate.rs`) or
/// [`crate::config::load_and_validate`]; every component receives it
/// explicitly, there is no global configuration lookup.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    paths: PathsSection,
    config: ConfigSection,
    server: ServerSection,
    registry: TaskRegistry,
    macros: BTreeMap<MacroTask, Vec<StepSpec>>,
    watch: Vec<WatchRuleConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        config: ConfigSection,
        server: ServerSection,
        registry: TaskRegistry,
        macros: BTreeMap<MacroTask, Vec<StepSpec>>,
        watch: Vec<WatchRuleConfig>,
    ) -> Self {
        Self {
            root: PathBuf::from("."),
            paths,
            config,
            server,
            registry,
            macros,
            watch,
        }
    }

    /// Set the project root all relative paths are resolved against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path variables after expansion (`tpl` no longer contains `{src}`).
    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn macros(&self) -> &BTreeMap<MacroTask, Vec<StepSpec>> {
        &self.macros
    }

    pub fn watch_rules(&self) -> &[WatchRuleConfig] {
        &self.watch
    }

    pub fn composer(&self) -> Composer<'_> {
        Composer::new(&self.registry, &self.macros)
    }

    /// Absolute (root-joined) output directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join(&self.paths.dist)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.paths.src)
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.root.join(&self.paths.vendor)
    }
}
