#![allow(dead_code)]

use sitepipe::config::{ConfigFile, RawConfigFile, StepSpec, TaskConfig, TaskKind, WatchRuleConfig};
use sitepipe::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from an empty `[macro]` table; `build()` fails unless `build`,
/// `optimize` and `qa` were all given with [`ConfigFileBuilder::with_macro`].
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_src(mut self, src: &str) -> Self {
        self.config.paths.src = src.to_string();
        self
    }

    pub fn with_dist(mut self, dist: &str) -> Self {
        self.config.paths.dist = dist.to_string();
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_macro(mut self, key: &str, steps: Vec<StepSpec>) -> Self {
        self.config.macros.insert(key.to_string(), steps);
        self
    }

    /// `build`, `optimize` and `qa` each running `task` alone.
    pub fn with_trivial_macros(self, task: &str) -> Self {
        self.with_macro("build", vec![single(task)])
            .with_macro("optimize", vec![single(task)])
            .with_macro("qa", vec![single(task)])
    }

    pub fn with_watch(mut self, name: &str, files: &[&str], tasks: &[&str], livereload: bool) -> Self {
        self.config.watch.push(WatchRuleConfig {
            name: name.to_string(),
            files: strings(files),
            tasks: strings(tasks),
            livereload,
        });
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                inputs: vec![],
                cwd: None,
                output: None,
                ext: None,
                options: toml::Table::new(),
            },
        }
    }

    /// `command` task running `program` with `args`.
    pub fn command(program: &str, args: &[&str]) -> Self {
        let args = args
            .iter()
            .map(|a| toml::Value::String(a.to_string()))
            .collect::<Vec<_>>();
        Self::new(TaskKind::Command)
            .option("program", program)
            .option("args", toml::Value::Array(args))
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.inputs.push(pattern.to_string());
        self
    }

    pub fn inputs(mut self, patterns: &[&str]) -> Self {
        self.task.inputs.extend(strings(patterns));
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.task.cwd = Some(cwd.to_string());
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.task.output = Some(output.to_string());
        self
    }

    pub fn ext(mut self, ext: &str) -> Self {
        self.task.ext = Some(ext.to_string());
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.task.options.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

pub fn single(name: &str) -> StepSpec {
    StepSpec::Single(name.to_string())
}

pub fn parallel(names: &[&str]) -> StepSpec {
    StepSpec::Parallel(strings(names))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
