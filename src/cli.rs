// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{MacroTask, QaTarget, ServeMode};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, check and serve a static site from a declarative task file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory. The
    /// directory containing it is the project root.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the composed plan, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile templates, styles and assets into the output directory.
    Build,
    /// Build, then minify and optimize the output.
    Optimize,
    /// Run the quality checks (all of them, or one target).
    Qa {
        #[arg(value_enum)]
        target: Option<QaArg>,
        /// Report lint violations as warnings and exit 0.
        #[arg(long)]
        force: bool,
    },
    /// Build and serve locally; `serve dist` serves the optimized build.
    Serve {
        #[arg(value_enum)]
        target: Option<ServeTarget>,
        /// Listen on all interfaces instead of the configured hostname.
        #[arg(long)]
        allow_remote: bool,
    },
}

impl Command {
    /// Macro-task a non-serve command runs.
    pub fn macro_task(&self) -> MacroTask {
        match self {
            Command::Build => MacroTask::Build,
            Command::Optimize => MacroTask::Optimize,
            Command::Qa { target, .. } => MacroTask::Qa(target.map(QaTarget::from).unwrap_or(QaTarget::All)),
            Command::Serve { target, .. } => match target {
                Some(ServeTarget::Dist) => MacroTask::Optimize,
                None => MacroTask::Build,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum QaArg {
    Html,
    Css,
    Js,
    Jscs,
    Jshint,
}

impl From<QaArg> for QaTarget {
    fn from(arg: QaArg) -> Self {
        match arg {
            QaArg::Html => QaTarget::Html,
            QaArg::Css => QaTarget::Css,
            QaArg::Js => QaTarget::Js,
            QaArg::Jscs => QaTarget::Jscs,
            QaArg::Jshint => QaTarget::Jshint,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ServeTarget {
    Dist,
}

impl From<Option<ServeTarget>> for ServeMode {
    fn from(target: Option<ServeTarget>) -> Self {
        match target {
            Some(ServeTarget::Dist) => ServeMode::Optimized,
            None => ServeMode::Edit,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("sitepipe").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn qa_target_and_force() {
        let args = parse_from(&["qa", "jshint", "--force"]);
        assert!(matches!(args.command, Command::Qa { force: true, .. }));
        assert_eq!(args.command.macro_task(), MacroTask::Qa(QaTarget::Jshint));
        assert_eq!(parse_from(&["qa"]).command.macro_task(), MacroTask::Qa(QaTarget::All));
    }

    #[test]
    fn serve_dist_uses_optimize() {
        let args = parse_from(&["serve", "dist", "--allow-remote"]);
        match args.command {
            Command::Serve { target, allow_remote } => {
                assert!(allow_remote);
                assert_eq!(ServeMode::from(target), ServeMode::Optimized);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse_from(&["build", "--dry-run", "--config", "site/Sitepipe.toml"]);
        assert!(args.dry_run);
        assert_eq!(args.config, "site/Sitepipe.toml");
    }

    #[test]
    fn unknown_qa_target_is_rejected() {
        assert!(CliArgs::try_parse_from(["sitepipe", "qa", "php"]).is_err());
    }
}
