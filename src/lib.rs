// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod registry;
pub mod server;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::execute_plan;
use crate::engine::serve::serve;
use crate::exec::{RealExecutorBackend, TaskContext};
use crate::fs::RealFileSystem;
use crate::types::ServeMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - plan composition for the selected macro-task
/// - runtime + executor
/// - (for `serve`) dev server and file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = Arc::new(load_and_validate(&config_path)?);
    debug!(root = %cfg.root().display(), tasks = cfg.registry().len(), "config loaded");

    let macro_task = args.command.macro_task();
    let plan = cfg.composer().compose(macro_task)?;

    if args.dry_run {
        print_dry_run(&cfg, &args.command);
        return Ok(());
    }

    let force_lint = matches!(args.command, Command::Qa { force: true, .. });
    let ctx = Arc::new(
        TaskContext::new(cfg.root(), Arc::new(RealFileSystem)).with_force_lint(force_lint),
    );

    match args.command {
        Command::Serve {
            target,
            allow_remote,
        } => {
            serve(&cfg, ctx, ServeMode::from(target), allow_remote, ctrl_c()).await?;
        }
        _ => {
            info!(macro_task = %macro_task, stages = plan.len(), "running");
            let summary = execute_plan(
                &plan,
                cfg.registry(),
                |tx| RealExecutorBackend::new(tx, Arc::clone(&ctx)),
                ctrl_c(),
            )
            .await?;
            println!("{macro_task} finished\n{summary}");
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Dry-run output: paths, registered tasks, and the composed plan.
fn print_dry_run(cfg: &ConfigFile, command: &Command) {
    let macro_task = command.macro_task();
    println!("sitepipe dry-run");
    println!("  root = {}", cfg.root().display());
    println!(
        "  paths: src = {}, dist = {}, tpl = {}, vendor = {}",
        cfg.paths().src,
        cfg.paths().dist,
        cfg.paths().tpl,
        cfg.paths().vendor
    );
    println!();

    println!("tasks ({}):", cfg.registry().len());
    for def in cfg.registry().definitions() {
        println!("  - {} [{}]", def.name, def.action.label());
        if !def.inputs.is_empty() {
            println!("      inputs: {:?}", def.inputs);
        }
        if !def.cwd.as_os_str().is_empty() {
            println!("      cwd: {}", def.cwd.display());
        }
        if let Some(output) = &def.output {
            println!("      output: {}", output.display());
        }
    }
    println!();

    match cfg.composer().compose(macro_task) {
        Ok(plan) => {
            println!("plan for `{macro_task}` ({} stages):", plan.len());
            print!("{plan}");
        }
        Err(e) => println!("plan for `{macro_task}`: {e}"),
    }

    if let Command::Serve { .. } = command {
        println!();
        println!("watch rules ({}):", cfg.watch_rules().len());
        for rule in cfg.watch_rules() {
            println!(
                "  - {}: {:?} -> {:?}{}",
                rule.name,
                rule.files,
                rule.tasks,
                if rule.livereload { " (livereload)" } else { "" }
            );
        }
    }

    debug!("dry-run complete (no execution)");
}
