// tests/runtime_fake_executor.rs

mod common;
use crate::common::builders::{parallel, single, ConfigFileBuilder, TaskConfigBuilder};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::future;
use std::sync::{Arc, Mutex};

use sitepipe::config::{ConfigFile, TaskKind};
use sitepipe::engine::{execute_plan, CoreRuntime, Runtime};
use sitepipe::errors::PipelineError;
use sitepipe::plan::{ExecutionPlan, PlannedTask, Stage};
use sitepipe::types::MacroTask;
use sitepipe_test_utils::fake_executor::{executed_names, FakeExecutor};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

/// clean -> [assemble, sass] -> autoprefixer
fn staged_config() -> ConfigFile {
    let mut builder = ConfigFileBuilder::new();
    for name in ["clean", "assemble", "sass", "autoprefixer", "uglify"] {
        builder = builder.with_task(
            name,
            TaskConfigBuilder::new(TaskKind::Clean).output("{dist}").build(),
        );
    }
    builder
        .with_macro(
            "build",
            vec![single("clean"), parallel(&["assemble", "sass"]), single("autoprefixer")],
        )
        .with_macro("optimize", vec![single("build"), single("uglify")])
        .with_macro("qa", vec![single("clean")])
        .build()
}

#[tokio::test]
async fn stages_run_in_order() -> TestResult {
    init_tracing();
    let cfg = staged_config();
    let plan = cfg.composer().compose(MacroTask::Optimize)?;
    let executed = Arc::new(Mutex::new(Vec::new()));

    let summary = with_timeout(execute_plan(
        &plan,
        cfg.registry(),
        |tx| FakeExecutor::new(tx, Arc::clone(&executed)),
        future::pending(),
    ))
    .await?;

    assert_eq!(
        *executed.lock().unwrap(),
        vec![
            ("clean".to_string(), 0),
            ("assemble".to_string(), 1),
            ("sass".to_string(), 1),
            ("autoprefixer".to_string(), 2),
            ("uglify".to_string(), 3),
        ]
    );
    assert_eq!(
        summary.task_names(),
        vec!["clean", "assemble", "sass", "autoprefixer", "uglify"]
    );
    assert!(summary.reports.iter().all(|r| r.success));
    Ok(())
}

#[tokio::test]
async fn failure_in_parallel_stage_stops_the_plan() -> TestResult {
    init_tracing();
    let cfg = staged_config();
    let plan = cfg.composer().compose(MacroTask::Build)?;
    let executed = Arc::new(Mutex::new(Vec::new()));

    let err = with_timeout(execute_plan(
        &plan,
        cfg.registry(),
        |tx| FakeExecutor::new(tx, Arc::clone(&executed)).failing(&["assemble"]),
        future::pending(),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.task_name(), Some("assemble"));
    assert!(err.to_string().contains("failed on purpose"));
    // the sibling still ran; the following stage did not
    assert_eq!(executed_names(&executed), vec!["clean", "assemble", "sass"]);
    Ok(())
}

#[tokio::test]
async fn first_failure_wins_when_siblings_both_fail() -> TestResult {
    init_tracing();
    let cfg = staged_config();
    let plan = cfg.composer().compose(MacroTask::Build)?;
    let executed = Arc::new(Mutex::new(Vec::new()));

    let err = with_timeout(execute_plan(
        &plan,
        cfg.registry(),
        |tx| FakeExecutor::new(tx, Arc::clone(&executed)).failing(&["assemble", "sass"]),
        future::pending(),
    ))
    .await
    .unwrap_err();

    assert_eq!(err.task_name(), Some("assemble"));
    Ok(())
}

#[tokio::test]
async fn unknown_task_fails_before_anything_runs() {
    init_tracing();
    let cfg = staged_config();
    let plan = ExecutionPlan::new(vec![
        Stage::single(PlannedTask::new("clean")),
        Stage::single(PlannedTask::new("ghost")),
    ]);
    let executed = Arc::new(Mutex::new(Vec::new()));

    let err = with_timeout(execute_plan(
        &plan,
        cfg.registry(),
        |tx| FakeExecutor::new(tx, Arc::clone(&executed)),
        future::pending(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::TaskNotFound(name) if name == "ghost"));
    assert!(executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_plan_finishes_immediately() -> TestResult {
    init_tracing();
    let cfg = staged_config();
    let core = CoreRuntime::new(&ExecutionPlan::default(), cfg.registry())?;
    let (tx, rx) = mpsc::channel(8);
    let executed = Arc::new(Mutex::new(Vec::new()));

    let summary = with_timeout(Runtime::new(core, rx, FakeExecutor::new(tx, Arc::clone(&executed))).run())
        .await?;
    assert!(summary.reports.is_empty());
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_after_last_stage_still_succeeds() -> TestResult {
    init_tracing();
    let cfg = staged_config();
    let plan = ExecutionPlan::new(vec![Stage::single(PlannedTask::new("clean"))]);
    let executed = Arc::new(Mutex::new(Vec::new()));

    // Shutdown is already requested, but the only stage was dispatched by then.
    let summary = with_timeout(execute_plan(
        &plan,
        cfg.registry(),
        |tx| FakeExecutor::new(tx, Arc::clone(&executed)),
        future::ready(()),
    ))
    .await?;
    assert_eq!(summary.task_names(), vec!["clean"]);
    Ok(())
}
