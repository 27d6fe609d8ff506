// tests/watch_loop.rs

//! Change batches in, rebuilds and reload notifications out.

mod common;
use crate::common::{init_tracing, with_timeout, SITE_CONFIG};

use std::error::Error;
use std::future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::config::{ConfigFile, RawConfigFile};
use sitepipe::engine::{RuntimeEvent, ServeState, WatchLoop};
use sitepipe::server::livereload::ReloadSubscription;
use sitepipe::server::ReloadBroadcaster;
use sitepipe::watch::ChangeBatch;
use sitepipe_test_utils::fake_executor::{executed_names, FakeExecutor};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;
type Executed = Arc<Mutex<Vec<(String, usize)>>>;

fn site() -> ConfigFile {
    let raw: RawConfigFile = toml::from_str(SITE_CONFIG).unwrap();
    ConfigFile::try_from(raw).unwrap().with_root("/p")
}

fn batch(paths: &[&str]) -> ChangeBatch {
    ChangeBatch::new(paths.iter().map(|p| PathBuf::from("/p").join(p)).collect())
}

fn watch_loop(
    failing: &'static [&'static str],
) -> (
    WatchLoop<impl FnMut(mpsc::Sender<RuntimeEvent>) -> FakeExecutor>,
    Executed,
    ReloadSubscription,
) {
    let executed: Executed = Arc::new(Mutex::new(Vec::new()));
    let reload = ReloadBroadcaster::new();
    let subscription = reload.subscribe();
    let recorder = Arc::clone(&executed);
    let watch = WatchLoop::new(&site(), reload, move |tx| {
        FakeExecutor::new(tx, Arc::clone(&recorder)).failing(failing)
    })
    .unwrap();
    (watch, executed, subscription)
}

/// Number of reloads delivered within a short window.
async fn reloads(subscription: &mut ReloadSubscription) -> usize {
    let mut count = 0;
    while let Ok(Some(())) =
        tokio::time::timeout(Duration::from_millis(50), subscription.next()).await
    {
        count += 1;
    }
    count
}

#[tokio::test]
async fn sass_edit_reruns_only_the_style_rule() -> TestResult {
    init_tracing();
    let (mut watch, executed, mut subscription) = watch_loop(&[]);

    let outcome = with_timeout(watch.handle_batch(&batch(&["src/css/_vars.scss"]))).await;
    assert_eq!(outcome.rules, vec!["sass"]);
    assert!(outcome.failed.is_empty());
    assert!(outcome.reloaded);
    assert_eq!(executed_names(&executed), vec!["sass:dist", "autoprefixer"]);
    assert_eq!(reloads(&mut subscription).await, 1);
    Ok(())
}

#[tokio::test]
async fn one_reload_per_batch_however_many_rules_match() -> TestResult {
    init_tracing();
    let (mut watch, executed, mut subscription) = watch_loop(&[]);

    let outcome = with_timeout(watch.handle_batch(&batch(&[
        "src/js/a.js",
        "src/pages/index.hbs",
        "src/css/main.scss",
        "src/css/_vars.scss",
    ])))
    .await;

    // declaration order, each rule once
    assert_eq!(outcome.rules, vec!["sass", "assemble", "livereload"]);
    assert_eq!(
        executed_names(&executed),
        vec!["sass:dist", "autoprefixer", "assemble"]
    );
    assert_eq!(reloads(&mut subscription).await, 1);
    Ok(())
}

#[tokio::test]
async fn changes_in_the_output_dir_are_ignored() -> TestResult {
    init_tracing();
    let (mut watch, executed, mut subscription) = watch_loop(&[]);

    let outcome = with_timeout(watch.handle_batch(&batch(&["dist/css/main.css", "README.md"]))).await;
    assert!(outcome.rules.is_empty());
    assert!(!outcome.reloaded);
    assert!(executed.lock().unwrap().is_empty());
    assert_eq!(reloads(&mut subscription).await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_rebuild_does_not_reload_and_loop_continues() -> TestResult {
    init_tracing();
    let (mut watch, executed, mut subscription) = watch_loop(&["sass:dist"]);

    let outcome = with_timeout(watch.handle_batch(&batch(&["src/css/main.scss"]))).await;
    assert_eq!(outcome.failed, vec!["sass"]);
    assert!(!outcome.reloaded);
    assert_eq!(executed_names(&executed), vec!["sass:dist"]);
    assert_eq!(reloads(&mut subscription).await, 0);

    let outcome = with_timeout(watch.handle_batch(&batch(&["src/data/site.json"]))).await;
    assert_eq!(outcome.rules, vec!["assemble"]);
    assert!(outcome.failed.is_empty());
    assert_eq!(reloads(&mut subscription).await, 1);
    Ok(())
}

#[tokio::test]
async fn run_consumes_batches_until_the_watcher_stops() -> TestResult {
    init_tracing();
    let (mut watch, executed, mut subscription) = watch_loop(&[]);
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(batch(&["src/pages/about.hbs"]))?;
    tx.send(batch(&["src/image/logo.png"]))?;
    drop(tx);

    let mut state = ServeState::Watching;
    with_timeout(watch.run(rx, &mut state, future::pending())).await?;

    assert_eq!(state, ServeState::Watching);
    assert_eq!(executed_names(&executed), vec!["assemble"]);
    assert_eq!(reloads(&mut subscription).await, 2);
    Ok(())
}
