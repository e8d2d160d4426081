// tests/persist_lifecycle.rs

//! Long-lived process handling: start-once, reuse, exit reporting, teardown.

#![cfg(unix)]

mod common;

use std::error::Error;
use std::fs;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use pipewatch::cli::CliArgs;
use pipewatch::engine::RuntimeEvent;
use pipewatch::job::PersistSet;
use pipewatch::job::process::PersistLaunch;

use crate::common::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn process_starts_once_and_is_reused_across_passes() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (tx, _rx) = mpsc::channel::<RuntimeEvent>(8);

    let mut set = PersistSet::new();

    let first = set
        .ensure_started("dev-server", "sleep 30", dir.path(), tx.clone())
        .await?;
    assert_eq!(first, PersistLaunch::Started);
    assert!(set.is_alive("dev-server"));

    let second = set
        .ensure_started("dev-server", "sleep 30", dir.path(), tx.clone())
        .await?;
    assert_eq!(second, PersistLaunch::Reused);

    set.teardown_all();
    Ok(())
}

#[tokio::test]
async fn unexpected_exit_is_reported_and_the_handle_stays_dead() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);

    let mut set = PersistSet::new();

    // Survives the startup handshake, then exits on its own.
    set.ensure_started("flaky", "sleep 0.2", dir.path(), tx.clone())
        .await?;

    let event = with_timeout(rx.recv()).await;
    match event {
        Some(RuntimeEvent::PersistExited { job }) => assert_eq!(job, "flaky"),
        other => panic!("expected PersistExited, got {other:?}"),
    }

    assert!(!set.is_alive("flaky"));

    // A dead handle is never respawned; rescheduling is an error.
    let result = set
        .ensure_started("flaky", "sleep 0.2", dir.path(), tx.clone())
        .await;
    assert!(result.is_err());

    set.teardown_all();
    Ok(())
}

#[tokio::test]
async fn teardown_kills_without_reporting_an_exit() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);

    let mut set = PersistSet::new();
    set.ensure_started("dev-server", "sleep 30", dir.path(), tx.clone())
        .await?;

    set.teardown_all();
    assert!(!set.is_alive("dev-server"));

    // The monitor terminates the process silently on teardown.
    drop(tx);
    let event = with_timeout(rx.recv()).await;
    assert!(event.is_none(), "unexpected event after teardown: {event:?}");

    Ok(())
}

#[tokio::test]
async fn once_mode_session_tears_down_its_persist_jobs() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("Pipewatch.toml");
    fs::write(
        &config_path,
        r#"
pipeline = ["dev-server"]

[job.dev-server]
kind = "persist"
command = "sleep 30"
"#,
    )?;

    let args = CliArgs {
        config: config_path.to_string_lossy().into_owned(),
        once: true,
        log_level: None,
        dry_run: false,
    };

    // The pass confirms startup and succeeds; teardown ends the session
    // without waiting out the sleep.
    let result = timeout(Duration::from_secs(10), pipewatch::run(args)).await?;
    assert!(result.is_ok());

    Ok(())
}
