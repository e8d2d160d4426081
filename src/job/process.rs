// src/job/process.rs

//! Process plumbing for spawn and persist lifecycles.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{JobName, RuntimeEvent};

/// Exit outcome of a spawned command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failed(i32),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(base_directory: &Path, command: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    // Job output goes straight to the console; tracing uses stderr.
    cmd.current_dir(base_directory);
    cmd
}

/// Run a command to completion and map its exit status to an outcome.
pub async fn run_command(base_directory: &Path, command: &str) -> Result<ExitOutcome> {
    debug!(cmd = %command, "spawning command");

    let mut child = shell_command(base_directory, command)
        .spawn()
        .with_context(|| format!("spawning command '{command}'"))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for command '{command}'"))?;

    let code = status.code().unwrap_or(-1);
    debug!(cmd = %command, exit_code = code, success = status.success(), "command exited");

    if status.success() {
        Ok(ExitOutcome::Success)
    } else {
        Ok(ExitOutcome::Failed(code))
    }
}

/// Handle for one long-lived process.
///
/// The child itself is owned by a monitor task; this handle keeps the
/// cancellation sender (used for teardown) and a liveness flag shared with
/// the monitor.
struct PersistHandle {
    cancel: Option<oneshot::Sender<()>>,
    alive: Arc<AtomicBool>,
}

/// Result of asking the persist set for a job's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistLaunch {
    /// The process was started for the first time this session.
    Started,
    /// An earlier pass already started it; the live handle is reused.
    Reused,
}

/// Owns every persist-lifecycle process of the session.
///
/// A job's process starts at most once per session. A dead handle is never
/// respawned; the exit monitor reports the death to the runtime, which ends
/// the session.
#[derive(Default)]
pub struct PersistSet {
    processes: HashMap<JobName, PersistHandle>,
}

impl PersistSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the long-lived process for `job` is running.
    ///
    /// - No handle yet: spawn the command, confirm it survived startup, and
    ///   attach an exit monitor that reports `PersistExited` to the runtime.
    /// - Live handle: reuse it.
    /// - Dead handle: error; the caller fails the pass and the monitor's
    ///   exit event ends the session.
    pub async fn ensure_started(
        &mut self,
        job: &str,
        command: &str,
        base_directory: &Path,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Result<PersistLaunch> {
        if let Some(handle) = self.processes.get(job) {
            if handle.alive.load(Ordering::SeqCst) {
                debug!(job = %job, "long-lived process already running; reusing handle");
                return Ok(PersistLaunch::Reused);
            }
            anyhow::bail!("long-lived process for job '{job}' is dead");
        }

        info!(job = %job, cmd = %command, "starting long-lived process");

        let mut cmd = shell_command(base_directory, command);
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning long-lived process for job '{job}'"))?;

        // Startup handshake: the scheduler only confirms the process came up,
        // it never waits for the indefinite lifetime.
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("checking startup of long-lived job '{job}'"))?
        {
            anyhow::bail!(
                "long-lived process for job '{job}' exited during startup \
                 (status: {status})"
            );
        }

        let alive = Arc::new(AtomicBool::new(true));
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let monitor_alive = Arc::clone(&alive);
        let monitor_job = job.to_string();
        tokio::spawn(async move {
            tokio::select! {
                status_res = child.wait() => {
                    monitor_alive.store(false, Ordering::SeqCst);
                    warn!(
                        job = %monitor_job,
                        status = ?status_res.ok(),
                        "long-lived process exited on its own"
                    );
                    let _ = runtime_tx
                        .send(RuntimeEvent::PersistExited { job: monitor_job })
                        .await;
                }
                _ = &mut cancel_rx => {
                    monitor_alive.store(false, Ordering::SeqCst);
                    if let Err(err) = child.kill().await {
                        warn!(job = %monitor_job, error = %err, "failed to kill long-lived process");
                    } else {
                        debug!(job = %monitor_job, "long-lived process terminated on teardown");
                    }
                    // No event: the session is exiting anyway.
                }
            }
        });

        self.processes.insert(
            job.to_string(),
            PersistHandle {
                cancel: Some(cancel_tx),
                alive,
            },
        );

        Ok(PersistLaunch::Started)
    }

    /// Whether a live handle exists for `job`.
    pub fn is_alive(&self, job: &str) -> bool {
        self.processes
            .get(job)
            .map(|h| h.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Terminate every long-lived process. Called on every session exit
    /// path (shutdown signal, fatal error, once-mode completion).
    pub fn teardown_all(&mut self) {
        for (job, handle) in self.processes.iter_mut() {
            if let Some(cancel) = handle.cancel.take() {
                if cancel.send(()).is_err() {
                    debug!(job = %job, "long-lived process already gone during teardown");
                }
            }
        }
        self.processes.clear();
    }
}
