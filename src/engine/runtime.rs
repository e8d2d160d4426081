// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::core::{CoreCommand, CoreRuntime};
use crate::engine::{RuntimeEvent, SessionFailure};
use crate::errors::{PipewatchError, Result};
use crate::job::PassExecutor;
use crate::reload::ReloadHub;

/// Drives the orchestrator in response to `RuntimeEvent`s, delegating pass
/// execution to a `PassExecutor` and reload pushes to the `ReloadHub`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, arming the debounce timer, and dispatching commands.
pub struct Runtime<E: PassExecutor> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Used by the debounce timer task to report expiry back into the loop.
    event_tx: mpsc::Sender<RuntimeEvent>,
    executor: E,
    reload: Option<ReloadHub>,
    debounce: Duration,
}

impl<E: PassExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl<E: PassExecutor> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        executor: E,
        reload: Option<ReloadHub>,
        debounce: Duration,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            executor,
            reload,
            debounce,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the pure core.
    /// - Executes commands returned by the core.
    ///
    /// All long-lived processes are torn down on every exit path before this
    /// returns.
    pub async fn run(mut self) -> Result<()> {
        info!("pipewatch runtime started");

        let mut failure: Option<SessionFailure> = None;

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                if let Err(err) = self.execute_command(command, &mut failure).await {
                    error!(error = %err, "command execution failed; shutting down");
                    self.executor.teardown().await;
                    return Err(err);
                }
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.executor.teardown().await;

        match failure {
            None => Ok(()),
            Some(SessionFailure::PassFailed { job }) => Err(PipewatchError::PassFailed { job }),
            Some(SessionFailure::PersistCrashed { job }) => {
                Err(PipewatchError::PersistCrash { job })
            }
        }
    }

    /// Execute a single command from the core.
    async fn execute_command(
        &mut self,
        command: CoreCommand,
        failure: &mut Option<SessionFailure>,
    ) -> Result<()> {
        match command {
            CoreCommand::StartDebounce => {
                let tx = self.event_tx.clone();
                let debounce = self.debounce;
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    let _ = tx.send(RuntimeEvent::DebounceElapsed).await;
                });
            }

            CoreCommand::RunPass(pass) => {
                debug!(build_id = pass.build_id, jobs = ?pass.jobs, "dispatching pass");
                self.executor.execute_pass(pass).await?;
            }

            CoreCommand::PublishReload { build_id } => {
                if let Some(hub) = &self.reload {
                    let hub = hub.clone();
                    // Socket sends and file reads are blocking.
                    tokio::task::spawn_blocking(move || hub.publish(build_id));
                }
            }

            CoreCommand::ExitSuccess => {
                info!("pass succeeded; exiting");
            }

            CoreCommand::ExitFailure(session_failure) => {
                *failure = Some(session_failure);
            }
        }

        Ok(())
    }
}
