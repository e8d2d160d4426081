// src/job/runner.rs

//! Pass execution.
//!
//! The runtime talks to a [`PassExecutor`] instead of running jobs itself.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production [`JobRunner`] here.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::engine::{PassOutcome, RuntimeEvent, ScheduledPass};
use crate::errors::Result;
use crate::job::context::JobContext;
use crate::job::process::{self, ExitOutcome, PersistSet};
use crate::job::registry::{JobRegistry, Lifecycle};

/// Trait abstracting how scheduled passes are executed.
///
/// Production code uses [`JobRunner`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait PassExecutor: Send {
    /// Start executing the pass. Must return promptly; the pass outcome is
    /// reported asynchronously via `RuntimeEvent::PassCompleted`.
    fn execute_pass(
        &mut self,
        pass: ScheduledPass,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Terminate all long-lived processes. Invoked on every session exit
    /// path.
    fn teardown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production pass executor.
///
/// Jobs within one pass run strictly sequentially in pipeline order, so each
/// job's externally observable effects stay ordered relative to jobs declared
/// earlier. Persist handles live for the whole session.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    base_directory: PathBuf,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    persist: Arc<Mutex<PersistSet>>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        base_directory: PathBuf,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            registry,
            base_directory,
            runtime_tx,
            persist: Arc::new(Mutex::new(PersistSet::new())),
        }
    }
}

impl PassExecutor for JobRunner {
    fn execute_pass(
        &mut self,
        pass: ScheduledPass,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let registry = Arc::clone(&self.registry);
        let base_directory = self.base_directory.clone();
        let runtime_tx = self.runtime_tx.clone();
        let persist = Arc::clone(&self.persist);

        Box::pin(async move {
            tokio::spawn(async move {
                run_pass(registry, base_directory, persist, pass, runtime_tx).await;
            });
            Ok(())
        })
    }

    fn teardown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let persist = Arc::clone(&self.persist);
        Box::pin(async move {
            persist.lock().await.teardown_all();
        })
    }
}

/// Execute every job of the pass in order, stopping at the first failure,
/// then report the aggregate outcome to the runtime.
async fn run_pass(
    registry: Arc<JobRegistry>,
    base_directory: PathBuf,
    persist: Arc<Mutex<PersistSet>>,
    pass: ScheduledPass,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(build_id = pass.build_id, jobs = ?pass.jobs, "pass started");

    let mut outcome = PassOutcome::Success;

    for job in pass.jobs.iter() {
        let succeeded = run_job(
            &registry,
            &base_directory,
            &persist,
            job,
            pass.build_id,
            &runtime_tx,
        )
        .await;

        if !succeeded {
            outcome = PassOutcome::Failed { job: job.clone() };
            break;
        }
    }

    info!(build_id = pass.build_id, ?outcome, "pass finished");

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::PassCompleted {
            build_id: pass.build_id,
            outcome,
        })
        .await
    {
        error!(build_id = pass.build_id, error = %err, "failed to report pass completion");
    }
}

/// Run a single job under its lifecycle contract. Returns whether the job
/// succeeded.
async fn run_job(
    registry: &JobRegistry,
    base_directory: &PathBuf,
    persist: &Mutex<PersistSet>,
    job: &str,
    build_id: u64,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let Some(descriptor) = registry.get(job) else {
        // Startup validation makes this unreachable; fail the pass rather
        // than skip silently.
        error!(job = %job, "scheduled job has no descriptor");
        return false;
    };

    match &descriptor.lifecycle {
        Lifecycle::OneShot(handler) => {
            debug!(job = %job, build_id, "running one-shot handler");
            let ctx = JobContext::new(base_directory.clone(), build_id);
            match handler.run(ctx).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!(job = %job, build_id, "one-shot handler reported failure");
                    false
                }
                Err(err) => {
                    warn!(job = %job, build_id, error = %err, "one-shot handler errored");
                    false
                }
            }
        }

        Lifecycle::Spawn { command } => {
            match process::run_command(base_directory, command).await {
                Ok(ExitOutcome::Success) => true,
                Ok(ExitOutcome::Failed(code)) => {
                    warn!(job = %job, build_id, exit_code = code, "spawned command failed");
                    false
                }
                Err(err) => {
                    warn!(job = %job, build_id, error = %err, "failed to run spawned command");
                    false
                }
            }
        }

        Lifecycle::Persist { command } => {
            let mut set = persist.lock().await;
            match set
                .ensure_started(job, command, base_directory, runtime_tx.clone())
                .await
            {
                Ok(launch) => {
                    debug!(job = %job, build_id, ?launch, "long-lived process available");
                    true
                }
                Err(err) => {
                    // A dead handle is fatal to the session; the exit
                    // monitor's event ends it. Here we only fail the pass.
                    error!(job = %job, build_id, error = %err, "long-lived process unavailable");
                    false
                }
            }
        }
    }
}
