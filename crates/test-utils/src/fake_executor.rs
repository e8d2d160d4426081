use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use pipewatch::engine::{PassOutcome, RuntimeEvent, ScheduledPass};
use pipewatch::errors::Result;
use pipewatch::job::PassExecutor;

/// A fake pass executor that:
/// - records which jobs were "run", in order, across all passes
/// - immediately reports `PassCompleted` for each scheduled pass
/// - optionally fails at a configured job name, skipping the rest of the
///   pass like the production runner does
/// - counts teardown invocations.
pub struct FakePassExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    teardowns: Arc<AtomicUsize>,
}

impl FakePassExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the named job fail every pass it is scheduled in.
    pub fn fail_job(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Shared teardown counter, for asserting session cleanup.
    pub fn teardown_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.teardowns)
    }
}

impl PassExecutor for FakePassExecutor {
    fn execute_pass(
        &mut self,
        pass: ScheduledPass,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            let mut outcome = PassOutcome::Success;

            for job in pass.jobs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(job.clone());
                }

                if failing.contains(&job) {
                    outcome = PassOutcome::Failed { job };
                    break;
                }
            }

            tx.send(RuntimeEvent::PassCompleted {
                build_id: pass.build_id,
                outcome,
            })
            .await
            .map_err(anyhow::Error::from)?;

            Ok(())
        })
    }

    fn teardown(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }
}
