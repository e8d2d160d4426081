// src/job/registry.rs

//! Job descriptors and the startup-validated registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{ConfigFile, JobKind};
use crate::engine::JobName;
use crate::errors::{PipewatchError, Result};
use crate::job::context::JobContext;
use crate::pipeline::PipelineDefinition;

/// Future returned by a one-shot handler.
///
/// `Ok(true)` means success; `Ok(false)` and `Err(_)` both fail the pass.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send>>;

/// In-process handler for a one-shot job.
///
/// Runs to completion within the pass, carries no state between passes, and
/// re-executes fully every time it is scheduled.
pub trait OneShotHandler: Send + Sync {
    fn run(&self, ctx: JobContext) -> HandlerFuture;
}

impl<F> OneShotHandler for F
where
    F: Fn(JobContext) -> HandlerFuture + Send + Sync,
{
    fn run(&self, ctx: JobContext) -> HandlerFuture {
        (self)(ctx)
    }
}

/// A job's execution contract.
///
/// Dispatch over this union is exhaustive; each kind carries a distinct
/// contract (see the runner).
#[derive(Clone)]
pub enum Lifecycle {
    /// Runs in-process to completion within the pass.
    OneShot(Arc<dyn OneShotHandler>),
    /// Launches an external command and awaits its exit.
    Spawn { command: String },
    /// Launches a long-lived external command once per session; later
    /// scheduling reuses the live handle.
    Persist { command: String },
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::OneShot(_) => f.write_str("OneShot(..)"),
            Lifecycle::Spawn { command } => {
                f.debug_struct("Spawn").field("command", command).finish()
            }
            Lifecycle::Persist { command } => {
                f.debug_struct("Persist").field("command", command).finish()
            }
        }
    }
}

/// A registered job: name plus lifecycle.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub name: JobName,
    pub lifecycle: Lifecycle,
}

/// Name → descriptor registry.
///
/// Command-backed jobs come from `[job.<name>]` config sections; one-shot
/// handlers are registered programmatically. [`JobRegistry::validate_against`]
/// must pass before a session starts.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<JobName, JobDescriptor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the command-backed jobs in a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut registry = Self::new();

        for (name, job) in cfg.jobs().iter() {
            let lifecycle = match job.kind {
                JobKind::Spawn => Lifecycle::Spawn {
                    command: job.command.clone(),
                },
                JobKind::Persist => Lifecycle::Persist {
                    command: job.command.clone(),
                },
            };
            registry.jobs.insert(
                name.clone(),
                JobDescriptor {
                    name: name.clone(),
                    lifecycle,
                },
            );
        }

        registry
    }

    /// Register a descriptor. Re-registering a name is a startup error.
    pub fn register(&mut self, descriptor: JobDescriptor) -> Result<()> {
        let name = descriptor.name.clone();
        if self.jobs.insert(name.clone(), descriptor).is_some() {
            return Err(PipewatchError::SchedulingError(format!(
                "job '{name}' registered twice"
            )));
        }
        Ok(())
    }

    /// Convenience for registering an in-process one-shot handler.
    pub fn register_one_shot<H>(&mut self, name: impl Into<JobName>, handler: H) -> Result<()>
    where
        H: OneShotHandler + 'static,
    {
        self.register(JobDescriptor {
            name: name.into(),
            lifecycle: Lifecycle::OneShot(Arc::new(handler)),
        })
    }

    pub fn get(&self, name: &str) -> Option<&JobDescriptor> {
        self.jobs.get(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Every pipeline job must have a descriptor; fatal otherwise, before
    /// any watching begins.
    pub fn validate_against(&self, pipeline: &PipelineDefinition) -> Result<()> {
        for name in pipeline.job_names() {
            if !self.jobs.contains_key(name) {
                return Err(PipewatchError::SchedulingError(format!(
                    "pipeline job '{name}' has no registered descriptor \
                     (missing [job.{name}] section or one-shot registration)"
                )));
            }
        }
        Ok(())
    }
}
