// src/engine/mod.rs

//! Orchestration engine for pipewatch.
//!
//! This module ties together:
//! - the change classifier (rules → scheduled job names)
//! - the pipeline scheduler (scheduled set → ordered execution list)
//! - the main runtime event loop that reacts to:
//!   - filesystem change events
//!   - debounce expiry
//!   - pass completion
//!   - persist-process exits
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical job name type used throughout the engine.
pub type JobName = String;

/// Aggregate outcome of one pass for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Success,
    /// The named job failed; jobs after it in the execution list did not run.
    Failed { job: JobName },
}

impl PassOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PassOutcome::Success)
    }
}

/// One scheduled pass: a monotonic build identifier plus the deduplicated
/// execution list in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPass {
    pub build_id: u64,
    pub jobs: Vec<JobName>,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, run the full pipeline for a single pass and exit with the
    /// aggregate outcome (used for `--once`).
    pub once: bool,
}

/// Events flowing into the runtime from watchers, executors, timers, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watched path changed (relative to the project root).
    PathChanged { path: String },
    /// The debounce window for the accumulated change batch elapsed.
    DebounceElapsed,
    /// The full pipeline should be scheduled unconditionally (once mode).
    FullPassRequested,
    /// A pass finished with a concrete outcome.
    PassCompleted { build_id: u64, outcome: PassOutcome },
    /// A persist-lifecycle process exited on its own.
    PersistExited { job: JobName },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Why a session ended unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// A one-shot or spawn job failed the single once-mode pass.
    PassFailed { job: JobName },
    /// A long-lived process died; the session ends rather than restarting it.
    PersistCrashed { job: JobName },
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreRuntime, CoreStep};
pub use runtime::Runtime;
