// src/job/mod.rs

//! Job execution layer.
//!
//! - [`registry`] holds the closed lifecycle union ([`Lifecycle`]) and the
//!   name → descriptor registry, validated against the pipeline at startup.
//! - [`context`] is the capability object handed to one-shot handlers
//!   (working directory, build id, console reset, reporting, commands).
//! - [`process`] wraps `tokio::process::Command` for spawn-and-wait commands
//!   and long-lived persist processes (with exit monitoring and teardown).
//! - [`runner`] provides the `PassExecutor` trait the runtime talks to, and
//!   the production [`runner::JobRunner`] that executes a pass strictly
//!   sequentially in pipeline order. Tests can replace it with a fake
//!   implementation.

pub mod context;
pub mod process;
pub mod registry;
pub mod runner;

pub use context::JobContext;
pub use process::{ExitOutcome, PersistSet};
pub use registry::{HandlerFuture, JobDescriptor, JobRegistry, Lifecycle, OneShotHandler};
pub use runner::{JobRunner, PassExecutor};
