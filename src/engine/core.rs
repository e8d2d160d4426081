// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - arming the debounce timer
//! - handing scheduled passes to the executor
//! - publishing live-reload updates
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes. Exactly one pass is in flight at a
//! time; change events arriving during a pass accumulate into the next
//! pass's scheduled set and never preempt the in-flight pass.

use tracing::{debug, warn};

use crate::classify::RuleSet;
use crate::engine::{
    JobName, PassOutcome, RuntimeEvent, RuntimeOptions, ScheduledPass, SessionFailure,
};
use crate::pipeline::{PipelineDefinition, ScheduledSet};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Arm the debounce timer; it fires back `RuntimeEvent::DebounceElapsed`.
    StartDebounce,
    /// Hand this pass to the executor.
    RunPass(ScheduledPass),
    /// A watch-mode pass succeeded; push rebuilt documents to subscribers.
    PublishReload { build_id: u64 },
    /// The once-mode pass succeeded; exit zero.
    ExitSuccess,
    /// The session ends unsuccessfully (once-mode failure or persist crash).
    ExitFailure(SessionFailure),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stopping(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Pure core runtime state.
///
/// This owns:
/// - the compiled rule set (change classifier)
/// - the pipeline definition (canonical run order)
/// - the scheduled set accumulating for the next pass
/// - runtime options (e.g. once mode)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    rules: RuleSet,
    pipeline: PipelineDefinition,
    pending: ScheduledSet,
    /// Build ID of the in-flight pass, or `None` when idle.
    in_flight: Option<u64>,
    /// Whether a debounce timer is currently armed.
    debounce_armed: bool,
    /// Monotonically increasing build identifier.
    build_counter: u64,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(rules: RuleSet, pipeline: PipelineDefinition, options: RuntimeOptions) -> Self {
        Self {
            rules,
            pipeline,
            pending: ScheduledSet::new(),
            in_flight: None,
            debounce_armed: false,
            build_counter: 0,
            options,
        }
    }

    /// Expose whether a pass is currently in flight (for tests).
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    /// Expose pending-set emptiness (for tests).
    pub fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::PathChanged { path } => self.handle_path_changed(&path),
            RuntimeEvent::DebounceElapsed => self.handle_debounce_elapsed(),
            RuntimeEvent::FullPassRequested => self.handle_full_pass_requested(),
            RuntimeEvent::PassCompleted { build_id, outcome } => {
                self.handle_pass_completed(build_id, outcome)
            }
            RuntimeEvent::PersistExited { job } => self.handle_persist_exited(job),
            RuntimeEvent::ShutdownRequested => {
                debug!("shutdown requested; stopping core");
                CoreStep::stopping(Vec::new())
            }
        }
    }

    fn handle_path_changed(&mut self, path: &str) -> CoreStep {
        let scheduled = self.rules.classify(path);
        if scheduled.is_empty() {
            // Not an error: the path simply matched no rule.
            return CoreStep::running(Vec::new());
        }

        self.pending.extend(scheduled);

        // Open a debounce window only when idle; changes during a pass wait
        // for its completion and get their window afterwards.
        if self.in_flight.is_none() && !self.debounce_armed {
            self.debounce_armed = true;
            return CoreStep::running(vec![CoreCommand::StartDebounce]);
        }

        CoreStep::running(Vec::new())
    }

    fn handle_debounce_elapsed(&mut self) -> CoreStep {
        self.debounce_armed = false;

        if self.in_flight.is_some() {
            // A pass started in the meantime; pending jobs wait for it.
            return CoreStep::running(Vec::new());
        }

        CoreStep::running(self.start_pass_if_pending())
    }

    fn handle_full_pass_requested(&mut self) -> CoreStep {
        self.pending = self.pipeline.full_set();

        if self.in_flight.is_some() {
            return CoreStep::running(Vec::new());
        }

        CoreStep::running(self.start_pass_if_pending())
    }

    fn handle_pass_completed(&mut self, build_id: u64, outcome: PassOutcome) -> CoreStep {
        if self.in_flight != Some(build_id) {
            warn!(
                build_id,
                in_flight = ?self.in_flight,
                "completion for a pass that is not in flight; ignoring"
            );
            return CoreStep::running(Vec::new());
        }

        self.in_flight = None;

        if self.options.once {
            return match outcome {
                PassOutcome::Success => CoreStep::stopping(vec![CoreCommand::ExitSuccess]),
                PassOutcome::Failed { job } => CoreStep::stopping(vec![CoreCommand::ExitFailure(
                    SessionFailure::PassFailed { job },
                )]),
            };
        }

        let mut commands = Vec::new();

        match outcome {
            PassOutcome::Success => {
                commands.push(CoreCommand::PublishReload { build_id });
            }
            PassOutcome::Failed { job } => {
                // Expected during iterative editing; keep listening.
                warn!(build_id, job = %job, "pass failed; waiting for the next change batch");
            }
        }

        // Changes that arrived while the pass was in flight get their own
        // debounce window now.
        if !self.pending.is_empty() && !self.debounce_armed {
            self.debounce_armed = true;
            commands.push(CoreCommand::StartDebounce);
        }

        CoreStep::running(commands)
    }

    fn handle_persist_exited(&mut self, job: JobName) -> CoreStep {
        warn!(job = %job, "long-lived process exited; ending session");
        CoreStep::stopping(vec![CoreCommand::ExitFailure(
            SessionFailure::PersistCrashed { job },
        )])
    }

    /// Start a pass from the pending set, if it is non-empty.
    fn start_pass_if_pending(&mut self) -> Vec<CoreCommand> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let scheduled = self.pending.take();
        let jobs = self.pipeline.execution_list(&scheduled);

        if jobs.is_empty() {
            return Vec::new();
        }

        self.build_counter += 1;
        let build_id = self.build_counter;
        self.in_flight = Some(build_id);

        debug!(build_id, ?jobs, "starting pass");

        vec![CoreCommand::RunPass(ScheduledPass { build_id, jobs })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CompiledRule, RuleSet};

    fn core(once: bool) -> CoreRuntime {
        let rules = RuleSet::new(vec![
            CompiledRule::new("src/**/*.rs", vec!["cargo-build".into()], true).unwrap(),
            CompiledRule::new("resources/**/*.css", vec!["esbuild".into()], true).unwrap(),
        ]);
        let pipeline = PipelineDefinition::new(vec![
            "cargo-build".into(),
            "tcm".into(),
            "esbuild".into(),
        ]);
        CoreRuntime::new(rules, pipeline, RuntimeOptions { once })
    }

    fn changed(core: &mut CoreRuntime, path: &str) -> CoreStep {
        core.step(RuntimeEvent::PathChanged {
            path: path.to_string(),
        })
    }

    fn run_pass_of(step: &CoreStep) -> &ScheduledPass {
        step.commands
            .iter()
            .find_map(|c| match c {
                CoreCommand::RunPass(pass) => Some(pass),
                _ => None,
            })
            .expect("expected a RunPass command")
    }

    #[test]
    fn first_change_arms_debounce_once() {
        let mut core = core(false);

        let step = changed(&mut core, "src/main.rs");
        assert_eq!(step.commands, vec![CoreCommand::StartDebounce]);

        // Further changes inside the window do not re-arm the timer.
        let step = changed(&mut core, "src/lib.rs");
        assert!(step.commands.is_empty());
    }

    #[test]
    fn unmatched_path_has_no_effect() {
        let mut core = core(false);
        let step = changed(&mut core, "README.md");
        assert!(step.commands.is_empty());
        assert!(core.pending_is_empty());
    }

    #[test]
    fn debounce_expiry_runs_pass_in_pipeline_order() {
        let mut core = core(false);

        // esbuild's change arrives before cargo-build's.
        changed(&mut core, "resources/x.css");
        changed(&mut core, "src/a.rs");

        let step = core.step(RuntimeEvent::DebounceElapsed);
        let pass = run_pass_of(&step);
        assert_eq!(pass.jobs, vec!["cargo-build", "esbuild"]);
        assert!(!core.is_idle());
    }

    #[test]
    fn changes_during_pass_queue_into_next_pass() {
        let mut core = core(false);

        changed(&mut core, "src/a.rs");
        let step = core.step(RuntimeEvent::DebounceElapsed);
        let build_id = run_pass_of(&step).build_id;

        // A change while the pass is in flight: accumulated, no new debounce.
        let step = changed(&mut core, "resources/x.css");
        assert!(step.commands.is_empty());

        // Completion publishes and opens the next window.
        let step = core.step(RuntimeEvent::PassCompleted {
            build_id,
            outcome: PassOutcome::Success,
        });
        assert_eq!(
            step.commands,
            vec![
                CoreCommand::PublishReload { build_id },
                CoreCommand::StartDebounce
            ]
        );

        let step = core.step(RuntimeEvent::DebounceElapsed);
        assert_eq!(run_pass_of(&step).jobs, vec!["esbuild"]);
    }

    #[test]
    fn watch_mode_survives_a_failing_pass() {
        let mut core = core(false);

        changed(&mut core, "src/a.rs");
        let step = core.step(RuntimeEvent::DebounceElapsed);
        let build_id = run_pass_of(&step).build_id;

        let step = core.step(RuntimeEvent::PassCompleted {
            build_id,
            outcome: PassOutcome::Failed {
                job: "cargo-build".into(),
            },
        });
        assert!(step.keep_running);
        assert!(step.commands.is_empty());

        // The session keeps classifying new changes.
        let step = changed(&mut core, "resources/x.css");
        assert_eq!(step.commands, vec![CoreCommand::StartDebounce]);
    }

    #[test]
    fn once_mode_runs_full_pipeline_and_exits_with_outcome() {
        let mut core = core(true);

        let step = core.step(RuntimeEvent::FullPassRequested);
        let pass = run_pass_of(&step).clone();
        assert_eq!(pass.jobs, vec!["cargo-build", "tcm", "esbuild"]);

        let step = core.step(RuntimeEvent::PassCompleted {
            build_id: pass.build_id,
            outcome: PassOutcome::Failed { job: "tcm".into() },
        });
        assert!(!step.keep_running);
        assert_eq!(
            step.commands,
            vec![CoreCommand::ExitFailure(SessionFailure::PassFailed {
                job: "tcm".into()
            })]
        );
    }

    #[test]
    fn persist_exit_is_fatal() {
        let mut core = core(false);

        let step = core.step(RuntimeEvent::PersistExited {
            job: "site-watch".into(),
        });
        assert!(!step.keep_running);
        assert_eq!(
            step.commands,
            vec![CoreCommand::ExitFailure(SessionFailure::PersistCrashed {
                job: "site-watch".into()
            })]
        );
    }

    #[test]
    fn stale_pass_completion_is_ignored() {
        let mut core = core(false);

        changed(&mut core, "src/a.rs");
        core.step(RuntimeEvent::DebounceElapsed);

        let step = core.step(RuntimeEvent::PassCompleted {
            build_id: 999,
            outcome: PassOutcome::Success,
        });
        assert!(step.commands.is_empty());
        assert!(!core.is_idle());
    }

    #[test]
    fn build_ids_are_monotonic() {
        let mut core = core(false);

        changed(&mut core, "src/a.rs");
        let step = core.step(RuntimeEvent::DebounceElapsed);
        let first = run_pass_of(&step).build_id;
        core.step(RuntimeEvent::PassCompleted {
            build_id: first,
            outcome: PassOutcome::Success,
        });

        changed(&mut core, "src/b.rs");
        let step = core.step(RuntimeEvent::DebounceElapsed);
        let second = run_pass_of(&step).build_id;

        assert!(second > first);
    }
}
