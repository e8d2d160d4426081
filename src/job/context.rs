// src/job/context.rs

//! Capability object handed to one-shot handlers.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::job::process::{self, ExitOutcome};

/// Context for a single job execution within one pass.
///
/// Cheap to clone; one instance is created per scheduled job per pass.
#[derive(Debug, Clone)]
pub struct JobContext {
    base_directory: PathBuf,
    build_id: u64,
}

impl JobContext {
    pub fn new(base_directory: PathBuf, build_id: u64) -> Self {
        Self {
            base_directory,
            build_id,
        }
    }

    /// Working directory for the session (the config file's directory).
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Monotonic build identifier of the pass this job runs in.
    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    /// Clear the terminal so each pass starts from a clean console.
    pub fn reset_console(&self) {
        let mut stdout = std::io::stdout();
        // CSI 2J (erase display) + CSI H (cursor home).
        let _ = write!(stdout, "\x1b[2J\x1b[H");
        let _ = stdout.flush();
    }

    /// Print a titled entry list, e.g. the entry points a bundler resolved.
    pub fn print_subtree_list(&self, title: &str, items: &[String]) {
        println!("{title}:");
        for (index, item) in items.iter().enumerate() {
            let connector = if index + 1 == items.len() {
                "└─"
            } else {
                "├─"
            };
            println!("  {connector} {item}");
        }
    }

    /// Run a shell command to completion in the base directory, returning
    /// its exit outcome.
    pub async fn command(&self, command: &str) -> anyhow::Result<ExitOutcome> {
        process::run_command(&self.base_directory, command).await
    }
}
