// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// paths = ["site.toml", "resources", "src"]
/// debounce_ms = 250
///
/// pipeline = ["cargo-build", "site-watch", "tcm", "esbuild"]
///
/// [[rule]]
/// pattern = "src/**/*.rs"
/// jobs = ["cargo-build"]
/// short_circuit = true
///
/// [job.cargo-build]
/// kind = "spawn"
/// command = "cargo build"
///
/// [reload]
/// addr = "127.0.0.1:35729"
/// site_root = "public"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Watch roots and debounce window from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,

    /// Canonical run order for any pass. Names must be unique.
    #[serde(default)]
    pub pipeline: Vec<String>,

    /// Ordered classification rules from `[[rule]]`, evaluated in
    /// declaration order.
    #[serde(default)]
    pub rule: Vec<RuleConfig>,

    /// Command-backed jobs from `[job.<name>]`.
    ///
    /// One-shot handlers are registered programmatically, not here.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,

    /// Optional live-reload push channel from `[reload]`.
    #[serde(default)]
    pub reload: Option<ReloadSection>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Paths (files or directories) handed to the filesystem watcher.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Interval over which change events are coalesced into one batch
    /// before a pass starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    250
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// A single `[[rule]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Glob pattern matched against changed paths, relative to the
    /// project root (e.g. `"src/**/*.rs"`).
    pub pattern: String,

    /// Job names scheduled when the pattern matches.
    pub jobs: Vec<String>,

    /// If true, a match stops rule evaluation for that path. If false,
    /// evaluation continues into subsequent rules.
    #[serde(default)]
    pub short_circuit: bool,
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Execution contract for the command.
    pub kind: JobKind,

    /// Shell command to run.
    pub command: String,
}

/// Lifecycle kind for a command-backed job, as written in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Launch the command, await its exit, map the status to an outcome.
    Spawn,
    /// Launch the command once per session and keep it alive across passes.
    Persist,
}

/// `[reload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadSection {
    /// Address the websocket push channel listens on.
    pub addr: String,

    /// Directory holding the rendered site; pushed documents are resolved
    /// against it per subscribed path.
    pub site_root: String,
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(raw)` (see [`super::validate`]) or
/// the checked helpers there; fields are read-only afterwards.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    watch: WatchSection,
    pipeline: Vec<String>,
    rule: Vec<RuleConfig>,
    job: BTreeMap<String, JobConfig>,
    reload: Option<ReloadSection>,
}

impl ConfigFile {
    /// Internal constructor used by validation. Callers must have already
    /// checked the invariants.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            watch: raw.watch,
            pipeline: raw.pipeline,
            rule: raw.rule,
            job: raw.job,
            reload: raw.reload,
        }
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    pub fn pipeline(&self) -> &[String] {
        &self.pipeline
    }

    pub fn rules(&self) -> &[RuleConfig] {
        &self.rule
    }

    pub fn jobs(&self) -> &BTreeMap<String, JobConfig> {
        &self.job
    }

    pub fn reload(&self) -> Option<&ReloadSection> {
        self.reload.as_ref()
    }
}
