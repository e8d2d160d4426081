#![allow(dead_code)]

use std::collections::BTreeMap;

use pipewatch::config::{
    ConfigFile, JobConfig, JobKind, RawConfigFile, RuleConfig, WatchSection,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                watch: WatchSection::default(),
                pipeline: Vec::new(),
                rule: Vec::new(),
                job: BTreeMap::new(),
                reload: None,
            },
        }
    }

    pub fn with_pipeline(mut self, names: &[&str]) -> Self {
        self.config.pipeline = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_rule(mut self, pattern: &str, jobs: &[&str], short_circuit: bool) -> Self {
        self.config.rule.push(RuleConfig {
            pattern: pattern.to_string(),
            jobs: jobs.iter().map(|s| s.to_string()).collect(),
            short_circuit,
        });
        self
    }

    pub fn with_spawn_job(mut self, name: &str, command: &str) -> Self {
        self.config.job.insert(
            name.to_string(),
            JobConfig {
                kind: JobKind::Spawn,
                command: command.to_string(),
            },
        );
        self
    }

    pub fn with_persist_job(mut self, name: &str, command: &str) -> Self {
        self.config.job.insert(
            name.to_string(),
            JobConfig {
                kind: JobKind::Persist,
                command: command.to_string(),
            },
        );
        self
    }

    pub fn with_watch_path(mut self, path: &str) -> Self {
        self.config.watch.paths.push(path.to_string());
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// For tests that exercise validation failures directly.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
