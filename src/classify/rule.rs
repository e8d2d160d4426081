// src/classify/rule.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::config::RuleConfig;
use crate::engine::JobName;

/// A single compiled classification rule.
///
/// The pattern is assumed to be relative to the project root; the watcher
/// passes relative paths (e.g. `"src/main.rs"`) into [`RuleSet::classify`].
#[derive(Clone)]
pub struct CompiledRule {
    pattern: GlobMatcher,
    jobs: Vec<JobName>,
    short_circuit: bool,
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("pattern", &self.pattern.glob().glob())
            .field("jobs", &self.jobs)
            .field("short_circuit", &self.short_circuit)
            .finish()
    }
}

impl CompiledRule {
    pub fn new(pattern: &str, jobs: Vec<JobName>, short_circuit: bool) -> Result<Self> {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid glob pattern: {pattern}"))?;

        Ok(Self {
            pattern: glob.compile_matcher(),
            jobs,
            short_circuit,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.glob().glob()
    }

    pub fn jobs(&self) -> &[JobName] {
        &self.jobs
    }

    pub fn short_circuit(&self) -> bool {
        self.short_circuit
    }

    fn matches(&self, rel_path: &str) -> bool {
        self.pattern.is_match(rel_path)
    }
}

/// Ordered rule list evaluated in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self { rules }
    }

    /// Compile the `[[rule]]` entries from a validated config.
    pub fn from_config(rules: &[RuleConfig]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            compiled.push(CompiledRule::new(
                &rule.pattern,
                rule.jobs.clone(),
                rule.short_circuit,
            )?);
        }
        Ok(Self::new(compiled))
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Classify a changed path (relative to the project root) into the job
    /// names it schedules.
    ///
    /// Rules are tested in declaration order. A match with `short_circuit`
    /// stops evaluation for this path; a match without it schedules its jobs
    /// and evaluation continues into subsequent rules. The returned list may
    /// contain duplicates; the scheduled set deduplicates.
    pub fn classify(&self, rel_path: &str) -> Vec<JobName> {
        let mut scheduled = Vec::new();

        for rule in self.rules.iter() {
            if !rule.matches(rel_path) {
                continue;
            }

            debug!(
                path = %rel_path,
                pattern = %rule.pattern(),
                jobs = ?rule.jobs(),
                short_circuit = rule.short_circuit(),
                "rule matched changed path"
            );

            scheduled.extend(rule.jobs().iter().cloned());

            if rule.short_circuit() {
                break;
            }
        }

        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, jobs: &[&str], short_circuit: bool) -> CompiledRule {
        CompiledRule::new(
            pattern,
            jobs.iter().map(|s| s.to_string()).collect(),
            short_circuit,
        )
        .unwrap()
    }

    #[test]
    fn short_circuit_stops_evaluation() {
        let rules = RuleSet::new(vec![
            rule("src/**/*.rs", &["cargo-build"], true),
            rule("src/**/*", &["generic"], false),
        ]);

        assert_eq!(rules.classify("src/main.rs"), vec!["cargo-build"]);
    }

    #[test]
    fn fallthrough_continues_into_later_rules() {
        let rules = RuleSet::new(vec![
            rule("resources/ts/**/*.css", &["tcm"], false),
            rule("resources/**/*.css", &["esbuild"], true),
        ]);

        assert_eq!(
            rules.classify("resources/ts/controller_x.css"),
            vec!["tcm", "esbuild"]
        );
        assert_eq!(rules.classify("resources/css/global.css"), vec!["esbuild"]);
    }

    #[test]
    fn fallthrough_stops_at_first_short_circuit() {
        let rules = RuleSet::new(vec![
            rule("a/**", &["one"], false),
            rule("a/b/**", &["two"], true),
            rule("a/**", &["three"], false),
        ]);

        assert_eq!(rules.classify("a/b/c.txt"), vec!["one", "two"]);
    }

    #[test]
    fn unmatched_path_is_silently_ignored() {
        let rules = RuleSet::new(vec![rule("src/**/*.rs", &["cargo-build"], true)]);
        assert!(rules.classify("README.md").is_empty());
    }

    #[test]
    fn empty_rule_set_schedules_nothing() {
        let rules = RuleSet::default();
        assert!(rules.classify("src/main.rs").is_empty());
    }
}
