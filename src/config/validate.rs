// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipewatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pipeline(cfg)?;
    validate_rule_references(cfg)?;
    validate_job_sections(cfg)?;
    validate_watch_section(cfg)?;
    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_empty() {
        return Err(PipewatchError::ConfigError(
            "`pipeline` must list at least one job name".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for name in cfg.pipeline.iter() {
        if !seen.insert(name.as_str()) {
            return Err(PipewatchError::ConfigError(format!(
                "`pipeline` contains duplicate job name '{name}'"
            )));
        }
    }

    Ok(())
}

/// Every job name referenced by a rule must exist in the pipeline.
fn validate_rule_references(cfg: &RawConfigFile) -> Result<()> {
    let pipeline: HashSet<&str> = cfg.pipeline.iter().map(String::as_str).collect();

    for (index, rule) in cfg.rule.iter().enumerate() {
        if rule.jobs.is_empty() {
            return Err(PipewatchError::ConfigError(format!(
                "rule #{index} ('{}') schedules no jobs",
                rule.pattern
            )));
        }

        for job in rule.jobs.iter() {
            if !pipeline.contains(job.as_str()) {
                return Err(PipewatchError::SchedulingError(format!(
                    "rule #{index} ('{}') references job '{job}' which is not in `pipeline`",
                    rule.pattern
                )));
            }
        }
    }

    Ok(())
}

/// Command-backed jobs must belong to the pipeline; otherwise they could
/// never be scheduled.
fn validate_job_sections(cfg: &RawConfigFile) -> Result<()> {
    let pipeline: HashSet<&str> = cfg.pipeline.iter().map(String::as_str).collect();

    for (name, job) in cfg.job.iter() {
        if !pipeline.contains(name.as_str()) {
            return Err(PipewatchError::ConfigError(format!(
                "[job.{name}] is declared but '{name}' is not in `pipeline`"
            )));
        }
        if job.command.trim().is_empty() {
            return Err(PipewatchError::ConfigError(format!(
                "[job.{name}] has an empty command"
            )));
        }
    }

    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(PipewatchError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::model::{JobConfig, JobKind, RuleConfig, WatchSection};

    fn raw_with(pipeline: Vec<&str>, rules: Vec<RuleConfig>) -> RawConfigFile {
        RawConfigFile {
            watch: WatchSection::default(),
            pipeline: pipeline.into_iter().map(String::from).collect(),
            rule: rules,
            job: BTreeMap::new(),
            reload: None,
        }
    }

    fn rule(pattern: &str, jobs: Vec<&str>, short_circuit: bool) -> RuleConfig {
        RuleConfig {
            pattern: pattern.to_string(),
            jobs: jobs.into_iter().map(String::from).collect(),
            short_circuit,
        }
    }

    #[test]
    fn accepts_rules_referencing_pipeline_jobs() {
        let raw = raw_with(
            vec!["cargo-build", "esbuild"],
            vec![rule("src/**/*.rs", vec!["cargo-build"], true)],
        );
        assert!(ConfigFile::try_from(raw).is_ok());
    }

    #[test]
    fn rejects_rule_referencing_unknown_job() {
        let raw = raw_with(
            vec!["cargo-build"],
            vec![rule("src/**/*.rs", vec!["tsc"], true)],
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, PipewatchError::SchedulingError(_)));
    }

    #[test]
    fn rejects_empty_pipeline() {
        let raw = raw_with(vec![], vec![]);
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_duplicate_pipeline_names() {
        let raw = raw_with(vec!["a", "b", "a"], vec![]);
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_job_section_outside_pipeline() {
        let mut raw = raw_with(vec!["a"], vec![]);
        raw.job.insert(
            "stray".to_string(),
            JobConfig {
                kind: JobKind::Spawn,
                command: "echo stray".to_string(),
            },
        );
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_zero_debounce() {
        let mut raw = raw_with(vec!["a"], vec![]);
        raw.watch.debounce_ms = 0;
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
