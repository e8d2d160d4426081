// src/pipeline/scheduled_set.rs

use std::collections::HashSet;

use crate::engine::JobName;

/// Set of job names accumulated from one or more change events inside a
/// debounce window.
///
/// Scheduling a job name multiple times within one batch yields exactly one
/// execution in that pass; the set keeps no record of how many rules
/// contributed each member.
#[derive(Debug, Clone, Default)]
pub struct ScheduledSet {
    jobs: HashSet<JobName>,
}

impl ScheduledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job: JobName) -> bool {
        self.jobs.insert(job)
    }

    pub fn extend(&mut self, jobs: impl IntoIterator<Item = JobName>) {
        self.jobs.extend(jobs);
    }

    pub fn contains(&self, job: &str) -> bool {
        self.jobs.contains(job)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Empty the set, returning its previous contents.
    pub fn take(&mut self) -> ScheduledSet {
        ScheduledSet {
            jobs: std::mem::take(&mut self.jobs),
        }
    }
}
