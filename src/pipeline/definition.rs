// src/pipeline/definition.rs

use std::collections::HashSet;

use crate::engine::JobName;
use crate::pipeline::ScheduledSet;

/// Ordered sequence of unique job names; the canonical run order for any
/// pass.
///
/// Uniqueness is enforced by config validation before this type is
/// constructed.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    order: Vec<JobName>,
}

impl PipelineDefinition {
    pub fn new(order: Vec<JobName>) -> Self {
        Self { order }
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, job: &str) -> bool {
        self.order.iter().any(|name| name == job)
    }

    /// A scheduled set containing every pipeline job; used by once mode,
    /// which runs the full pipeline unconditionally.
    pub fn full_set(&self) -> ScheduledSet {
        let mut set = ScheduledSet::new();
        for name in self.order.iter() {
            set.insert(name.clone());
        }
        set
    }

    /// Derive the execution list for one pass: the pipeline filtered to
    /// members of `scheduled`, in pipeline order, deduplicated.
    ///
    /// Scheduled names not present in the pipeline are impossible after
    /// startup validation and are skipped here rather than run out of order.
    pub fn execution_list(&self, scheduled: &ScheduledSet) -> Vec<JobName> {
        let mut emitted: HashSet<&str> = HashSet::with_capacity(self.order.len());

        self.order
            .iter()
            .filter(|name| scheduled.contains(name) && emitted.insert(name.as_str()))
            .cloned()
            .collect()
    }
}
