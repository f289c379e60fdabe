//! Derived views over the latest job and backend snapshots.
//!
//! Every function here is pure: the output depends only on the arguments,
//! so the presentation layer can recompute views on every redraw and tests
//! need no network at all.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::backend::BackendStatus;
use crate::job::Job;

/// Selector value meaning "no restriction".
pub const ALL: &str = "all";

/// Default number of entries in the queue-depth chart.
pub const DEFAULT_CHART_LIMIT: usize = 12;

/// User-supplied filter over job lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Free text matched against id, backend and program.
    pub text: String,
    /// Backend name or `"all"`.
    pub backend: String,
    /// Program ID or `"all"`.
    pub program: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            text: String::new(),
            backend: ALL.to_string(),
            program: ALL.to_string(),
        }
    }
}

impl FilterCriteria {
    /// Set the free-text query.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Restrict to one backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Restrict to one program.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Whether a job passes all three criteria.
    pub fn matches(&self, job: &Job) -> bool {
        if self.backend != ALL && job.backend != self.backend {
            return false;
        }
        if self.program != ALL && job.program_id.as_deref() != Some(self.program.as_str()) {
            return false;
        }

        let query = self.text.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        job.id.as_str().to_lowercase().contains(&query)
            || job.backend.to_lowercase().contains(&query)
            || job
                .program_id
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&query))
    }
}

/// One bar of the queue-depth chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepth {
    /// Backend name.
    pub name: String,
    /// Jobs waiting in its queue.
    pub count: u64,
}

/// Jobs passing `criteria`, in their original order.
pub fn filter(jobs: &[Job], criteria: &FilterCriteria) -> Vec<Job> {
    jobs.iter().filter(|j| criteria.matches(j)).cloned().collect()
}

/// Sorted backend names seen in either job list or the status listing,
/// prefixed with `"all"`.
pub fn distinct_backends(
    pending: &[Job],
    other: &[Job],
    backends: &[BackendStatus],
) -> Vec<String> {
    let names: BTreeSet<&str> = pending
        .iter()
        .chain(other)
        .map(|j| j.backend.as_str())
        .chain(backends.iter().map(|b| b.name.as_str()))
        .collect();
    with_all_prefix(names)
}

/// Sorted program IDs seen in either job list, prefixed with `"all"`.
pub fn distinct_programs(pending: &[Job], other: &[Job]) -> Vec<String> {
    let programs: BTreeSet<&str> = pending
        .iter()
        .chain(other)
        .filter_map(|j| j.program_id.as_deref())
        .collect();
    with_all_prefix(programs)
}

fn with_all_prefix(values: BTreeSet<&str>) -> Vec<String> {
    std::iter::once(ALL)
        .chain(values.into_iter().filter(|v| !v.is_empty() && *v != ALL))
        .map(str::to_string)
        .collect()
}

/// Number of pending jobs per backend.
pub fn pending_counts_by_backend(pending: &[Job]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for job in pending {
        *counts.entry(job.backend.clone()).or_insert(0) += 1;
    }
    counts
}

/// Backends with a known queue depth, deepest first, at most `limit` entries.
///
/// The sort is stable: backends with equal depth keep their listing order.
pub fn top_backends_by_queue_depth(backends: &[BackendStatus], limit: usize) -> Vec<QueueDepth> {
    let mut known: Vec<QueueDepth> = backends
        .iter()
        .filter_map(|b| {
            b.pending_jobs.map(|count| QueueDepth {
                name: b.name.clone(),
                count,
            })
        })
        .collect();
    known.sort_by(|a, b| b.count.cmp(&a.count));
    known.truncate(limit);
    known
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    fn sample_jobs() -> Vec<Job> {
        vec![
            Job::new("j1", "ibm_brisbane", JobStatus::Running),
            Job::new("j2", "ibm_kyoto", JobStatus::Queued),
        ]
    }

    #[test]
    fn test_text_filter_matches_backend() {
        let criteria = FilterCriteria::default().with_text("kyoto");
        let filtered = filter(&sample_jobs(), &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id.as_str(), "j2");
    }

    #[test]
    fn test_text_filter_is_case_insensitive_and_trimmed() {
        let jobs = vec![Job::new("ABC-123", "ibm_fez", JobStatus::Completed).with_program("Sampler")];
        assert_eq!(filter(&jobs, &FilterCriteria::default().with_text("  abc ")).len(), 1);
        assert_eq!(filter(&jobs, &FilterCriteria::default().with_text("SAMPLER")).len(), 1);
        assert!(filter(&jobs, &FilterCriteria::default().with_text("estimator")).is_empty());
    }

    #[test]
    fn test_program_filter_excludes_jobs_without_program() {
        let jobs = vec![
            Job::new("a", "ibm_fez", JobStatus::Queued).with_program("sampler"),
            Job::new("b", "ibm_fez", JobStatus::Queued),
        ];
        let filtered = filter(&jobs, &FilterCriteria::default().with_program("sampler"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id.as_str(), "a");
    }

    #[test]
    fn test_backend_filter_is_exact() {
        let jobs = sample_jobs();
        let filtered = filter(&jobs, &FilterCriteria::default().with_backend("ibm_kyo"));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_distinct_backends_merges_sources() {
        let pending = vec![Job::new("a", "ibm_kyoto", JobStatus::Queued)];
        let other = vec![Job::new("b", "ibm_brisbane", JobStatus::Completed)];
        let backends = vec![
            BackendStatus::unknown("ibm_kyoto"),
            BackendStatus::unknown("ibm_fez"),
        ];
        assert_eq!(
            distinct_backends(&pending, &other, &backends),
            vec!["all", "ibm_brisbane", "ibm_fez", "ibm_kyoto"]
        );
    }

    #[test]
    fn test_distinct_programs_skips_missing() {
        let pending = vec![
            Job::new("a", "x", JobStatus::Queued).with_program("sampler"),
            Job::new("b", "x", JobStatus::Queued),
        ];
        let other = vec![Job::new("c", "x", JobStatus::Completed).with_program("estimator")];
        assert_eq!(
            distinct_programs(&pending, &other),
            vec!["all", "estimator", "sampler"]
        );
    }

    #[test]
    fn test_distinct_lists_on_empty_input() {
        assert_eq!(distinct_backends(&[], &[], &[]), vec!["all"]);
        assert_eq!(distinct_programs(&[], &[]), vec!["all"]);
    }

    #[test]
    fn test_pending_counts() {
        let pending = vec![
            Job::new("a", "ibm_kyoto", JobStatus::Queued),
            Job::new("b", "ibm_kyoto", JobStatus::Running),
            Job::new("c", "ibm_fez", JobStatus::Queued),
        ];
        let counts = pending_counts_by_backend(&pending);
        assert_eq!(counts["ibm_kyoto"], 2);
        assert_eq!(counts["ibm_fez"], 1);
    }

    #[test]
    fn test_top_backends_stable_and_excludes_unknown() {
        let backends = vec![
            BackendStatus::new("b1", 5, true),
            BackendStatus::unknown("b2"),
            BackendStatus::new("b3", 9, true),
            BackendStatus::new("b4", 5, false),
        ];
        let chart = top_backends_by_queue_depth(&backends, DEFAULT_CHART_LIMIT);
        let names: Vec<&str> = chart.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["b3", "b1", "b4"]);
    }

    #[test]
    fn test_top_backends_respects_limit() {
        let backends: Vec<BackendStatus> = (0..20)
            .map(|i| BackendStatus::new(format!("b{i}"), i, true))
            .collect();
        let chart = top_backends_by_queue_depth(&backends, 12);
        assert_eq!(chart.len(), 12);
        assert_eq!(chart[0].count, 19);
        assert!(top_backends_by_queue_depth(&backends, 0).is_empty());
    }
}
