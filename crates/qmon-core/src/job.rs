//! Job snapshot types.
//!
//! Jobs are read-only snapshots of what the provider reported on the last
//! fetch. Each poll cycle replaces the previous collection wholesale; nothing
//! is merged or diffed across polls.
//!
//! ```text
//!   Queued ──→ Running ──→ Completed
//!     │           │
//!     │           ├──→ Failed
//!     └───────────┴──→ Cancelled
//! ```
//!
//! `Queued` and `Running` make up the *pending* collection, everything else
//! the *other* collection.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Web console root used for job links.
pub const DASHBOARD_JOBS_URL: &str = "https://quantum.cloud.ibm.com/jobs";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting in the backend queue.
    Queued,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Cancelled by the user or the provider.
    Cancelled,
    /// Finished with an error.
    Failed,
    /// Missing or unrecognized status.
    Unknown,
}

impl JobStatus {
    /// Parse a provider status string, ignoring case.
    ///
    /// `ERROR` is folded into `Failed`; anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "QUEUED" => JobStatus::Queued,
            "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "CANCELLED" | "CANCELED" => JobStatus::Cancelled,
            "FAILED" | "ERROR" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    /// Resolve the status from the two places a job response may carry it.
    ///
    /// Precedence: the top-level `status` field, then `state.status`, then
    /// `Unknown`. Blank strings count as absent.
    pub fn resolve(direct: Option<&str>, nested: Option<&str>) -> Self {
        direct
            .filter(|s| !s.trim().is_empty())
            .or_else(|| nested.filter(|s| !s.trim().is_empty()))
            .map_or(JobStatus::Unknown, JobStatus::parse)
    }

    /// Queued or running.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Completed, failed or cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Display label.
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Failed => "Failed",
            JobStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A job as seen on the last fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier, unique within a collection.
    pub id: JobId,
    /// Backend the job targets.
    pub backend: String,
    /// Resolved status.
    pub status: JobStatus,
    /// Failure or cancellation reason, when the provider gives one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Runtime program (e.g. `sampler`, `estimator`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// Quantum seconds consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_seconds: Option<f64>,
    /// User tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Runtime session the job belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Whether the job was submitted as private.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    /// Reported cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl Job {
    /// Create a job with only the required fields set.
    pub fn new(id: impl Into<JobId>, backend: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            status,
            status_reason: None,
            created_at: None,
            program_id: None,
            usage_seconds: None,
            tags: BTreeSet::new(),
            session_id: None,
            is_private: None,
            cost: None,
        }
    }

    /// Set the program ID.
    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Link to the job in the provider web console.
    pub fn dashboard_url(&self) -> String {
        format!("{DASHBOARD_JOBS_URL}/{}", self.id)
    }

    /// Link to the raw job resource under an API root.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}/jobs/{}", endpoint.trim_end_matches('/'), self.id)
    }
}

/// The two job collections fetched each poll cycle.
///
/// Each side is capped at the fetch limit and ordered newest first, as the
/// provider returned it. The two sides are not guaranteed disjoint: a job that
/// changes status between the two requests can appear in both or neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCollection {
    /// Queued and running jobs.
    pub pending: Vec<Job>,
    /// Everything else (completed, failed, cancelled).
    pub other: Vec<Job>,
}

impl JobCollection {
    /// Total number of jobs across both sides.
    pub fn len(&self) -> usize {
        self.pending.len() + self.other.len()
    }

    /// Both sides are empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.other.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(JobStatus::parse("Running"), JobStatus::Running);
        assert_eq!(JobStatus::parse("QUEUED"), JobStatus::Queued);
        assert_eq!(JobStatus::parse("completed"), JobStatus::Completed);
        assert_eq!(JobStatus::parse("Cancelled"), JobStatus::Cancelled);
        assert_eq!(JobStatus::parse("ERROR"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("Paused"), JobStatus::Unknown);
    }

    #[test]
    fn test_resolve_direct_field_wins() {
        assert_eq!(
            JobStatus::resolve(Some("Completed"), Some("Running")),
            JobStatus::Completed
        );
    }

    #[test]
    fn test_resolve_falls_back_to_nested_state() {
        assert_eq!(JobStatus::resolve(None, Some("Queued")), JobStatus::Queued);
        assert_eq!(JobStatus::resolve(Some(""), Some("Failed")), JobStatus::Failed);
    }

    #[test]
    fn test_resolve_unknown_when_absent() {
        assert_eq!(JobStatus::resolve(None, None), JobStatus::Unknown);
        assert_eq!(JobStatus::resolve(Some("  "), None), JobStatus::Unknown);
    }

    #[test]
    fn test_pending_and_terminal() {
        assert!(JobStatus::Queued.is_pending());
        assert!(JobStatus::Running.is_pending());
        assert!(!JobStatus::Completed.is_pending());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
        assert!(!JobStatus::Unknown.is_pending());
    }

    #[test]
    fn test_job_links() {
        let job = Job::new("d1abc", "ibm_kyoto", JobStatus::Queued);
        assert_eq!(
            job.dashboard_url(),
            "https://quantum.cloud.ibm.com/jobs/d1abc"
        );
        assert_eq!(
            job.api_url("https://quantum.cloud.ibm.com/api/v1/"),
            "https://quantum.cloud.ibm.com/api/v1/jobs/d1abc"
        );
    }

    #[test]
    fn test_collection_len() {
        let jobs = JobCollection {
            pending: vec![Job::new("a", "b", JobStatus::Running)],
            other: vec![
                Job::new("c", "b", JobStatus::Completed),
                Job::new("d", "b", JobStatus::Failed),
            ],
        };
        assert_eq!(jobs.len(), 3);
        assert!(!jobs.is_empty());
        assert!(JobCollection::default().is_empty());
    }
}
