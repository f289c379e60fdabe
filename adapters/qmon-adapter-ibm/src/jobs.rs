//! Pending and recent job collections.

use std::sync::Arc;

use qmon_core::{Job, JobCollection};

use crate::api::{ApiPath, ApiTransport, JobsResponse};
use crate::error::IbmResult;

/// Default page size for each collection.
pub const DEFAULT_JOBS_LIMIT: usize = 200;

/// Fetches the pending and non-pending job collections.
///
/// The two requests are issued one after the other and the cycle is
/// all-or-nothing: if either fails, no collection is returned and the caller
/// keeps what it had.
#[derive(Clone)]
pub struct JobsFetcher {
    api: Arc<dyn ApiTransport>,
    limit: usize,
}

impl JobsFetcher {
    /// Create a fetcher requesting `limit` jobs per collection.
    pub fn new(api: Arc<dyn ApiTransport>, limit: usize) -> Self {
        Self {
            api,
            limit: limit.max(1),
        }
    }

    /// Jobs requested per collection.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fetch both collections.
    pub async fn fetch_jobs(&self) -> IbmResult<JobCollection> {
        let pending = self.fetch_page(true).await?;
        let other = self.fetch_page(false).await?;
        tracing::debug!(
            "fetched {} pending and {} other jobs",
            pending.len(),
            other.len()
        );
        Ok(JobCollection { pending, other })
    }

    /// Fetch one collection, newest first.
    pub async fn fetch_page(&self, pending: bool) -> IbmResult<Vec<Job>> {
        let path = ApiPath::new(["jobs"])
            .query("pending", pending)
            .query("limit", self.limit)
            .query("sort", "DESC");

        let body = self.api.get_json(&path).await?;
        let response: JobsResponse = serde_json::from_value(body)?;

        let mut jobs: Vec<Job> = response.jobs.into_iter().map(Job::from).collect();
        jobs.truncate(self.limit);
        Ok(jobs)
    }
}
