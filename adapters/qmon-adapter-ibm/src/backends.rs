//! Backend enumeration and best-effort status.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use qmon_core::BackendStatus;

use crate::api::{ApiPath, ApiTransport, BackendStatusResponse, BackendsListing};
use crate::error::IbmResult;

/// Default maximum number of backends queried per refresh.
pub const DEFAULT_BACKEND_CAP: usize = 24;

/// Lists backends and fetches the status of the first few.
///
/// Status failures are isolated per backend: the entry is kept with unknown
/// details and the rest of the batch continues. Only a failed listing
/// aborts the whole refresh.
#[derive(Clone)]
pub struct BackendStatusFetcher {
    api: Arc<dyn ApiTransport>,
    cap: usize,
    concurrency: usize,
}

impl BackendStatusFetcher {
    /// Query at most `cap` backends, `concurrency` at a time.
    pub fn new(api: Arc<dyn ApiTransport>, cap: usize, concurrency: usize) -> Self {
        Self {
            api,
            cap,
            concurrency: concurrency.max(1),
        }
    }

    /// All backend names, in listing order.
    pub async fn list_backend_names(&self) -> IbmResult<Vec<String>> {
        let body = self.api.get_json(&ApiPath::new(["backends"])).await?;
        let listing: BackendsListing = serde_json::from_value(body)?;
        Ok(listing.into_names())
    }

    /// Status of the first `cap` backends, in listing order.
    pub async fn fetch_backend_statuses(&self) -> IbmResult<Vec<BackendStatus>> {
        let names = self.list_backend_names().await?;
        if names.len() > self.cap {
            tracing::debug!(
                "querying {} of {} backends",
                self.cap,
                names.len()
            );
        }

        let statuses: Vec<BackendStatus> = stream::iter(names.into_iter().take(self.cap))
            .map(|name| self.fetch_status(name))
            .buffered(self.concurrency)
            .collect()
            .await;

        let degraded = statuses.iter().filter(|s| s.is_unknown()).count();
        if degraded > 0 {
            tracing::warn!("{degraded} of {} backend statuses unavailable", statuses.len());
        }
        Ok(statuses)
    }

    /// Status of a single backend; never fails.
    pub async fn fetch_status(&self, name: String) -> BackendStatus {
        let path = ApiPath::new(["backends", name.as_str(), "status"]);
        let response: IbmResult<BackendStatusResponse> = match self.api.get_json(&path).await {
            Ok(body) => serde_json::from_value::<BackendStatusResponse>(body).map_err(Into::into),
            Err(e) => Err(e),
        };

        match response {
            Ok(status) => BackendStatus {
                pending_jobs: status.queue_length(),
                operational: status.is_operational(),
                name,
            },
            Err(e) => {
                tracing::warn!("status for backend {name} unavailable: {e}");
                BackendStatus::unknown(name)
            }
        }
    }
}
