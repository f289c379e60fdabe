//! Monitor session: credentials, polling and the shared snapshot.
//!
//! The session owns the latest job and backend snapshot. Only fetch
//! completions write it; views read it. A failed fetch never blanks what is
//! already there: the last good data stays until a later fetch succeeds.
//!
//! Jobs are refreshed on every poll tick. Backend statuses are fetched once
//! per credential change (and on explicit request) to bound request volume.
//!
//! A credential change is not a transient failure: the snapshot is emptied
//! and its generation bumped, so fetches started for the previous account
//! are discarded when they complete.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use qmon_adapter_ibm::{ApiTransport, BackendStatusFetcher, IbmClient, JobsFetcher};
use qmon_core::view::{
    distinct_backends, distinct_programs, filter, pending_counts_by_backend,
    top_backends_by_queue_depth,
};
use qmon_core::{
    BackendStatus, CredentialStore, Credentials, FilterCriteria, Job, MonitorConfig, QueueDepth,
    clamp_poll_interval,
};

use crate::error::{MonitorError, MonitorResult};
use crate::scheduler::{PollScheduler, PollTarget};

/// Latest data fetched from the provider.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Queued and running jobs.
    pub pending: Vec<Job>,
    /// Completed, failed and cancelled jobs.
    pub other: Vec<Job>,
    /// Backend status sample.
    pub backends: Vec<BackendStatus>,
    /// When the job collections were last replaced.
    pub jobs_updated_at: Option<DateTime<Utc>>,
    /// When the backend sample was last replaced.
    pub backends_updated_at: Option<DateTime<Utc>>,
}

/// Everything the presentation layer renders, derived from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Pending jobs passing the filter.
    pub pending: Vec<Job>,
    /// Other jobs passing the filter.
    pub other: Vec<Job>,
    /// Unfiltered backend status sample.
    pub backends: Vec<BackendStatus>,
    /// Backend selector options, `"all"` first.
    pub backend_options: Vec<String>,
    /// Program selector options, `"all"` first.
    pub program_options: Vec<String>,
    /// Unfiltered pending job count per backend.
    pub pending_by_backend: BTreeMap<String, usize>,
    /// Deepest backend queues.
    pub queue_chart: Vec<QueueDepth>,
    /// A bearer token is cached.
    pub token_ready: bool,
    /// Effective poll interval, when polling.
    pub polling: Option<Duration>,
    /// When the job collections were last replaced.
    pub jobs_updated_at: Option<DateTime<Utc>>,
    /// When the backend sample was last replaced.
    pub backends_updated_at: Option<DateTime<Utc>>,
}

/// Fetchers plus the snapshot they write; shared with the poll task.
struct SessionCore {
    api: Arc<dyn ApiTransport>,
    jobs: JobsFetcher,
    backends: BackendStatusFetcher,
    snapshot: RwLock<Snapshot>,
    /// Bumped under the snapshot write lock whenever the snapshot is reset.
    generation: AtomicU64,
}

impl SessionCore {
    /// Empty the snapshot and orphan every fetch still in flight.
    async fn reset(&self) {
        let mut snapshot = self.snapshot.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *snapshot = Snapshot::default();
    }

    async fn refresh_jobs(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        match self.jobs.fetch_jobs().await {
            Ok(collection) => {
                let mut snapshot = self.snapshot.write().await;
                if self.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("discarding jobs fetched for previous credentials");
                    return false;
                }
                snapshot.pending = collection.pending;
                snapshot.other = collection.other;
                snapshot.jobs_updated_at = Some(Utc::now());
                true
            }
            Err(e) => {
                tracing::warn!("job refresh failed, keeping previous data: {e}");
                false
            }
        }
    }

    async fn refresh_backends(&self) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        match self.backends.fetch_backend_statuses().await {
            Ok(statuses) => {
                let mut snapshot = self.snapshot.write().await;
                if self.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("discarding backends fetched for previous credentials");
                    return false;
                }
                snapshot.backends = statuses;
                snapshot.backends_updated_at = Some(Utc::now());
                true
            }
            Err(e) => {
                tracing::warn!("backend refresh failed, keeping previous data: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl PollTarget for SessionCore {
    async fn poll(&self) {
        self.refresh_jobs().await;
    }
}

/// A monitoring session against one provider instance.
pub struct MonitorSession {
    core: Arc<SessionCore>,
    credentials: Arc<dyn CredentialStore>,
    scheduler: Mutex<PollScheduler>,
    interval_ms: AtomicU64,
    chart_limit: usize,
}

impl MonitorSession {
    /// Session talking to IBM Quantum Cloud.
    pub fn new(config: &MonitorConfig, credentials: Arc<dyn CredentialStore>) -> MonitorResult<Self> {
        let client = IbmClient::new(config, Arc::clone(&credentials))?;
        Ok(Self::with_transport(config, credentials, Arc::new(client)))
    }

    /// Session over an arbitrary transport.
    pub fn with_transport(
        config: &MonitorConfig,
        credentials: Arc<dyn CredentialStore>,
        api: Arc<dyn ApiTransport>,
    ) -> Self {
        let core = Arc::new(SessionCore {
            jobs: JobsFetcher::new(Arc::clone(&api), config.jobs_limit),
            backends: BackendStatusFetcher::new(
                Arc::clone(&api),
                config.backend_cap,
                config.backend_concurrency,
            ),
            api,
            snapshot: RwLock::new(Snapshot::default()),
            generation: AtomicU64::new(0),
        });
        let target: Arc<dyn PollTarget> = core.clone();

        Self {
            core,
            credentials,
            scheduler: Mutex::new(PollScheduler::new(target)),
            interval_ms: AtomicU64::new(config.poll_interval_ms),
            chart_limit: config.chart_limit,
        }
    }

    /// Authenticate, load jobs and backends once, then start polling.
    ///
    /// Any running timer is stopped first and only restarted on success.
    /// Fails only when credentials are incomplete or authentication fails;
    /// data fetch failures are logged and leave the snapshot as it was.
    pub async fn establish(&self) -> MonitorResult<()> {
        self.stop();
        let credentials = self.credentials.get()?;
        if !credentials.as_ref().is_some_and(Credentials::is_complete) {
            return Err(MonitorError::IncompleteCredentials);
        }

        self.core.api.authenticate().await?;
        tracing::info!("session established");

        self.core.refresh_jobs().await;
        self.core.refresh_backends().await;
        self.start_polling();
        Ok(())
    }

    /// Replace the credentials and re-establish the session.
    ///
    /// Polling stops first. When the credentials differ from the stored ones
    /// the snapshot is emptied. Returns `false` when the new credentials are
    /// incomplete; nothing is fetched in that case.
    pub async fn set_credentials(&self, credentials: &Credentials) -> MonitorResult<bool> {
        self.stop();
        let previous = self.credentials.get()?;
        self.credentials.set(credentials)?;
        self.core.api.invalidate();
        if previous.as_ref() != Some(credentials) {
            self.core.reset().await;
        }

        if !credentials.is_complete() {
            return Ok(false);
        }
        self.establish().await?;
        Ok(true)
    }

    /// Forget the credentials, stop polling and empty the snapshot.
    pub async fn clear_credentials(&self) -> MonitorResult<()> {
        self.stop();
        self.core.api.invalidate();
        self.credentials.clear()?;
        self.core.reset().await;
        Ok(())
    }

    /// Refresh job collections now. Returns whether the snapshot changed.
    pub async fn refresh_jobs(&self) -> bool {
        self.core.refresh_jobs().await
    }

    /// Refresh the backend sample now. Returns whether the snapshot changed.
    pub async fn refresh_backends(&self) -> bool {
        self.core.refresh_backends().await
    }

    /// Change the poll interval, restarting the timer if it is running.
    ///
    /// Returns the effective (clamped) interval.
    pub fn set_interval(&self, interval_ms: u64) -> Duration {
        self.interval_ms.store(interval_ms, Ordering::SeqCst);
        let mut scheduler = self.scheduler.lock().unwrap_or_else(|e| e.into_inner());
        if scheduler.is_polling() {
            scheduler.restart(interval_ms)
        } else {
            clamp_poll_interval(interval_ms)
        }
    }

    /// Start polling at the current interval.
    pub fn start_polling(&self) -> Duration {
        let interval_ms = self.interval_ms.load(Ordering::SeqCst);
        self.scheduler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .restart(interval_ms)
    }

    /// Stop polling. Idempotent.
    pub fn stop(&self) {
        self.scheduler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stop();
    }

    /// Whether the poll timer is running.
    pub fn is_polling(&self) -> bool {
        self.polling_interval().is_some()
    }

    /// Effective poll interval while polling.
    pub fn polling_interval(&self) -> Option<Duration> {
        self.scheduler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .effective_interval()
    }

    /// A bearer token is cached.
    pub fn token_ready(&self) -> bool {
        self.core.api.is_authenticated()
    }

    /// Copy of the current snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.core.snapshot.read().await.clone()
    }

    /// Views over the current snapshot for the given filter.
    pub async fn dashboard(&self, criteria: &FilterCriteria) -> DashboardView {
        let snapshot = self.core.snapshot.read().await;
        DashboardView {
            pending: filter(&snapshot.pending, criteria),
            other: filter(&snapshot.other, criteria),
            backends: snapshot.backends.clone(),
            backend_options: distinct_backends(
                &snapshot.pending,
                &snapshot.other,
                &snapshot.backends,
            ),
            program_options: distinct_programs(&snapshot.pending, &snapshot.other),
            pending_by_backend: pending_counts_by_backend(&snapshot.pending),
            queue_chart: top_backends_by_queue_depth(&snapshot.backends, self.chart_limit),
            token_ready: self.token_ready(),
            polling: self.polling_interval(),
            jobs_updated_at: snapshot.jobs_updated_at,
            backends_updated_at: snapshot.backends_updated_at,
        }
    }

    /// Stop polling before the session is dropped.
    pub fn shutdown(&self) {
        self.stop();
        tracing::info!("session closed");
    }
}
