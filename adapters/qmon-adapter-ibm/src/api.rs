//! IBM Quantum Cloud REST client.
//!
//! This module implements the read-only slice of the Quantum Cloud v1 API the
//! monitor needs:
//! - Listing jobs (`/jobs?pending=…`)
//! - Listing backends (`/backends`)
//! - Per-backend status (`/backends/{name}/status`)
//!
//! Every request carries `Authorization: Bearer <token>` from the
//! [`TokenManager`] and the `Service-CRN` instance header. Non-2xx responses
//! become [`IbmError::Status`]; nothing is retried here. A 401 drops the cached
//! token so the next request re-authenticates.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde::Deserialize;
use serde_json::Value;

use qmon_core::{CredentialStore, Job, JobStatus, MonitorConfig};

use crate::auth::TokenManager;
use crate::error::{IbmError, IbmResult};

/// IBM API version header value.
const IBM_API_VERSION: &str = "2026-02-01";

/// User-Agent sent with requests (Cloudflare blocks default reqwest UA).
const USER_AGENT: &str = concat!("qmon/", env!("CARGO_PKG_VERSION"), " (job-monitor)");

/// A request path relative to the API root, with query parameters.
///
/// Segments are percent-encoded when the URL is built, so backend names can
/// be passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ApiPath {
    /// Path made of the given segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Resolve against an API root.
    pub fn to_url(&self, endpoint: &str) -> IbmResult<Url> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| IbmError::InvalidParameter(format!("API endpoint '{endpoint}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                IbmError::InvalidParameter(format!("API endpoint '{endpoint}' cannot be a base"))
            })?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

/// Authenticated JSON transport to the provider API.
///
/// Fetchers depend on this seam instead of on [`IbmClient`] directly.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Make sure a bearer token is available, acquiring one if needed.
    async fn authenticate(&self) -> IbmResult<()>;

    /// A usable bearer token is cached.
    fn is_authenticated(&self) -> bool;

    /// Forget the cached bearer token.
    fn invalidate(&self);

    /// GET `path` and return the decoded JSON body.
    async fn get_json(&self, path: &ApiPath) -> IbmResult<Value>;
}

/// IBM Quantum Cloud API client.
pub struct IbmClient {
    /// HTTP client.
    client: Client,
    /// API root, e.g. `https://quantum.cloud.ibm.com/api/v1`.
    endpoint: String,
    /// Bearer token source.
    tokens: Arc<TokenManager>,
    /// API key and instance.
    credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl IbmClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &MonitorConfig, credentials: Arc<dyn CredentialStore>) -> IbmResult<Self> {
        let tokens = Arc::new(TokenManager::new(config, Arc::clone(&credentials))?);
        Self::with_token_manager(config, credentials, tokens)
    }

    /// Create a client sharing an existing token manager.
    pub fn with_token_manager(
        config: &MonitorConfig,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<TokenManager>,
    ) -> IbmResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::HeaderName::from_static("ibm-api-version"),
            header::HeaderValue::from_static(IBM_API_VERSION),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout())
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            tokens,
            credentials,
        })
    }

    /// The API root.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The token manager backing this client.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Authenticated GET returning JSON.
    ///
    /// Fails before any network traffic unless both the API key and the
    /// instance identifier are configured.
    pub async fn request(&self, path: &ApiPath) -> IbmResult<Value> {
        let credentials = self.credentials.get()?.ok_or(IbmError::MissingApiKey)?;
        if !credentials.has_api_key() {
            return Err(IbmError::MissingApiKey);
        }
        if !credentials.has_instance() {
            return Err(IbmError::MissingServiceCrn);
        }

        let token = self.tokens.token().await?;
        let url = path.to_url(&self.endpoint)?;

        let instance = header::HeaderValue::from_str(credentials.instance_id.trim())
            .map_err(|_| IbmError::InvalidParameter("invalid Service-CRN value".into()))?;

        tracing::debug!("GET {path}");
        let response = self
            .client
            .get(url)
            .bearer_auth(token.value())
            .header("Service-CRN", instance)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                tracing::warn!("{path} rejected the bearer token; it will be re-acquired");
                self.tokens.invalidate();
            }
            let message = response.text().await.unwrap_or_default();
            return Err(IbmError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ApiTransport for IbmClient {
    async fn authenticate(&self) -> IbmResult<()> {
        self.tokens.token().await.map(|_| ())
    }

    fn is_authenticated(&self) -> bool {
        self.tokens.is_ready()
    }

    fn invalidate(&self) {
        self.tokens.invalidate();
    }

    async fn get_json(&self, path: &ApiPath) -> IbmResult<Value> {
        self.request(path).await
    }
}

// ============================================================================
// Response types
// ============================================================================

/// `/jobs` response.
#[derive(Debug, Default, Deserialize)]
pub struct JobsResponse {
    /// Jobs on this page.
    #[serde(default)]
    pub jobs: Vec<RawJob>,
    /// Total matching jobs.
    #[serde(default)]
    pub count: Option<u64>,
    /// Page size requested.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Page offset.
    #[serde(default)]
    pub offset: Option<u64>,
}

/// A job as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    /// Job ID.
    pub id: String,
    /// Backend name.
    #[serde(default)]
    pub backend: Option<String>,
    /// Top-level status (mirror of `state.status` in some responses).
    #[serde(default)]
    pub status: Option<String>,
    /// State object with reason.
    #[serde(default)]
    pub state: Option<RawJobState>,
    /// Creation time (RFC 3339).
    #[serde(default)]
    pub created: Option<String>,
    /// Runtime program.
    #[serde(default)]
    pub program: Option<RawProgram>,
    /// Usage accounting.
    #[serde(default)]
    pub usage: Option<RawUsage>,
    /// User tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Runtime session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Private job flag.
    #[serde(default)]
    pub private: Option<bool>,
    /// Cost.
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Job state with reason.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobState {
    /// Status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Reason for failure or cancellation.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Program reference.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProgram {
    /// Program ID.
    #[serde(default)]
    pub id: Option<String>,
}

/// Usage accounting.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUsage {
    /// Quantum seconds.
    #[serde(default)]
    pub seconds: Option<f64>,
}

impl From<RawJob> for Job {
    fn from(raw: RawJob) -> Self {
        let (nested_status, reason) = match raw.state {
            Some(state) => (state.status, state.reason),
            None => (None, None),
        };
        let status = JobStatus::resolve(raw.status.as_deref(), nested_status.as_deref());
        let created_at = raw.created.as_deref().and_then(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&chrono::Utc))
        });

        Job {
            id: raw.id.into(),
            backend: raw.backend.unwrap_or_default(),
            status,
            status_reason: reason,
            created_at,
            program_id: raw.program.and_then(|p| p.id),
            usage_seconds: raw.usage.and_then(|u| u.seconds),
            tags: raw.tags.unwrap_or_default().into_iter().collect(),
            session_id: raw.session_id,
            is_private: raw.private,
            cost: raw.cost,
        }
    }
}

/// `/backends` response: a bare list, `{"backends": [...]}` or `{"devices": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BackendsListing {
    /// Bare JSON array.
    Bare(Vec<BackendEntry>),
    /// Legacy wrapper.
    Wrapped {
        /// Entries.
        backends: Vec<BackendEntry>,
    },
    /// Cloud API wrapper.
    Devices {
        /// Entries.
        devices: Vec<BackendEntry>,
    },
}

/// One entry of a backend listing: a name, or an object with a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BackendEntry {
    /// Bare name.
    Name(String),
    /// Object carrying a `name` field.
    Object {
        /// Backend name.
        #[serde(default)]
        name: Option<String>,
    },
    /// Anything else; ignored.
    Other(Value),
}

impl BackendsListing {
    /// Non-empty names in listing order, first occurrence kept.
    pub fn into_names(self) -> Vec<String> {
        let entries = match self {
            BackendsListing::Bare(entries)
            | BackendsListing::Wrapped { backends: entries }
            | BackendsListing::Devices { devices: entries } => entries,
        };

        let mut names: Vec<String> = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = match entry {
                BackendEntry::Name(name) => Some(name),
                BackendEntry::Object { name } => name,
                BackendEntry::Other(_) => None,
            };
            if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// `/backends/{name}/status` response.
///
/// Older deployments report `pending_jobs`/`operational`; the Cloud API
/// reports `length_queue`/`state`. Either pair is accepted.
#[derive(Debug, Default, Deserialize)]
pub struct BackendStatusResponse {
    /// Queue length (legacy name).
    #[serde(default)]
    pub pending_jobs: Option<u64>,
    /// Operational flag (legacy name).
    #[serde(default)]
    pub operational: Option<bool>,
    /// Queue length (Cloud API name).
    #[serde(default)]
    pub length_queue: Option<u64>,
    /// Operational flag (Cloud API name).
    #[serde(default)]
    pub state: Option<bool>,
}

impl BackendStatusResponse {
    /// Queue length from whichever field is present.
    pub fn queue_length(&self) -> Option<u64> {
        self.pending_jobs.or(self.length_queue)
    }

    /// Operational flag from whichever field is present.
    pub fn is_operational(&self) -> Option<bool> {
        self.operational.or(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path_display() {
        let path = ApiPath::new(["jobs"])
            .query("pending", true)
            .query("limit", 200)
            .query("sort", "DESC");
        assert_eq!(path.to_string(), "/jobs?pending=true&limit=200&sort=DESC");
    }

    #[test]
    fn test_api_path_url_encodes_segments() {
        let path = ApiPath::new(["backends", "ibm test/1", "status"]);
        let url = path
            .to_url("https://quantum.cloud.ibm.com/api/v1/")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://quantum.cloud.ibm.com/api/v1/backends/ibm%20test%2F1/status"
        );
    }

    #[test]
    fn test_api_path_url_with_query() {
        let path = ApiPath::new(["jobs"]).query("pending", false);
        let url = path.to_url("https://quantum.cloud.ibm.com/api/v1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://quantum.cloud.ibm.com/api/v1/jobs?pending=false"
        );
    }

    #[test]
    fn test_raw_job_direct_status() {
        let json = r#"{
            "id": "d1",
            "backend": "ibm_kyoto",
            "status": "Running",
            "state": {"status": "Queued"},
            "created": "2025-03-01T12:00:00Z",
            "program": {"id": "sampler"},
            "usage": {"seconds": 4.5},
            "tags": ["a", "b", "a"],
            "session_id": "s1",
            "private": true,
            "cost": 0
        }"#;
        let raw: RawJob = serde_json::from_str(json).unwrap();
        let job = Job::from(raw);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.program_id.as_deref(), Some("sampler"));
        assert_eq!(job.usage_seconds, Some(4.5));
        assert_eq!(job.tags.len(), 2);
        assert_eq!(job.is_private, Some(true));
        assert_eq!(job.cost, Some(0.0));
        assert!(job.created_at.is_some());
    }

    #[test]
    fn test_raw_job_nested_state_only() {
        let json = r#"{"id": "d2", "backend": "ibm_fez",
            "state": {"status": "Failed", "reason": "circuit too deep"},
            "created": "not a date"}"#;
        let job = Job::from(serde_json::from_str::<RawJob>(json).unwrap());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.status_reason.as_deref(), Some("circuit too deep"));
        assert!(job.created_at.is_none());
    }

    #[test]
    fn test_raw_job_no_status_is_unknown() {
        let job = Job::from(serde_json::from_str::<RawJob>(r#"{"id": "d3"}"#).unwrap());
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(job.backend.is_empty());
    }

    #[test]
    fn test_jobs_page_with_null_tags_decodes() {
        let body = serde_json::json!({"jobs": [
            {"id": "n1", "backend": "ibm_fez", "status": "Queued", "tags": null},
            {"id": "n2", "backend": "ibm_fez", "status": "Queued", "tags": ["x"]}
        ]});
        let page: JobsResponse = serde_json::from_value(body).unwrap();
        let jobs: Vec<Job> = page.jobs.into_iter().map(Job::from).collect();
        assert!(jobs[0].tags.is_empty());
        assert_eq!(jobs[1].tags.len(), 1);
    }

    #[test]
    fn test_jobs_page_with_null_backend_decodes() {
        let body = serde_json::json!({"jobs": [
            {"id": "n3", "backend": null, "status": "Running"}
        ]});
        let page: JobsResponse = serde_json::from_value(body).unwrap();
        let job = Job::from(page.jobs.into_iter().next().unwrap());
        assert_eq!(job.backend, "");
        assert_eq!(job.status, JobStatus::Running);
    }

    #[test]
    fn test_jobs_page_with_empty_program_decodes() {
        let body = serde_json::json!({"jobs": [
            {"id": "n4", "backend": "ibm_kyoto", "status": "Completed", "program": {}},
            {"id": "n5", "backend": "ibm_kyoto", "status": "Completed", "program": {"id": null}}
        ]});
        let page: JobsResponse = serde_json::from_value(body).unwrap();
        let jobs: Vec<Job> = page.jobs.into_iter().map(Job::from).collect();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.program_id.is_none()));
    }

    #[test]
    fn test_jobs_response_missing_jobs_is_empty() {
        let resp: JobsResponse = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(resp.jobs.is_empty());
    }

    #[test]
    fn test_backends_listing_bare_names() {
        let listing: BackendsListing =
            serde_json::from_str(r#"["ibm_fez", "ibm_torino"]"#).unwrap();
        assert_eq!(listing.into_names(), vec!["ibm_fez", "ibm_torino"]);
    }

    #[test]
    fn test_backends_listing_wrapped_mixed() {
        let listing: BackendsListing = serde_json::from_str(
            r#"{"backends": ["ibm_fez", {"name": "ibm_kyoto"}, {"qubits": 5}, "", "ibm_fez"]}"#,
        )
        .unwrap();
        assert_eq!(listing.into_names(), vec!["ibm_fez", "ibm_kyoto"]);
    }

    #[test]
    fn test_backends_listing_devices() {
        let json = r#"{"devices": [
            {"name": "ibm_fez", "status": {"name": "online"}},
            {"name": "ibm_marrakesh", "status": {"name": "online"}}
        ]}"#;
        let listing: BackendsListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.into_names(), vec!["ibm_fez", "ibm_marrakesh"]);
    }

    #[test]
    fn test_backend_status_legacy_fields() {
        let s: BackendStatusResponse =
            serde_json::from_str(r#"{"pending_jobs": 7, "operational": false}"#).unwrap();
        assert_eq!(s.queue_length(), Some(7));
        assert_eq!(s.is_operational(), Some(false));
    }

    #[test]
    fn test_backend_status_cloud_fields() {
        let s: BackendStatusResponse = serde_json::from_str(
            r#"{"state": true, "status": "active", "message": "ready", "length_queue": 12}"#,
        )
        .unwrap();
        assert_eq!(s.queue_length(), Some(12));
        assert_eq!(s.is_operational(), Some(true));
    }

    #[test]
    fn test_backend_status_empty_object() {
        let s: BackendStatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(s.queue_length(), None);
        assert_eq!(s.is_operational(), None);
    }
}
