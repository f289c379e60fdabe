//! qmon adapter for IBM Quantum Cloud.
//!
//! Read-only access to the job queue of an IBM Quantum Cloud instance via the
//! Quantum Cloud v1 REST API.
//!
//! # Authentication
//!
//! An IBM Cloud API key is exchanged at IAM for a short-lived bearer token
//! ([`TokenManager`]). Every API call also needs the service instance CRN:
//!
//! ```bash
//! export IBM_API_KEY="your-ibm-cloud-api-key"
//! export IBM_SERVICE_CRN="crn:v1:bluemix:public:quantum-computing:us-east:a/...::"
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qmon_adapter_ibm::{IbmClient, JobsFetcher};
//! use qmon_core::{Credentials, MemoryCredentialStore, MonitorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
//!         std::env::var("IBM_API_KEY")?,
//!         std::env::var("IBM_SERVICE_CRN")?,
//!         "us-east",
//!     )));
//!     let client = Arc::new(IbmClient::new(&MonitorConfig::default(), store)?);
//!     let jobs = JobsFetcher::new(client, 200).fetch_jobs().await?;
//!     println!("{} pending, {} recent", jobs.pending.len(), jobs.other.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod backends;
pub mod error;
pub mod jobs;

pub use api::{ApiPath, ApiTransport, IbmClient};
pub use auth::{Token, TokenManager};
pub use backends::{BackendStatusFetcher, DEFAULT_BACKEND_CAP};
pub use error::{IbmError, IbmResult};
pub use jobs::{DEFAULT_JOBS_LIMIT, JobsFetcher};
