//! qmon core: the data model shared by every layer of the job monitor.
//!
//! - [`job`]: job snapshots and status resolution
//! - [`backend`]: best-effort backend status entries
//! - [`view`]: pure projections (filtering, option lists, aggregates)
//! - [`credentials`]: credentials and swappable credential stores
//! - [`config`]: layered monitor configuration

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod job;
pub mod view;

pub use backend::BackendStatus;
pub use config::{
    DEFAULT_API_ENDPOINT, DEFAULT_IAM_TOKEN_URL, MIN_POLL_INTERVAL_MS, MonitorConfig,
    POLL_PRESETS_MS, clamp_poll_interval,
};
pub use credentials::{
    CredentialStore, Credentials, DEFAULT_REGION, MemoryCredentialStore, SessionFileStore,
};
pub use error::{CoreError, CoreResult};
pub use job::{Job, JobCollection, JobId, JobStatus};
pub use view::{ALL, FilterCriteria, QueueDepth};
