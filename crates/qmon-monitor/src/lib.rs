//! Polling and session management for the qmon job monitor.
//!
//! [`MonitorSession`] ties the credential store, the IBM adapter and the
//! [`PollScheduler`] together and exposes the derived [`DashboardView`]
//! consumed by the presentation layer.
//!
//! ```ignore
//! use std::sync::Arc;
//! use qmon_core::{FilterCriteria, MonitorConfig, SessionFileStore};
//! use qmon_monitor::MonitorSession;
//!
//! let store = Arc::new(SessionFileStore::for_session("default"));
//! let session = MonitorSession::new(&MonitorConfig::default(), store)?;
//! session.establish().await?;
//! let view = session.dashboard(&FilterCriteria::default()).await;
//! println!("{} pending", view.pending.len());
//! ```

pub mod error;
pub mod scheduler;
pub mod session;

pub use error::{MonitorError, MonitorResult};
pub use scheduler::{PollScheduler, PollState, PollTarget};
pub use session::{DashboardView, MonitorSession, Snapshot};
