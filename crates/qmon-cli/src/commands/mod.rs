//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod jobs;
pub mod session;
pub mod token;
pub mod watch;
