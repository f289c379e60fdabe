//! Provider credentials and the stores that hold them.
//!
//! A [`CredentialStore`] is injected wherever credentials are needed, so the
//! backing (in-process memory, a per-session cache file, an external secret
//! manager) can be swapped without touching the token or request layers.
//!
//! ```ignore
//! use qmon_core::{Credentials, CredentialStore, MemoryCredentialStore};
//!
//! let store = MemoryCredentialStore::new();
//! store.set(&Credentials::new("api-key", "crn:v1:...", "us-east"))?;
//! assert!(store.get()?.is_some_and(|c| c.is_complete()));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Long-lived credentials for the provider API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// IBM Cloud API key, exchanged for bearer tokens.
    pub api_key: String,
    /// Service instance identifier, sent as the `Service-CRN` header.
    pub instance_id: String,
    /// Provider region (informational).
    #[serde(default = "default_region")]
    pub region: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("instance_id", &self.instance_id)
            .field("region", &self.region)
            .finish()
    }
}

impl Credentials {
    /// Create a new credential set.
    pub fn new(
        api_key: impl Into<String>,
        instance_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let region = region.into();
        Self {
            api_key: api_key.into(),
            instance_id: instance_id.into(),
            region: if region.trim().is_empty() {
                default_region()
            } else {
                region
            },
        }
    }

    /// Whether an API key is present.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Whether an instance identifier is present.
    pub fn has_instance(&self) -> bool {
        !self.instance_id.trim().is_empty()
    }

    /// Both the API key and the instance identifier are non-empty.
    ///
    /// No authenticated call may be attempted before this holds.
    pub fn is_complete(&self) -> bool {
        self.has_api_key() && self.has_instance()
    }
}

/// Storage for the current credential set.
pub trait CredentialStore: Send + Sync {
    /// Current credentials, if any have been stored.
    fn get(&self) -> CoreResult<Option<Credentials>>;

    /// Replace the stored credentials.
    fn set(&self, credentials: &Credentials) -> CoreResult<()>;

    /// Remove any stored credentials.
    fn clear(&self) -> CoreResult<()>;
}

/// In-process credential store. Nothing outlives the process.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> CoreResult<Option<Credentials>> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn set(&self, credentials: &Credentials) -> CoreResult<()> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

/// Session cache backed by a JSON file readable only by the current user.
///
/// Survives process restarts within a session; `clear` deletes the file.
#[derive(Debug, Clone)]
pub struct SessionFileStore {
    path: PathBuf,
}

impl SessionFileStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the user cache directory, keyed by session name.
    ///
    /// Falls back to the system temp directory when no cache directory is
    /// known, so the file never lands relative to the working directory.
    pub fn for_session(session: &str) -> Self {
        Self::new(session_path(dirs::cache_dir(), session))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn session_path(cache_dir: Option<PathBuf>, session: &str) -> PathBuf {
    let base = cache_dir.unwrap_or_else(|| {
        let fallback = std::env::temp_dir();
        tracing::warn!(
            "no user cache directory; keeping session credentials under {}",
            fallback.display()
        );
        fallback
    });
    base.join("qmon").join(format!("session-{session}.json"))
}

impl CredentialStore for SessionFileStore {
    fn get(&self) -> CoreResult<Option<Credentials>> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                tracing::warn!(
                    "ignoring unreadable session cache {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn set(&self, credentials: &Credentials) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(credentials)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
