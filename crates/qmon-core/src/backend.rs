//! Backend status snapshot.

use serde::{Deserialize, Serialize};

/// Best-effort status for one backend.
///
/// Both detail fields are optional: a backend whose status call failed is
/// still listed, with the details left unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    /// Backend name, unique within a listing.
    pub name: String,
    /// Jobs waiting in the backend queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_jobs: Option<u64>,
    /// Whether the backend accepts work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational: Option<bool>,
}

impl BackendStatus {
    /// Fully known status.
    pub fn new(name: impl Into<String>, pending_jobs: u64, operational: bool) -> Self {
        Self {
            name: name.into(),
            pending_jobs: Some(pending_jobs),
            operational: Some(operational),
        }
    }

    /// Entry whose details could not be fetched.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending_jobs: None,
            operational: None,
        }
    }

    /// Neither detail field is known.
    pub fn is_unknown(&self) -> bool {
        self.pending_jobs.is_none() && self.operational.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_entry() {
        let status = BackendStatus::unknown("ibm_kyoto");
        assert!(status.is_unknown());
        assert_eq!(status.name, "ibm_kyoto");
        assert!(!BackendStatus::new("ibm_fez", 3, true).is_unknown());
    }

    #[test]
    fn test_unknown_fields_are_omitted_when_serialized() {
        let json = serde_json::to_string(&BackendStatus::unknown("b2")).unwrap();
        assert_eq!(json, r#"{"name":"b2"}"#);
    }
}
