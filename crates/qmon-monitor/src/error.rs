//! Error handling for the monitor session.

use thiserror::Error;

use qmon_adapter_ibm::IbmError;
use qmon_core::CoreError;

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors surfaced by the monitor session.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Credentials are missing or incomplete.
    #[error("Credentials incomplete: an API key and a service CRN are both required")]
    IncompleteCredentials,

    /// Provider access failed.
    #[error(transparent)]
    Provider(#[from] IbmError),

    /// Credential store or configuration failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_credentials_display() {
        let err = MonitorError::IncompleteCredentials;
        assert!(err.to_string().contains("service CRN"));
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let err: MonitorError = IbmError::MissingApiKey.into();
        assert_eq!(err.to_string(), IbmError::MissingApiKey.to_string());
    }
}
