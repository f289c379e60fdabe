//! Error types for the IBM Quantum adapter.

use thiserror::Error;

use qmon_core::CoreError;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when talking to IBM Quantum.
#[derive(Debug, Error)]
pub enum IbmError {
    /// No API key configured.
    #[error("IBM Cloud API key not set. Pass --api-key or set IBM_API_KEY.")]
    MissingApiKey,

    /// No service instance configured.
    #[error("IBM service CRN not set. Pass --service-crn or set IBM_SERVICE_CRN.")]
    MissingServiceCrn,

    /// IAM rejected the API key or returned an unusable response.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// The provider API answered with a non-2xx status.
    #[error("{path} → {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path (without the API root).
        path: String,
        /// Response body, if any.
        message: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header or URL could not be built from configured values.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Credential store failure.
    #[error("Credential store error: {0}")]
    Credentials(#[from] CoreError),
}

impl IbmError {
    /// Authentication-class failure (missing key, IAM rejection, HTTP 401/403).
    pub fn is_auth(&self) -> bool {
        match self {
            IbmError::MissingApiKey
            | IbmError::MissingServiceCrn
            | IbmError::IamTokenExchange(_) => true,
            IbmError::Status { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }

    /// HTTP status code, for `Status` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            IbmError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_display() {
        let err = IbmError::MissingApiKey;
        assert!(err.to_string().contains("IBM_API_KEY"));
        assert!(err.is_auth());
    }

    #[test]
    fn test_missing_service_crn_display() {
        let err = IbmError::MissingServiceCrn;
        assert!(err.to_string().contains("IBM_SERVICE_CRN"));
        assert!(err.is_auth());
    }

    #[test]
    fn test_iam_token_exchange_display() {
        let err = IbmError::IamTokenExchange("IAM returned 400".into());
        assert!(err.to_string().contains("IAM returned 400"));
        assert!(err.is_auth());
    }

    #[test]
    fn test_status_display_and_code() {
        let err = IbmError::Status {
            status: 500,
            path: "/jobs?pending=false".into(),
            message: "boom".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/jobs?pending=false"));
        assert!(msg.contains("500"));
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_auth());
    }

    #[test]
    fn test_unauthorized_status_is_auth() {
        let err = IbmError::Status {
            status: 401,
            path: "/jobs".into(),
            message: String::new(),
        };
        assert!(err.is_auth());
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = IbmError::InvalidParameter("invalid Service-CRN value".into());
        assert!(err.to_string().contains("invalid Service-CRN value"));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_core_error_conversion() {
        let err: IbmError = CoreError::InvalidConfig("x".into()).into();
        assert!(matches!(err, IbmError::Credentials(_)));
    }
}
