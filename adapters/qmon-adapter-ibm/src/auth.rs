//! IAM bearer token lifecycle.
//!
//! IBM Quantum Cloud does not accept the API key directly. It is exchanged
//! at the IBM Cloud IAM endpoint for a bearer token that lives roughly one
//! hour. [`TokenManager`] caches that token and re-acquires it when it is
//! missing, invalidated, or about to expire.
//!
//! Acquisition is single-flight: concurrent callers that find no usable
//! token queue on one async mutex, and everyone after the first reuses the
//! token it obtained.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use qmon_core::{CredentialStore, Credentials, MonitorConfig};

use crate::error::{IbmError, IbmResult};

/// Grant type for exchanging an IBM Cloud API key.
pub const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Lifetime assumed when IAM does not report one.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A bearer token obtained from IAM.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    obtained_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Create a token from its parts.
    pub fn new(value: impl Into<String>, obtained_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            obtained_at,
            expires_at,
        }
    }

    /// Raw bearer value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the token was obtained.
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// When the token stops being accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Already expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Expires within `buffer` from now.
    pub fn expires_within(&self, buffer: Duration) -> bool {
        let buffer = chrono::Duration::from_std(buffer).unwrap_or(chrono::Duration::zero());
        Utc::now() + buffer >= self.expires_at
    }
}

/// IAM token response from `iam.cloud.ibm.com`.
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry as a Unix timestamp.
    #[serde(default)]
    expiration: Option<i64>,
}

impl IamTokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Token {
        let expires_at = self
            .expiration
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|s| now + chrono::Duration::seconds(s)))
            .unwrap_or_else(|| now + chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        Token::new(self.access_token, now, expires_at)
    }
}

/// Exchanges the API key for bearer tokens and caches the result.
pub struct TokenManager {
    client: Client,
    iam_url: String,
    refresh_buffer: Duration,
    credentials: Arc<dyn CredentialStore>,
    cached: RwLock<Option<Token>>,
    acquiring: Mutex<()>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("iam_url", &self.iam_url)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a token manager reading the API key from `credentials`.
    pub fn new(config: &MonitorConfig, credentials: Arc<dyn CredentialStore>) -> IbmResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            iam_url: config.iam_token_url.clone(),
            refresh_buffer: Duration::from_secs(config.token_refresh_buffer_secs),
            credentials,
            cached: RwLock::new(None),
            acquiring: Mutex::new(()),
        })
    }

    /// A usable bearer token, acquiring one first if needed.
    pub async fn token(&self) -> IbmResult<Token> {
        if let Some(token) = self.usable_cached() {
            return Ok(token);
        }

        let _guard = self.acquiring.lock().await;
        // Another caller may have finished an exchange while we waited.
        if let Some(token) = self.usable_cached() {
            return Ok(token);
        }

        let credentials = self.credentials.get()?.ok_or(IbmError::MissingApiKey)?;
        self.exchange(&credentials).await
    }

    /// Force a fresh exchange for `credentials`, replacing any cached token.
    pub async fn acquire_token(&self, credentials: &Credentials) -> IbmResult<Token> {
        let _guard = self.acquiring.lock().await;
        self.exchange(credentials).await
    }

    /// Force a fresh exchange using the stored credentials.
    pub async fn refresh(&self) -> IbmResult<Token> {
        let credentials = self.credentials.get()?.ok_or(IbmError::MissingApiKey)?;
        self.acquire_token(&credentials).await
    }

    /// Drop the cached token; the next call re-acquires.
    pub fn invalidate(&self) {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        if cached.take().is_some() {
            tracing::debug!("bearer token invalidated");
        }
    }

    /// A non-expired token is cached.
    pub fn is_ready(&self) -> bool {
        self.cached_token().is_some_and(|t| !t.is_expired())
    }

    /// The cached token, usable or not.
    pub fn cached_token(&self) -> Option<Token> {
        self.cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn usable_cached(&self) -> Option<Token> {
        self.cached_token()
            .filter(|t| !t.expires_within(self.refresh_buffer))
    }

    async fn exchange(&self, credentials: &Credentials) -> IbmResult<Token> {
        if !credentials.has_api_key() {
            return Err(IbmError::MissingApiKey);
        }

        tracing::debug!("exchanging API key at {}", self.iam_url);
        let params = [
            ("grant_type", APIKEY_GRANT_TYPE),
            ("apikey", credentials.api_key.trim()),
        ];

        let response = self
            .client
            .post(&self.iam_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(IbmError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let iam: IamTokenResponse = response.json().await.map_err(|e| {
            IbmError::IamTokenExchange(format!("failed to parse IAM response: {e}"))
        })?;

        let token = iam.into_token(Utc::now());
        tracing::info!("acquired IAM bearer token (expires {})", token.expires_at());

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(token.clone());
        Ok(token)
    }
}
