//! OAuth access token handling.
//!
//! DriveDupe does not run the interactive consent flow. It reads an
//! authorized-user token file (the JSON layout written by Google's client
//! libraries: `token`, `refresh_token`, `token_uri`, `client_id`,
//! `client_secret`, `expiry`), refreshes the access token when it has
//! expired, and writes the refreshed token back so the next run can reuse it.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors while loading or refreshing credentials.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// The token file could not be read or written.
    #[error("token file I/O error for {path}: {source}")]
    Io {
        /// Token file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The token file is not valid JSON in the expected layout.
    #[error("invalid token file {path}: {source}")]
    Parse {
        /// Token file path
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// No token file exists at the configured path.
    #[error("no token file at {0} - authorize once and save the token there, or set DRIVEDUPE_ACCESS_TOKEN")]
    MissingToken(PathBuf),

    /// The access token expired and cannot be refreshed.
    #[error("access token expired and no refresh credentials are available")]
    Expired,

    /// The token endpoint rejected the refresh request.
    #[error("token refresh failed with HTTP {status}: {message}")]
    RefreshFailed {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The refresh request could not be sent.
    #[error("token refresh request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Persisted authorized-user credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Current access token
    #[serde(rename = "token", alias = "access_token")]
    pub access_token: String,
    /// Long-lived refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Endpoint used for refreshing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    /// OAuth client id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth client secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Granted scopes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Access token expiry; `None` means unknown (assumed valid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// A bare access token without refresh credentials.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes: Vec::new(),
            expiry: None,
        }
    }

    /// Whether the access token should be considered expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS))
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Source of bearer tokens for the HTTP client.
///
/// Holds the current token in memory and persists refreshed tokens to the
/// file it was loaded from.
#[derive(Debug)]
pub struct TokenStore {
    token: RefCell<StoredToken>,
    path: Option<PathBuf>,
    http: reqwest::blocking::Client,
}

impl TokenStore {
    /// Load credentials from a token file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` if the file does not exist, or an
    /// I/O or parse error.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        if !path.exists() {
            return Err(AuthError::MissingToken(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let token: StoredToken =
            serde_json::from_str(&content).map_err(|source| AuthError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Loaded token from {}", path.display());

        Ok(Self {
            token: RefCell::new(token),
            path: Some(path.to_path_buf()),
            http: Self::http_client()?,
        })
    }

    /// Use a fixed token that is never persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for refreshes cannot be built.
    pub fn in_memory(token: StoredToken) -> Result<Self, AuthError> {
        Ok(Self {
            token: RefCell::new(token),
            path: None,
            http: Self::http_client()?,
        })
    }

    fn http_client() -> Result<reqwest::blocking::Client, AuthError> {
        Ok(reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?)
    }

    /// A valid access token, refreshing it first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` if the token expired and cannot be
    /// refreshed, or the refresh error.
    pub fn access_token(&self) -> Result<String, AuthError> {
        let expired = self.token.borrow().is_expired_at(Utc::now());
        if expired {
            self.refresh()?;
        }
        Ok(self.token.borrow().access_token.clone())
    }

    /// Force a refresh using the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` without refresh credentials, or the
    /// request/endpoint error.
    pub fn refresh(&self) -> Result<(), AuthError> {
        let current = self.token.borrow().clone();
        if !current.can_refresh() {
            return Err(AuthError::Expired);
        }
        let token_uri = current
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        log::debug!("Refreshing access token via {}", token_uri);
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", current.refresh_token.as_deref().unwrap_or_default()),
            ("client_id", current.client_id.as_deref().unwrap_or_default()),
            ("client_secret", current.client_secret.as_deref().unwrap_or_default()),
        ];
        let response = self.http.post(&token_uri).form(&form).send()?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AuthError::RefreshFailed {
                status: status.as_u16(),
                message,
            });
        }
        let refreshed: RefreshResponse = response.json()?;

        let mut token = self.token.borrow_mut();
        token.access_token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        log::info!("Access token refreshed");

        if let Some(path) = &self.path {
            if let Err(e) = save_token(path, &token) {
                // The refreshed token still works for this run.
                log::warn!("Failed to save refreshed token: {}", e);
            }
        }
        Ok(())
    }

    /// Refresh against `token_uri` when the token file does not name an endpoint.
    #[must_use]
    pub fn with_default_token_uri(self, token_uri: &str) -> Self {
        self.token
            .borrow_mut()
            .token_uri
            .get_or_insert_with(|| token_uri.to_string());
        self
    }

    /// A copy of the current token.
    #[must_use]
    pub fn current(&self) -> StoredToken {
        self.token.borrow().clone()
    }
}

/// Write `token` to `path` as pretty JSON.
///
/// # Errors
///
/// Returns `AuthError::Io` if the file cannot be written.
pub fn save_token(path: &Path, token: &StoredToken) -> Result<(), AuthError> {
    let io_err = |source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(token).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}
