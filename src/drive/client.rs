//! HTTP client for the Google Drive v3 REST API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::auth::TokenStore;
use super::{
    folder_query_string, DriveBackend, DriveError, FileQuery, FilePage, FileRecord, FolderEntry,
};

/// Default API root.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Maximum page size accepted by the files.list endpoint.
pub const MAX_PAGE_SIZE: u32 = 1000;

const FILE_FIELDS: &str = "nextPageToken, files(id, name, size, modifiedTime, md5Checksum, parents)";
const FOLDER_FIELDS: &str = "nextPageToken, files(id, name)";

/// Connection settings for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct DriveClientConfig {
    /// API root, e.g. `https://www.googleapis.com/drive/v3`
    pub base_url: String,
    /// Items requested per page (clamped to 1..=1000)
    pub page_size: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for DriveClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(60),
        }
    }
}

impl DriveClientConfig {
    /// Use a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    files: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Storage backend talking to the Drive API over HTTPS.
#[derive(Debug)]
pub struct DriveClient {
    http: Client,
    config: DriveClientConfig,
    tokens: TokenStore,
}

impl DriveClient {
    /// Create a client authorized by `tokens`.
    ///
    /// # Errors
    ///
    /// Returns `DriveError::Request` if the HTTP client cannot be built.
    pub fn new(config: DriveClientConfig, tokens: TokenStore) -> Result<Self, DriveError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.config.base_url)
    }

    /// Send a request built by `build`, refreshing the token once on 401.
    fn send_authorized<F>(&self, build: F) -> Result<Response, DriveError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.tokens.access_token()?;
        let response = build(&self.http).bearer_auth(&token).send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::debug!("Got 401, refreshing access token and retrying once");
        self.tokens.refresh()?;
        let token = self.tokens.access_token()?;
        Ok(build(&self.http).bearer_auth(&token).send()?)
    }

    /// Turn an error status into a `DriveError`, passing successes through.
    fn check_status(response: Response) -> Result<Response, DriveError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            Err(DriveError::NotFound(message))
        } else {
            Err(DriveError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn list_page<T: DeserializeOwned>(
        &self,
        query: &str,
        fields: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage<T>, DriveError> {
        let url = self.files_url();
        let page_size = self.config.page_size.to_string();
        let response = self.send_authorized(|http| {
            let mut params: Vec<(&str, &str)> = vec![
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("fields", fields),
            ];
            if let Some(token) = page_token {
                params.push(("pageToken", token));
            }
            http.get(&url).query(&params)
        })?;

        let list: ListResponse<T> = Self::check_status(response)?
            .json()
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;
        Ok(FilePage {
            items: list.files,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

impl DriveBackend for DriveClient {
    fn list_files_page(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
    ) -> Result<FilePage<FileRecord>, DriveError> {
        self.list_page(&query.to_query_string(), FILE_FIELDS, page_token)
    }

    fn list_folders_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage<FolderEntry>, DriveError> {
        self.list_page(&folder_query_string(parent_id), FOLDER_FIELDS, page_token)
    }

    fn trash_file(&self, file_id: &str) -> Result<(), DriveError> {
        let url = format!("{}/{}", self.files_url(), urlencoding::encode(file_id));
        let response = self.send_authorized(|http| {
            http.patch(&url)
                .query(&[("fields", "id,trashed")])
                .json(&serde_json::json!({ "trashed": true }))
        })?;
        Self::check_status(response)?;
        Ok(())
    }
}
