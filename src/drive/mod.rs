//! Storage backend access for DriveDupe.
//!
//! This module provides functionality for:
//! - File metadata records as returned by the Drive v3 API
//! - The [`DriveBackend`] trait (paginated listing and trash)
//! - An HTTP implementation ([`client::DriveClient`])
//! - OAuth token loading and refresh ([`auth`])
//! - Lazy paginated listing with breadth-first folder traversal ([`lister`])
//! - An in-memory backend for tests and offline runs ([`memory`])
//!
//! # Example
//!
//! ```
//! use drivedupe::drive::{FileLister, ListScope, MemoryDrive, FileRecord};
//!
//! let drive = MemoryDrive::new();
//! drive.add_file(FileRecord::new("f1", "a.txt").with_checksum("abc"));
//!
//! let lister = FileLister::new(&drive);
//! let files: Vec<FileRecord> = lister
//!     .list_files(&ListScope::default())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(files.len(), 1);
//! ```

pub mod auth;
pub mod client;
pub mod lister;
pub mod memory;

use serde::{Deserialize, Deserializer, Serialize};

pub use auth::{AuthError, StoredToken, TokenStore};
pub use client::{DriveClient, DriveClientConfig};
pub use lister::{FileLister, ListScope, ListingCallback};
pub use memory::MemoryDrive;

/// MIME type the Drive API uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Metadata for a file in the storage account.
///
/// Records are immutable once fetched. Only `id` is guaranteed unique
/// within one scan; names repeat freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Backend file identifier
    pub id: String,
    /// Display name (not unique)
    #[serde(default)]
    pub name: String,
    /// Size in bytes. The API sends this as a decimal string.
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    /// Last modification time (RFC 3339, lexically sortable)
    #[serde(default)]
    pub modified_time: Option<String>,
    /// Content checksum, only present for files with retrievable content
    #[serde(default, rename = "md5Checksum")]
    pub checksum: Option<String>,
    /// Ids of the folders containing this file
    #[serde(default)]
    pub parents: Vec<String>,
}

impl FileRecord {
    /// Create a record with only an id and a name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: None,
            modified_time: None,
            checksum: None,
            parents: Vec::new(),
        }
    }

    /// Set the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the modification timestamp.
    #[must_use]
    pub fn with_modified_time(mut self, modified: impl Into<String>) -> Self {
        self.modified_time = Some(modified.into());
        self
    }

    /// Set the content checksum.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Add a parent folder id.
    #[must_use]
    pub fn with_parent(mut self, folder_id: impl Into<String>) -> Self {
        self.parents.push(folder_id.into());
        self
    }

    /// Size in bytes, treating a missing size as 0.
    #[must_use]
    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Modification time, treating a missing value as the empty string.
    ///
    /// The empty string sorts before every real timestamp.
    #[must_use]
    pub fn modified_or_empty(&self) -> &str {
        self.modified_time.as_deref().unwrap_or("")
    }

    /// The checksum, if present and non-empty.
    #[must_use]
    pub fn content_checksum(&self) -> Option<&str> {
        self.checksum.as_deref().filter(|c| !c.is_empty())
    }

    /// Check whether `folder_id` is one of this file's parents.
    #[must_use]
    pub fn is_in_folder(&self, folder_id: &str) -> bool {
        self.parents.iter().any(|p| p == folder_id)
    }
}

/// Accept the size either as a JSON string (as the API sends it) or a number.
/// Anything unparsable is treated as missing.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Text(String),
        Number(u64),
        Other(serde_json::Value),
    }

    Ok(match Option::<RawSize>::deserialize(deserializer)? {
        Some(RawSize::Text(s)) => s.trim().parse().ok(),
        Some(RawSize::Number(n)) => Some(n),
        Some(RawSize::Other(_)) | None => None,
    })
}

/// A folder as returned by subfolder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Folder identifier
    pub id: String,
    /// Folder name
    #[serde(default)]
    pub name: String,
}

impl FolderEntry {
    /// Create a new folder entry.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePage<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Cursor for the next page, `None` on the last page
    pub next_page_token: Option<String>,
}

impl<T> FilePage<T> {
    /// A final page holding `items`.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

/// Which non-folder, non-trashed files a listing call should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileQuery {
    /// Every file in the account
    AllFiles,
    /// Files directly inside one folder
    InFolder(String),
}

impl FileQuery {
    /// Render the query in the Drive search syntax.
    ///
    /// # Example
    ///
    /// ```
    /// use drivedupe::drive::FileQuery;
    ///
    /// let q = FileQuery::InFolder("abc".into()).to_query_string();
    /// assert!(q.ends_with("and 'abc' in parents"));
    /// ```
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let base = format!("mimeType != '{FOLDER_MIME_TYPE}' and trashed = false");
        match self {
            Self::AllFiles => base,
            Self::InFolder(id) => format!("{base} and '{}' in parents", escape_query_value(id)),
        }
    }
}

/// Query selecting the direct subfolders of `parent_id`.
#[must_use]
pub fn folder_query_string(parent_id: &str) -> String {
    format!(
        "'{}' in parents and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        escape_query_value(parent_id)
    )
}

/// Escape a literal for use inside single quotes in a Drive query.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Errors from the storage backend.
#[derive(thiserror::Error, Debug)]
pub enum DriveError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The file or folder does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Authorization could not be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl DriveError {
    /// Whether retrying the same call later could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Backend(_) => true,
            Self::InvalidResponse(_) | Self::NotFound(_) | Self::Auth(_) => false,
        }
    }
}

/// Primitive operations a storage backend must provide.
///
/// Pagination is exposed one page at a time; [`FileLister`] builds the lazy
/// multi-page and recursive listings on top of these calls.
pub trait DriveBackend {
    /// Fetch one page of files matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `DriveError` if the page cannot be fetched.
    fn list_files_page(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
    ) -> Result<FilePage<FileRecord>, DriveError>;

    /// Fetch one page of the direct subfolders of `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `DriveError` if the page cannot be fetched.
    fn list_folders_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage<FolderEntry>, DriveError>;

    /// Move a file to the trash.
    ///
    /// # Errors
    ///
    /// Returns `DriveError` if the backend rejects the call. Repeating the
    /// call is not guaranteed to be idempotent.
    fn trash_file(&self, file_id: &str) -> Result<(), DriveError>;
}

impl<B: DriveBackend + ?Sized> DriveBackend for &B {
    fn list_files_page(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
    ) -> Result<FilePage<FileRecord>, DriveError> {
        (**self).list_files_page(query, page_token)
    }

    fn list_folders_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage<FolderEntry>, DriveError> {
        (**self).list_folders_page(parent_id, page_token)
    }

    fn trash_file(&self, file_id: &str) -> Result<(), DriveError> {
        (**self).trash_file(file_id)
    }
}
