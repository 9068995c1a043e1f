//! In-memory storage backend.
//!
//! [`MemoryDrive`] implements [`DriveBackend`] over plain collections. It
//! paginates like the real API (configurable page size, opaque cursor),
//! hides trashed files from listings, and can be told to fail trash calls
//! for specific ids. Used by tests and for dry experiments against an
//! exported listing.

use std::cell::RefCell;
use std::collections::HashSet;

use super::{DriveBackend, DriveError, FileQuery, FilePage, FileRecord, FolderEntry};

#[derive(Debug, Default)]
struct State {
    files: Vec<FileRecord>,
    folders: Vec<(FolderEntry, String)>,
    trashed: HashSet<String>,
    failing: HashSet<String>,
    trash_calls: Vec<String>,
    page_requests: usize,
}

/// Storage backend held entirely in memory.
#[derive(Debug)]
pub struct MemoryDrive {
    state: RefCell<State>,
    page_size: usize,
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDrive {
    /// Create an empty drive with a page size of 1000.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// Create an empty drive returning at most `page_size` items per page.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RefCell::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Create a drive pre-populated with `files`.
    #[must_use]
    pub fn from_files(files: impl IntoIterator<Item = FileRecord>) -> Self {
        let drive = Self::new();
        for file in files {
            drive.add_file(file);
        }
        drive
    }

    /// Add a file.
    pub fn add_file(&self, file: FileRecord) {
        self.state.borrow_mut().files.push(file);
    }

    /// Add a folder under `parent_id`.
    pub fn add_folder(&self, folder: FolderEntry, parent_id: impl Into<String>) {
        self.state
            .borrow_mut()
            .folders
            .push((folder, parent_id.into()));
    }

    /// Make every trash call for `file_id` fail.
    pub fn fail_trash_for(&self, file_id: impl Into<String>) {
        self.state.borrow_mut().failing.insert(file_id.into());
    }

    /// Whether `file_id` has been trashed.
    #[must_use]
    pub fn is_trashed(&self, file_id: &str) -> bool {
        self.state.borrow().trashed.contains(file_id)
    }

    /// Ids passed to `trash_file`, in call order (including failed calls).
    #[must_use]
    pub fn trash_calls(&self) -> Vec<String> {
        self.state.borrow().trash_calls.clone()
    }

    /// Number of page requests served so far.
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.state.borrow().page_requests
    }

    fn paginate<T: Clone>(&self, items: Vec<T>, page_token: Option<&str>) -> Result<FilePage<T>, DriveError> {
        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DriveError::InvalidResponse(format!("bad page token: {token}")))?,
            None => 0,
        };
        let end = offset.saturating_add(self.page_size).min(items.len());
        let page: Vec<T> = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
        let next_page_token = (end < items.len()).then(|| end.to_string());
        Ok(FilePage {
            items: page,
            next_page_token,
        })
    }
}

impl DriveBackend for MemoryDrive {
    fn list_files_page(
        &self,
        query: &FileQuery,
        page_token: Option<&str>,
    ) -> Result<FilePage<FileRecord>, DriveError> {
        let matching: Vec<FileRecord> = {
            let mut state = self.state.borrow_mut();
            state.page_requests += 1;
            state
                .files
                .iter()
                .filter(|f| !state.trashed.contains(&f.id))
                .filter(|f| match query {
                    FileQuery::AllFiles => true,
                    FileQuery::InFolder(id) => f.is_in_folder(id),
                })
                .cloned()
                .collect()
        };
        self.paginate(matching, page_token)
    }

    fn list_folders_page(
        &self,
        parent_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage<FolderEntry>, DriveError> {
        let matching: Vec<FolderEntry> = {
            let mut state = self.state.borrow_mut();
            state.page_requests += 1;
            state
                .folders
                .iter()
                .filter(|(_, parent)| parent == parent_id)
                .map(|(folder, _)| folder.clone())
                .collect()
        };
        self.paginate(matching, page_token)
    }

    fn trash_file(&self, file_id: &str) -> Result<(), DriveError> {
        let mut state = self.state.borrow_mut();
        state.trash_calls.push(file_id.to_string());

        if state.failing.contains(file_id) {
            return Err(DriveError::Backend(format!("simulated failure for {file_id}")));
        }
        if !state.files.iter().any(|f| f.id == file_id) {
            return Err(DriveError::NotFound(file_id.to_string()));
        }
        state.trashed.insert(file_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_splits_pages() {
        let drive = MemoryDrive::with_page_size(2);
        for i in 0..5 {
            drive.add_file(FileRecord::new(format!("f{i}"), "x"));
        }

        let first = drive.list_files_page(&FileQuery::AllFiles, None).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let last = drive
            .list_files_page(&FileQuery::AllFiles, Some("4"))
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn test_page_token_past_the_end() {
        let drive = MemoryDrive::from_files([FileRecord::new("a", "a")]);
        let token = usize::MAX.to_string();

        let page = drive
            .list_files_page(&FileQuery::AllFiles, Some(&token))
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_trashed_files_are_hidden() {
        let drive = MemoryDrive::from_files([FileRecord::new("a", "a"), FileRecord::new("b", "b")]);
        drive.trash_file("a").unwrap();

        let page = drive.list_files_page(&FileQuery::AllFiles, None).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "b");
        assert!(drive.is_trashed("a"));
    }

    #[test]
    fn test_folder_scoped_listing() {
        let drive = MemoryDrive::from_files([
            FileRecord::new("a", "a").with_parent("F1"),
            FileRecord::new("b", "b").with_parent("F2"),
        ]);
        let page = drive
            .list_files_page(&FileQuery::InFolder("F2".into()), None)
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "b");
    }

    #[test]
    fn test_injected_trash_failure() {
        let drive = MemoryDrive::from_files([FileRecord::new("a", "a")]);
        drive.fail_trash_for("a");

        assert!(matches!(drive.trash_file("a"), Err(DriveError::Backend(_))));
        assert!(!drive.is_trashed("a"));
        assert_eq!(drive.trash_calls(), vec!["a".to_string()]);
    }

    #[test]
    fn test_trash_unknown_file() {
        let drive = MemoryDrive::new();
        assert!(matches!(
            drive.trash_file("missing"),
            Err(DriveError::NotFound(_))
        ));
    }
}
