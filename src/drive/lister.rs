//! Paginated file listing with optional breadth-first folder traversal.
//!
//! # Overview
//!
//! [`FileLister`] turns the page-at-a-time [`DriveBackend`] calls into a lazy
//! iterator of [`FileRecord`]s. Pages are fetched strictly one after another,
//! only when the previous page has been consumed.
//!
//! For a recursive scan the folder tree below the scope folder is discovered
//! first (breadth-first, FIFO queue), then every discovered folder is listed
//! in discovery order.
//!
//! # Example
//!
//! ```
//! use drivedupe::drive::{FileLister, FileRecord, FolderEntry, ListScope, MemoryDrive};
//!
//! let drive = MemoryDrive::new();
//! drive.add_folder(FolderEntry::new("sub", "Sub"), "root-folder");
//! drive.add_file(FileRecord::new("a", "a.txt").with_parent("root-folder"));
//! drive.add_file(FileRecord::new("b", "b.txt").with_parent("sub"));
//!
//! let lister = FileLister::new(&drive);
//! let scope = ListScope::folder("root-folder").recursive(true);
//! let ids: Vec<String> = lister
//!     .list_files(&scope)
//!     .map(|r| r.map(|f| f.id))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(ids, vec!["a", "b"]);
//! ```

use std::collections::{HashSet, VecDeque};

use super::{DriveBackend, DriveError, FileQuery, FileRecord, FolderEntry};

/// Which part of the account to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListScope {
    /// Restrict the listing to this folder. `None` lists the whole account.
    pub folder_id: Option<String>,
    /// Include files in all subfolders of `folder_id`.
    /// Has no effect without a folder: the whole account is already flat.
    pub recursive: bool,
}

impl ListScope {
    /// Scope covering a single folder.
    #[must_use]
    pub fn folder(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            recursive: false,
        }
    }

    /// Enable or disable recursive traversal.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Progress notifications during listing.
///
/// All methods have empty default implementations.
pub trait ListingCallback {
    /// Folder discovery finished with `count` folders to list (recursive scans only).
    fn on_folders_discovered(&self, _count: usize) {}

    /// A page was received; `files_so_far` counts every file yielded up to now.
    fn on_page(&self, _files_so_far: usize) {}

    /// Folder number `index` (1-based) of `total` was fully listed.
    fn on_folder_complete(&self, _index: usize, _total: usize, _files_so_far: usize) {}
}

/// Builds lazy listings on top of a [`DriveBackend`].
pub struct FileLister<'a, B: DriveBackend + ?Sized> {
    backend: &'a B,
    callback: Option<&'a dyn ListingCallback>,
}

impl<'a, B: DriveBackend + ?Sized> FileLister<'a, B> {
    /// Create a lister for `backend`.
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            callback: None,
        }
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_callback(mut self, callback: &'a dyn ListingCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Lazily list every file in `scope`.
    ///
    /// The iterator yields an error at most once and then ends: a partial
    /// listing must not be mistaken for a complete one.
    pub fn list_files(&self, scope: &ListScope) -> FileIter<'a, B> {
        FileIter {
            backend: self.backend,
            callback: self.callback,
            scope: scope.clone(),
            queries: None,
            total_queries: 0,
            completed_queries: 0,
            current: None,
            page_token: None,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            yielded: 0,
            finished: false,
        }
    }

    /// List the direct subfolders of `folder_id`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns the first `DriveError` encountered.
    pub fn list_subfolders(&self, folder_id: &str) -> Result<Vec<FolderEntry>, DriveError> {
        list_subfolders(self.backend, folder_id)
    }

    /// Discover `root` and all folders below it, breadth-first.
    ///
    /// # Errors
    ///
    /// Returns the first `DriveError` encountered.
    pub fn folder_tree(&self, root: &str) -> Result<Vec<String>, DriveError> {
        folder_tree(self.backend, root)
    }
}

fn list_subfolders<B: DriveBackend + ?Sized>(
    backend: &B,
    folder_id: &str,
) -> Result<Vec<FolderEntry>, DriveError> {
    let mut folders = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = backend.list_folders_page(folder_id, page_token.as_deref())?;
        folders.extend(page.items);
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    Ok(folders)
}

fn folder_tree<B: DriveBackend + ?Sized>(backend: &B, root: &str) -> Result<Vec<String>, DriveError> {
    let mut all = vec![root.to_string()];
    let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
    let mut queue: VecDeque<String> = VecDeque::from([root.to_string()]);

    while let Some(current) = queue.pop_front() {
        for folder in list_subfolders(backend, &current)? {
            // A folder may be reachable through several parents.
            if seen.insert(folder.id.clone()) {
                log::trace!("Discovered folder {} ({})", folder.name, folder.id);
                all.push(folder.id.clone());
                queue.push_back(folder.id);
            }
        }
    }

    log::info!("Found {} total folders to scan", all.len());
    Ok(all)
}

/// Lazy iterator returned by [`FileLister::list_files`].
pub struct FileIter<'a, B: DriveBackend + ?Sized> {
    backend: &'a B,
    callback: Option<&'a dyn ListingCallback>,
    scope: ListScope,
    queries: Option<VecDeque<FileQuery>>,
    total_queries: usize,
    completed_queries: usize,
    current: Option<FileQuery>,
    page_token: Option<String>,
    buffer: VecDeque<FileRecord>,
    /// Ids already yielded; a file with several parents in the tree is listed once per parent.
    seen: HashSet<String>,
    yielded: usize,
    finished: bool,
}

impl<B: DriveBackend + ?Sized> FileIter<'_, B> {
    fn plan_queries(&self) -> Result<VecDeque<FileQuery>, DriveError> {
        match (&self.scope.folder_id, self.scope.recursive) {
            (Some(root), true) => {
                log::info!("Starting recursive folder scan...");
                let folders = folder_tree(self.backend, root)?;
                if let Some(cb) = self.callback {
                    cb.on_folders_discovered(folders.len());
                }
                Ok(folders.into_iter().map(FileQuery::InFolder).collect())
            }
            (Some(folder), false) => Ok(VecDeque::from([FileQuery::InFolder(folder.clone())])),
            (None, _) => Ok(VecDeque::from([FileQuery::AllFiles])),
        }
    }

    /// Fetch pages until the buffer has something or every query is exhausted.
    fn fill_buffer(&mut self) -> Result<(), DriveError> {
        if self.queries.is_none() {
            let queries = self.plan_queries()?;
            self.total_queries = queries.len();
            self.queries = Some(queries);
        }

        while self.buffer.is_empty() {
            let query = match self.current.take() {
                Some(q) => q,
                None => match self.queries.as_mut().and_then(VecDeque::pop_front) {
                    Some(q) => q,
                    None => return Ok(()),
                },
            };

            let page = self
                .backend
                .list_files_page(&query, self.page_token.as_deref())?;
            self.buffer.extend(page.items);
            let files_so_far = self.yielded + self.buffer.len();
            log::debug!("Retrieved {} file's metadata so far...", files_so_far);
            if let Some(cb) = self.callback {
                cb.on_page(files_so_far);
            }

            match page.next_page_token {
                Some(token) => {
                    self.page_token = Some(token);
                    self.current = Some(query);
                }
                None => {
                    self.page_token = None;
                    self.completed_queries += 1;
                    if self.scope.recursive && self.scope.folder_id.is_some() {
                        log::info!(
                            "Scanned folder {} of {}. Total files found: {}",
                            self.completed_queries,
                            self.total_queries,
                            files_so_far
                        );
                    }
                    if let Some(cb) = self.callback {
                        cb.on_folder_complete(
                            self.completed_queries,
                            self.total_queries,
                            files_so_far,
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl<B: DriveBackend + ?Sized> Iterator for FileIter<'_, B> {
    type Item = Result<FileRecord, DriveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if self.buffer.is_empty() {
                if let Err(e) = self.fill_buffer() {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
            let Some(file) = self.buffer.pop_front() else {
                self.finished = true;
                return None;
            };
            if !self.seen.insert(file.id.clone()) {
                log::trace!("Skipping repeated listing of {} ({})", file.name, file.id);
                continue;
            }
            self.yielded += 1;
            return Some(Ok(file));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{FilePage, MemoryDrive};
    use std::cell::Cell;

    fn ids(lister: &FileLister<'_, MemoryDrive>, scope: &ListScope) -> Vec<String> {
        lister
            .list_files(scope)
            .map(|r| r.unwrap().id)
            .collect()
    }

    #[test]
    fn test_lists_all_pages() {
        let drive = MemoryDrive::with_page_size(3);
        for i in 0..10 {
            drive.add_file(FileRecord::new(format!("f{i}"), "x"));
        }
        let lister = FileLister::new(&drive);
        let got = ids(&lister, &ListScope::default());

        assert_eq!(got.len(), 10);
        assert_eq!(got[0], "f0");
        assert_eq!(got[9], "f9");
        assert_eq!(drive.page_requests(), 4);
    }

    #[test]
    fn test_listing_is_lazy() {
        let drive = MemoryDrive::with_page_size(2);
        for i in 0..6 {
            drive.add_file(FileRecord::new(format!("f{i}"), "x"));
        }
        let lister = FileLister::new(&drive);
        let first: Vec<_> = lister.list_files(&ListScope::default()).take(2).collect();

        assert_eq!(first.len(), 2);
        assert_eq!(drive.page_requests(), 1);
    }

    #[test]
    fn test_empty_account() {
        let drive = MemoryDrive::new();
        let lister = FileLister::new(&drive);
        assert!(ids(&lister, &ListScope::default()).is_empty());
    }

    #[test]
    fn test_non_recursive_folder_scope() {
        let drive = MemoryDrive::new();
        drive.add_folder(FolderEntry::new("sub", "Sub"), "top");
        drive.add_file(FileRecord::new("a", "a").with_parent("top"));
        drive.add_file(FileRecord::new("b", "b").with_parent("sub"));

        let lister = FileLister::new(&drive);
        assert_eq!(ids(&lister, &ListScope::folder("top")), vec!["a"]);
    }

    #[test]
    fn test_recursive_scan_is_breadth_first() {
        let drive = MemoryDrive::with_page_size(1);
        drive.add_folder(FolderEntry::new("s1", "S1"), "top");
        drive.add_folder(FolderEntry::new("s2", "S2"), "top");
        drive.add_folder(FolderEntry::new("s1a", "S1a"), "s1");
        drive.add_file(FileRecord::new("deep", "d").with_parent("s1a"));
        drive.add_file(FileRecord::new("in-s2", "c").with_parent("s2"));
        drive.add_file(FileRecord::new("in-s1", "b").with_parent("s1"));
        drive.add_file(FileRecord::new("in-top", "a").with_parent("top"));

        let lister = FileLister::new(&drive);
        assert_eq!(
            lister.folder_tree("top").unwrap(),
            vec!["top", "s1", "s2", "s1a"]
        );
        assert_eq!(
            ids(&lister, &ListScope::folder("top").recursive(true)),
            vec!["in-top", "in-s1", "in-s2", "deep"]
        );
    }

    #[test]
    fn test_folder_reachable_twice_listed_once() {
        let drive = MemoryDrive::new();
        drive.add_folder(FolderEntry::new("s1", "S1"), "top");
        drive.add_folder(FolderEntry::new("s2", "S2"), "top");
        drive.add_folder(FolderEntry::new("shared", "Shared"), "s1");
        drive.add_folder(FolderEntry::new("shared", "Shared"), "s2");

        let lister = FileLister::new(&drive);
        assert_eq!(
            lister.folder_tree("top").unwrap(),
            vec!["top", "s1", "s2", "shared"]
        );
    }

    #[test]
    fn test_file_with_two_parents_in_tree_listed_once() {
        let drive = MemoryDrive::new();
        drive.add_folder(FolderEntry::new("sub", "Sub"), "top");
        drive.add_file(
            FileRecord::new("only", "only.txt")
                .with_checksum("c1")
                .with_parent("top")
                .with_parent("sub"),
        );
        drive.add_file(FileRecord::new("other", "other.txt").with_parent("sub"));

        let lister = FileLister::new(&drive);
        let scope = ListScope::folder("top").recursive(true);
        assert_eq!(ids(&lister, &scope), vec!["only", "other"]);
    }

    #[test]
    fn test_recursive_without_folder_lists_everything() {
        let drive = MemoryDrive::from_files([
            FileRecord::new("a", "a").with_parent("x"),
            FileRecord::new("b", "b"),
        ]);
        let lister = FileLister::new(&drive);
        let scope = ListScope {
            folder_id: None,
            recursive: true,
        };
        assert_eq!(ids(&lister, &scope), vec!["a", "b"]);
    }

    struct FailingBackend;

    impl DriveBackend for FailingBackend {
        fn list_files_page(
            &self,
            _query: &FileQuery,
            page_token: Option<&str>,
        ) -> Result<FilePage<FileRecord>, DriveError> {
            match page_token {
                None => Ok(FilePage {
                    items: vec![FileRecord::new("a", "a")],
                    next_page_token: Some("next".into()),
                }),
                Some(_) => Err(DriveError::Http {
                    status: 500,
                    message: "boom".into(),
                }),
            }
        }

        fn list_folders_page(
            &self,
            _parent_id: &str,
            _page_token: Option<&str>,
        ) -> Result<FilePage<FolderEntry>, DriveError> {
            Ok(FilePage::last(Vec::new()))
        }

        fn trash_file(&self, _file_id: &str) -> Result<(), DriveError> {
            Ok(())
        }
    }

    #[test]
    fn test_page_failure_ends_listing_with_error() {
        let lister = FileLister::new(&FailingBackend);
        let results: Vec<_> = lister.list_files(&ListScope::default()).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DriveError::Http { status: 500, .. })));
    }

    #[derive(Default)]
    struct CountingCallback {
        pages: Cell<usize>,
        folders: Cell<usize>,
        completed: Cell<usize>,
    }

    impl ListingCallback for CountingCallback {
        fn on_folders_discovered(&self, count: usize) {
            self.folders.set(count);
        }
        fn on_page(&self, _files_so_far: usize) {
            self.pages.set(self.pages.get() + 1);
        }
        fn on_folder_complete(&self, _index: usize, _total: usize, _files_so_far: usize) {
            self.completed.set(self.completed.get() + 1);
        }
    }

    #[test]
    fn test_callback_receives_progress() {
        let drive = MemoryDrive::with_page_size(1);
        drive.add_folder(FolderEntry::new("s1", "S1"), "top");
        drive.add_file(FileRecord::new("a", "a").with_parent("top"));
        drive.add_file(FileRecord::new("b", "b").with_parent("top"));
        drive.add_file(FileRecord::new("c", "c").with_parent("s1"));

        let callback = CountingCallback::default();
        let lister = FileLister::new(&drive).with_callback(&callback);
        let count = lister
            .list_files(&ListScope::folder("top").recursive(true))
            .count();

        assert_eq!(count, 3);
        assert_eq!(callback.folders.get(), 2);
        assert_eq!(callback.completed.get(), 2);
        assert_eq!(callback.pages.get(), 3);
    }
}
