//! End-to-end duplicate scenarios against the in-memory backend.

use std::cell::RefCell;

use drivedupe::drive::{FileRecord, FolderEntry, MemoryDrive};
use drivedupe::duplicates::{
    AmbiguousPair, DuplicateFinder, MarkReason, PairDecision, ResolveRequest, ScanRequest,
    SelectionObserver,
};
use drivedupe::output::{TextOutput, NO_DUPLICATES_MESSAGE};

// =============================================================================
// Helper Functions
// =============================================================================

/// One group: A is oldest and smallest, B newest and largest.
fn three_copies() -> MemoryDrive {
    MemoryDrive::from_files([
        FileRecord::new("A", "a.bin")
            .with_checksum("m")
            .with_size(100)
            .with_modified_time("2023-01-01T00:00:00Z"),
        FileRecord::new("B", "b.bin")
            .with_checksum("m")
            .with_size(200)
            .with_modified_time("2023-03-01T00:00:00Z"),
        FileRecord::new("C", "c.bin")
            .with_checksum("m")
            .with_size(150)
            .with_modified_time("2023-02-01T00:00:00Z"),
    ])
}

fn removal_ids(drive: &MemoryDrive, request: &ResolveRequest) -> Vec<String> {
    let report = DuplicateFinder::new(drive).plan(request).unwrap();
    let mut ids: Vec<String> = report.removal.ids().map(str::to_string).collect();
    ids.sort();
    ids
}

#[derive(Default)]
struct RecordingObserver {
    warnings: RefCell<Vec<String>>,
    marked: RefCell<Vec<(String, MarkReason)>>,
}

impl SelectionObserver for RecordingObserver {
    fn on_marked(&self, file: &FileRecord, reason: &MarkReason) {
        self.marked.borrow_mut().push((file.id.clone(), reason.clone()));
    }

    fn on_warning(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

// =============================================================================
// Batch selection
// =============================================================================

#[test]
fn test_keep_oldest_marks_newer_copies() {
    let drive = three_copies();
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("oldest");
    assert_eq!(removal_ids(&drive, &request), vec!["B", "C"]);
}

#[test]
fn test_keep_largest_marks_smaller_copies() {
    let drive = three_copies();
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("largest");
    assert_eq!(removal_ids(&drive, &request), vec!["A", "C"]);
}

#[test]
fn test_strategy_names_accept_dashes_and_case() {
    let drive = three_copies();
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("Shortest-Name");
    // all names have the same length, so the first copy is kept
    assert_eq!(removal_ids(&drive, &request), vec!["B", "C"]);
}

#[test]
fn test_unknown_strategy_warns_and_marks_nothing() {
    let drive = three_copies();
    let observer = RecordingObserver::default();
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("oldset");

    let report = DuplicateFinder::new(&drive)
        .with_observer(&observer)
        .resolve(&request)
        .unwrap();

    assert!(report.removal.is_empty());
    assert!(drive.trash_calls().is_empty());
    let warnings = observer.warnings.borrow();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("oldset"));
    assert!(warnings[0].contains("did you mean 'oldest'"));
}

#[test]
fn test_folder_override_only() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("X", "photo.jpg").with_checksum("p").with_parent("F1"),
        FileRecord::new("Y", "photo.jpg").with_checksum("p").with_parent("F2"),
    ]);
    let request = ResolveRequest::new(ScanRequest::default()).with_trash_folder("F1");
    assert_eq!(removal_ids(&drive, &request), vec!["X"]);
}

#[test]
fn test_folder_override_includes_kept_file() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("X", "x")
            .with_checksum("p")
            .with_modified_time("2020-01-01")
            .with_parent("F1"),
        FileRecord::new("Y", "y")
            .with_checksum("p")
            .with_modified_time("2021-01-01")
            .with_parent("F2"),
    ]);
    let observer = RecordingObserver::default();
    let request = ResolveRequest::new(ScanRequest::default())
        .with_keep_strategy("oldest")
        .with_trash_folder("F1")
        .with_dry_run(true);

    let report = DuplicateFinder::new(&drive)
        .with_observer(&observer)
        .resolve(&request)
        .unwrap();

    assert_eq!(report.removal.len(), 2);
    assert_eq!(report.fully_removed_groups, vec!["p".to_string()]);
    let marked = observer.marked.borrow();
    assert_eq!(marked[0].0, "Y");
    assert_eq!(
        marked[1],
        (
            "X".to_string(),
            MarkReason::FolderOverride {
                folder_id: "F1".into()
            }
        )
    );
}

#[test]
fn test_empty_drive_reports_no_duplicates() {
    let drive = MemoryDrive::new();
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("oldest");
    let report = DuplicateFinder::new(&drive).resolve(&request).unwrap();

    assert_eq!(report.scan.summary.duplicate_groups, 0);
    assert!(report.removal.is_empty());
    assert!(TextOutput::new(&report).render().contains(NO_DUPLICATES_MESSAGE));
}

#[test]
fn test_files_without_checksum_are_never_grouped() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("d1", "Doc").with_size(0),
        FileRecord::new("d2", "Doc").with_size(0),
    ]);
    let report = DuplicateFinder::new(&drive)
        .scan(&ScanRequest::default())
        .unwrap();

    assert!(!report.has_duplicates());
    assert_eq!(report.stats.without_checksum, 2);
}

// =============================================================================
// Scoping
// =============================================================================

#[test]
fn test_recursive_scan_covers_subfolders() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("top", "a.txt").with_checksum("k").with_parent("root-folder"),
        FileRecord::new("deep", "a.txt").with_checksum("k").with_parent("sub-2"),
        FileRecord::new("outside", "a.txt").with_checksum("k").with_parent("elsewhere"),
    ]);
    drive.add_folder(FolderEntry::new("sub-1", "Sub 1"), "root-folder");
    drive.add_folder(FolderEntry::new("sub-2", "Sub 2"), "sub-1");

    let flat = DuplicateFinder::new(&drive)
        .scan(&ScanRequest::folder("root-folder"))
        .unwrap();
    assert_eq!(flat.summary.total_files, 1);

    let recursive = DuplicateFinder::new(&drive)
        .scan(&ScanRequest::folder("root-folder").with_recursive(true))
        .unwrap();
    assert_eq!(recursive.summary.total_files, 2);
    assert_eq!(recursive.groups[0].ids(), vec!["top", "deep"]);
}

#[test]
fn test_recursive_without_folder_scans_everything() {
    let drive = three_copies();
    let request = ScanRequest::default().with_recursive(true);
    let report = DuplicateFinder::new(&drive).scan(&request).unwrap();
    assert_eq!(report.summary.total_files, 3);
}

#[test]
fn test_file_in_two_scanned_folders_is_not_its_own_duplicate() {
    let drive = MemoryDrive::from_files([FileRecord::new("only", "only.txt")
        .with_checksum("c1")
        .with_parent("top")
        .with_parent("sub")]);
    drive.add_folder(FolderEntry::new("sub", "Sub"), "top");
    let request = ResolveRequest::new(ScanRequest::folder("top").with_recursive(true))
        .with_keep_strategy("oldest")
        .with_trash_folder("sub");

    let report = DuplicateFinder::new(&drive).resolve(&request).unwrap();

    assert_eq!(report.scan.summary.total_files, 1);
    assert!(!report.scan.has_duplicates());
    assert!(report.removal.is_empty());
    assert!(!drive.is_trashed("only"));
}

#[test]
fn test_pairwise_file_in_two_scanned_folders_is_seen_once() {
    let drive = MemoryDrive::from_files([FileRecord::new("only", "only.txt")
        .with_checksum("c1")
        .with_parent("top")
        .with_parent("sub")]);
    drive.add_folder(FolderEntry::new("sub", "Sub"), "top");
    let mut resolver = |_: &AmbiguousPair<'_>| PairDecision::TrashCandidate;

    let report = DuplicateFinder::new(&drive)
        .scan_pairwise(
            &ScanRequest::folder("top").with_recursive(true),
            &mut resolver,
            false,
        )
        .unwrap();

    assert_eq!(report.stats.observed, 1);
    assert!(report.removal.is_empty());
    assert!(drive.trash_calls().is_empty());
}

// =============================================================================
// Removal
// =============================================================================

#[test]
fn test_one_failure_does_not_stop_the_batch() {
    let drive = three_copies();
    drive.fail_trash_for("B");
    let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("oldest");

    let report = DuplicateFinder::new(&drive).resolve(&request).unwrap();
    let result = report.trash.unwrap();

    assert_eq!(result.success_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures[0].id, "B");
    assert!(drive.is_trashed("C"));
    assert!(result.summary().starts_with("Trashed 1 file(s), 1 failed"));
}

// =============================================================================
// Pairwise mode
// =============================================================================

#[test]
fn test_pairwise_compares_only_against_first_copy() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("1", "first.txt").with_checksum("z"),
        FileRecord::new("2", "second.txt").with_checksum("z"),
        FileRecord::new("3", "third.txt").with_checksum("z"),
        FileRecord::new("4", "first.txt").with_checksum("z"),
    ]);
    let mut asked: Vec<(String, String)> = Vec::new();
    let mut resolver = |pair: &AmbiguousPair<'_>| {
        asked.push((pair.reference.id.clone(), pair.candidate.id.clone()));
        PairDecision::Skip
    };

    let report = DuplicateFinder::new(&drive)
        .scan_pairwise(&ScanRequest::default(), &mut resolver, true)
        .unwrap();

    assert_eq!(
        asked,
        vec![
            ("1".to_string(), "2".to_string()),
            ("1".to_string(), "3".to_string())
        ]
    );
    assert_eq!(report.removal.ids().collect::<Vec<_>>(), vec!["4"]);
    assert_eq!(report.stats.skipped, 2);
    assert!(report.trash.is_none());
}

#[test]
fn test_pairwise_trash_reference_keeps_it_as_reference() {
    let drive = MemoryDrive::from_files([
        FileRecord::new("1", "a.txt").with_checksum("z"),
        FileRecord::new("2", "b.txt").with_checksum("z"),
        FileRecord::new("3", "c.txt").with_checksum("z"),
    ]);
    let mut resolver = |pair: &AmbiguousPair<'_>| {
        assert_eq!(pair.reference.id, "1");
        PairDecision::TrashReference
    };

    let report = DuplicateFinder::new(&drive)
        .scan_pairwise(&ScanRequest::default(), &mut resolver, false)
        .unwrap();

    assert_eq!(report.removal.len(), 1);
    assert_eq!(drive.trash_calls(), vec!["1".to_string()]);
}
