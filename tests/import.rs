//! End-to-end import runs against temporary directories

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use filetime::{FileTime, set_file_mtime};
use photo_importer::process::ImportProgress;
use photo_importer::time::metadata::{MetadataDecoder, TagGroup};
use photo_importer::{
    CancellationToken, DateSource, DuplicateHandling, ImportSettings, Importer, OutcomeKind, Result,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Metadata keyed by file name; unknown files have none
#[derive(Default)]
struct ByName(HashMap<String, Vec<TagGroup>>);

impl ByName {
    fn with_original(mut self, file_name: &str, date_time_original: &str) -> Self {
        self.0.insert(
            file_name.to_string(),
            vec![TagGroup::SubIfd {
                date_time_original: Some(date_time_original.to_string()),
            }],
        );
        self
    }
}

impl MetadataDecoder for ByName {
    fn decode(&self, path: &Path) -> Result<Vec<TagGroup>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.0.get(&name).cloned().unwrap_or_default())
    }
}

/// Same metadata for every file
struct Fixed(Vec<TagGroup>);

impl MetadataDecoder for Fixed {
    fn decode(&self, _path: &Path) -> Result<Vec<TagGroup>> {
        Ok(self.0.clone())
    }
}

fn local_mtime(path: &Path, at: NaiveDateTime) {
    let local = at.and_local_timezone(Local).earliest().unwrap();
    set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
}

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

struct Library {
    _dir: TempDir,
    source: PathBuf,
    destination: PathBuf,
}

impl Library {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("camera");
        let destination = dir.path().join("library");
        fs::create_dir_all(source.join("sub")).unwrap();
        Self {
            _dir: dir,
            source,
            destination,
        }
    }

    fn add(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.source.join(relative);
        fs::write(&path, content).unwrap();
        local_mtime(&path, dt(2023, 2, 1, 6, 0, 0));
        path
    }

    fn settings(&self) -> ImportSettings {
        ImportSettings {
            destination_dir: Some(self.destination.clone()),
            ..ImportSettings::for_source(&self.source)
        }
    }

    /// Two dateable photos and a file the importer must ignore
    fn populate(&self) -> ByName {
        self.add("IMG_20230301_101010.jpg", b"filename dated");
        self.add("sub/photo.jpg", b"exif dated");
        self.add("notes.txt", b"not media");
        ByName::default().with_original("photo.jpg", "2021:07:04 09:08:07")
    }

    fn filename_target(&self) -> PathBuf {
        self.destination.join("2023").join("20230301").join("101010.jpg")
    }

    fn exif_target(&self) -> PathBuf {
        self.destination.join("2021").join("20210704").join("090807.jpg")
    }
}

#[test]
fn test_run_moves_files_into_dated_tree() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();

    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.total_files, 2);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.skipped, 0);
    assert!(lib.filename_target().exists());
    assert!(lib.exif_target().exists());
    assert!(!lib.source.join("IMG_20230301_101010.jpg").exists());
    assert!(lib.source.join("notes.txt").exists());

    let exif = result
        .outcomes
        .iter()
        .find(|o| o.source.ends_with("photo.jpg"))
        .unwrap();
    assert_eq!(exif.date_source, Some(DateSource::MetadataPrimary));
    assert_eq!(exif.date, Some(dt(2021, 7, 4, 9, 8, 7)));
    assert_eq!(exif.destination.as_deref(), Some(lib.exif_target().as_path()));
}

#[test]
fn test_run_preserves_modification_time() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();
    importer.run(None, &CancellationToken::new()).unwrap();

    let expected = dt(2023, 2, 1, 6, 0, 0)
        .and_local_timezone(Local)
        .earliest()
        .unwrap()
        .timestamp();
    let mtime = FileTime::from_last_modification_time(&fs::metadata(lib.exif_target()).unwrap());
    assert_eq!(mtime.unix_seconds(), expected);
}

#[test]
fn test_non_recursive_run_ignores_subdirectories() {
    let lib = Library::new();
    let decoder = lib.populate();
    let settings = ImportSettings {
        recursive: false,
        ..lib.settings()
    };
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();

    assert_eq!(importer.count_candidates().unwrap(), 1);
    let result = importer.run(None, &CancellationToken::new()).unwrap();
    assert_eq!(result.total_files, 1);
    assert!(lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_dry_run_changes_nothing() {
    let lib = Library::new();
    let decoder = lib.populate();
    let settings = ImportSettings {
        dry_run: true,
        ..lib.settings()
    };
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();

    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.succeeded, 2);
    assert!(
        result
            .outcomes
            .iter()
            .all(|o| o.message.as_deref() == Some("Would process normally"))
    );
    assert!(lib.source.join("IMG_20230301_101010.jpg").exists());
    assert!(lib.source.join("sub/photo.jpg").exists());
    assert!(!lib.destination.exists());
}

#[test]
fn test_smart_policy_removes_identical_duplicate() {
    let lib = Library::new();
    let decoder = lib.populate();
    fs::create_dir_all(lib.exif_target().parent().unwrap()).unwrap();
    fs::write(lib.exif_target(), b"exif dated").unwrap();

    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();
    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.succeeded, 2);
    assert_eq!(result.duplicates_removed, 1);
    assert!(!lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_skip_policy_leaves_conflicts_alone() {
    let lib = Library::new();
    let decoder = lib.populate();
    fs::create_dir_all(lib.exif_target().parent().unwrap()).unwrap();
    fs::write(lib.exif_target(), b"something else").unwrap();

    let settings = ImportSettings {
        duplicate_handling: DuplicateHandling::Skip,
        ..lib.settings()
    };
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();
    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.failed, 0);
    assert!(lib.source.join("sub/photo.jpg").exists());
    assert_eq!(fs::read(lib.exif_target()).unwrap(), b"something else");
}

#[test]
fn test_undateable_files_fail() {
    let lib = Library::new();
    let decoder = lib.populate();
    let settings = ImportSettings {
        minimum_valid_date: Local::now().naive_local() + TimeDelta::days(1),
        ..lib.settings()
    };
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();
    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.failed, 2);
    assert!(
        result
            .outcomes
            .iter()
            .all(|o| o.kind == OutcomeKind::Failed
                && o.message.as_deref() == Some("Could not determine date"))
    );
    assert!(lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_cancel_before_run() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = importer.run(None, &cancel).unwrap();

    assert_eq!(result.status, photo_importer::process::RunStatus::Cancelled);
    assert_eq!(result.total_files, 2);
    assert_eq!(result.processed(), 0);
    assert!(lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_cancel_during_run_keeps_finished_work() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();

    let cancel = CancellationToken::new();
    let from_callback = cancel.clone();
    let on_progress = move |_: &ImportProgress| from_callback.cancel();
    let result = importer.run(Some(&on_progress), &cancel).unwrap();

    assert_eq!(result.status, photo_importer::process::RunStatus::Cancelled);
    assert_eq!(result.processed(), 1);
    assert_eq!(result.succeeded, 1);
    // Name order: the top-level photo comes before the subdirectory
    assert!(lib.filename_target().exists());
    assert!(lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_progress_reports_every_file() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();

    let seen = Mutex::new(Vec::new());
    let on_progress = |p: &ImportProgress| {
        seen.lock().unwrap().push((p.current, p.total, p.file_name.clone()));
    };
    importer.run(Some(&on_progress), &CancellationToken::new()).unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(
        seen,
        vec![
            (1, 2, "IMG_20230301_101010.jpg".to_string()),
            (2, 2, "photo.jpg".to_string()),
        ]
    );
}

#[test]
fn test_in_place_rerun_is_stable() {
    let lib = Library::new();
    lib.add("a.jpg", b"first");
    let decoder = Fixed(vec![TagGroup::SubIfd {
        date_time_original: Some("2022:05:06 07:08:09".to_string()),
    }]);
    let settings = ImportSettings::for_source(&lib.source);
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();

    let first = importer.run(None, &CancellationToken::new()).unwrap();
    assert_eq!(first.succeeded, 1);
    let placed = lib.source.join("2022").join("20220506").join("070809.jpg");
    assert!(placed.exists());

    let second = importer.run(None, &CancellationToken::new()).unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.duplicates_removed, 0);
    assert!(placed.exists());
}

#[test]
fn test_in_place_rerun_with_rename_policy_is_stable() {
    let lib = Library::new();
    lib.add("a.jpg", b"first");
    let decoder = Fixed(vec![TagGroup::SubIfd {
        date_time_original: Some("2022:05:06 07:08:09".to_string()),
    }]);
    let settings = ImportSettings {
        duplicate_handling: DuplicateHandling::Rename,
        ..ImportSettings::for_source(&lib.source)
    };
    let importer = Importer::with_decoder(settings, Arc::new(decoder)).unwrap();
    let placed_dir = lib.source.join("2022").join("20220506");

    let first = importer.run(None, &CancellationToken::new()).unwrap();
    assert_eq!(first.succeeded, 1);

    for _ in 0..2 {
        let again = importer.run(None, &CancellationToken::new()).unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.succeeded, 0);
        assert_eq!(
            again.outcomes[0].message.as_deref(),
            Some("File is already in place")
        );
        let names: Vec<_> = fs::read_dir(&placed_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["070809.jpg".to_string()]);
    }
}

#[test]
fn test_files_placed_inside_source_are_visited_once() {
    let lib = Library::new();
    lib.add("0001.jpg", b"only photo");
    // Earlier run left the day directory behind; it sorts after the photo
    fs::create_dir_all(lib.source.join("2024").join("20240115")).unwrap();
    let decoder = Fixed(vec![TagGroup::SubIfd {
        date_time_original: Some("2024:01:15 14:30:22".to_string()),
    }]);
    let importer =
        Importer::with_decoder(ImportSettings::for_source(&lib.source), Arc::new(decoder)).unwrap();

    let result = importer.run(None, &CancellationToken::new()).unwrap();

    assert_eq!(result.total_files, 1);
    assert_eq!(result.processed(), 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, 0);
    assert!(result.succeeded + result.failed + result.skipped <= result.total_files);
    assert!(
        lib.source
            .join("2024")
            .join("20240115")
            .join("143022.jpg")
            .exists()
    );
}

#[test]
fn test_preview_plans_without_touching_files() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();

    let files: Vec<PathBuf> = importer
        .candidates()
        .unwrap()
        .map(|c| c.unwrap().path().to_path_buf())
        .chain(std::iter::once(lib.source.join("missing.jpg")))
        .collect();

    let reports = AtomicUsize::new(0);
    let last = Mutex::new(None);
    let on_progress = |p: &ImportProgress| {
        reports.fetch_add(1, Ordering::SeqCst);
        *last.lock().unwrap() = Some((p.current, p.total));
    };
    let previews = importer
        .preview(&files, Some(&on_progress), &CancellationToken::new())
        .unwrap();

    assert_eq!(previews.len(), 3);
    let planned = previews[1].planned.as_ref().unwrap();
    assert_eq!(planned.target, lib.exif_target());
    assert_eq!(planned.date_source, DateSource::MetadataPrimary);
    assert_eq!(previews[2].planned, Err("File not found".to_string()));

    assert_eq!(reports.load(Ordering::SeqCst), 1);
    assert_eq!(*last.lock().unwrap(), Some((3, 3)));
    assert!(!lib.destination.exists());
    assert!(lib.source.join("sub/photo.jpg").exists());
}

#[test]
fn test_report_round_trips_through_json() {
    let lib = Library::new();
    let decoder = lib.populate();
    let importer = Importer::with_decoder(lib.settings(), Arc::new(decoder)).unwrap();
    let result = importer.run(None, &CancellationToken::new()).unwrap();

    let report_path = lib.destination.join("reports").join("run.json");
    result.save_report(&report_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
}
