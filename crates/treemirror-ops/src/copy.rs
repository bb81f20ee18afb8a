//! Copying files and directory subtrees into the destination.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use treemirror_core::{EntryKind, FailedOperation, SyncFailure};
use treemirror_scan::EntryClassifier;

use crate::remove::clear_protections;

/// What a subtree copy produced.
#[derive(Debug, Default)]
pub struct CopyOutcome {
    /// Regular files written.
    pub files: u64,
    /// Directories created, including the subtree root.
    pub dirs: u64,
    /// Bytes written.
    pub bytes: u64,
    /// Entries below the root that could not be copied.
    pub failures: Vec<SyncFailure>,
    /// Source entries that are neither files nor directories.
    pub skipped: Vec<PathBuf>,
}

/// Copy a single file with its permissions and timestamps.
///
/// Returns the number of bytes written.
pub fn copy_file(source: &Path, dest: &Path) -> io::Result<u64> {
    let metadata = fs::metadata(source)?;
    let bytes = fs::copy(source, dest)?;

    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, atime, mtime)?;

    Ok(bytes)
}

/// Copy `source` over an existing `dest`.
///
/// A destination that refuses the write has its protections cleared and
/// the copy is retried once.
pub fn overwrite_file(source: &Path, dest: &Path) -> io::Result<u64> {
    match copy_file(source, dest) {
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            tracing::debug!(path = %dest.display(), "destination is write-protected, retrying");
            clear_protections(dest)?;
            copy_file(source, dest)
        }
        result => result,
    }
}

/// Recursively copy the directory `source` to the new path `dest`.
///
/// Failing to create `dest` itself is returned as an error. Anything
/// below it is best-effort: failures are collected in the outcome and the
/// remaining siblings are still copied. The classifier's hidden filter
/// applies at every depth.
pub fn copy_tree(
    source: &Path,
    dest: &Path,
    classifier: &EntryClassifier,
) -> io::Result<CopyOutcome> {
    fs::create_dir(dest)?;

    let mut outcome = CopyOutcome {
        dirs: 1,
        ..Default::default()
    };
    copy_children(source, dest, classifier, &mut outcome);

    Ok(outcome)
}

fn copy_children(
    source: &Path,
    dest: &Path,
    classifier: &EntryClassifier,
    outcome: &mut CopyOutcome,
) {
    let names = match classifier.list(source) {
        Ok(names) => names,
        Err(err) => {
            outcome
                .failures
                .push(SyncFailure::io(source, FailedOperation::List, &err));
            return;
        }
    };

    for name in names {
        let from = source.join(&name);
        let to = dest.join(&name);

        let kind = match fs::symlink_metadata(&from) {
            Ok(metadata) => EntryKind::from_metadata(&metadata),
            Err(err) => {
                outcome
                    .failures
                    .push(SyncFailure::io(&from, FailedOperation::Inspect, &err));
                continue;
            }
        };

        match kind {
            EntryKind::File => match copy_file(&from, &to) {
                Ok(bytes) => {
                    outcome.files += 1;
                    outcome.bytes += bytes;
                }
                Err(err) => outcome
                    .failures
                    .push(SyncFailure::io(&to, FailedOperation::Create, &err)),
            },
            EntryKind::Directory => match fs::create_dir(&to) {
                Ok(()) => {
                    outcome.dirs += 1;
                    copy_children(&from, &to, classifier, outcome);
                }
                Err(err) => outcome
                    .failures
                    .push(SyncFailure::io(&to, FailedOperation::Create, &err)),
            },
            EntryKind::Other => outcome.skipped.push(from),
        }
    }

    // Writing children bumps the directory mtime, so restore it last.
    if let Err(err) = preserve_mtime(source, dest) {
        tracing::debug!(path = %dest.display(), error = %err, "could not preserve directory mtime");
    }
}

fn preserve_mtime(source: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))
}
