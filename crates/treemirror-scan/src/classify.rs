//! Single-level comparison of two directory listings.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use treemirror_core::{EntryKind, SyncMode};

use crate::hidden::{HiddenPredicate, is_hidden};

/// Partition of the names found in a pair of directories.
///
/// Every visible name from either listing lands in exactly one set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Names present only in the source directory.
    pub source_only: BTreeSet<OsString>,
    /// Names present only in the destination directory.
    pub destination_only: BTreeSet<OsString>,
    /// Names that are directories on both sides.
    pub common_dirs: BTreeSet<OsString>,
    /// Names that are regular files on both sides.
    pub common_files: BTreeSet<OsString>,
    /// Names whose kinds differ, are neither file nor directory, or
    /// could not be inspected.
    pub common_other: BTreeSet<OsString>,
}

impl ComparisonResult {
    /// Total number of names across all sets.
    pub fn len(&self) -> usize {
        self.source_only.len()
            + self.destination_only.len()
            + self.common_dirs.len()
            + self.common_files.len()
            + self.common_other.len()
    }

    /// Whether both listings were empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A directory of the pair could not be listed.
#[derive(Debug, Error)]
#[error("Cannot list {path}: {source}")]
pub struct ListError {
    /// The directory whose listing failed.
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Compares one directory level, optionally ignoring hidden entries.
///
/// Recursion is left to the caller, which decides whether to descend
/// into [`ComparisonResult::common_dirs`].
#[derive(Debug, Clone, Copy)]
pub struct EntryClassifier {
    mode: SyncMode,
    hidden: HiddenPredicate,
}

impl EntryClassifier {
    /// Create a classifier using the default `.` predicate.
    pub fn new(mode: SyncMode) -> Self {
        Self::with_predicate(mode, is_hidden)
    }

    /// Create a classifier with a custom hidden predicate.
    pub fn with_predicate(mode: SyncMode, hidden: HiddenPredicate) -> Self {
        Self { mode, hidden }
    }

    /// The mode this classifier was built with.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Whether `name` takes part in comparison under the current mode.
    pub fn is_visible(&self, name: &OsStr) -> bool {
        !(self.mode.filter_hidden && (self.hidden)(name))
    }

    /// List the visible names of a single directory.
    pub fn list(&self, dir: &Path) -> io::Result<BTreeSet<OsString>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            if self.is_visible(&name) {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// Compare the immediate contents of `source` and `destination`.
    ///
    /// Both paths are expected to be directories. A listing failure is
    /// returned with the side that failed; an unreadable entry in the
    /// common set is classified as other.
    pub fn classify(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<ComparisonResult, ListError> {
        let left = self.list_side(source)?;
        let mut right = self.list_side(destination)?;

        let mut result = ComparisonResult::default();

        for name in left {
            if !right.remove(&name) {
                result.source_only.insert(name);
                continue;
            }

            let source_kind = entry_kind(&source.join(&name));
            let destination_kind = entry_kind(&destination.join(&name));

            match (source_kind, destination_kind) {
                (Some(EntryKind::Directory), Some(EntryKind::Directory)) => {
                    result.common_dirs.insert(name);
                }
                (Some(EntryKind::File), Some(EntryKind::File)) => {
                    result.common_files.insert(name);
                }
                _ => {
                    result.common_other.insert(name);
                }
            }
        }

        result.destination_only = right;

        tracing::trace!(
            source = %source.display(),
            destination = %destination.display(),
            entries = result.len(),
            "classified directory level"
        );

        Ok(result)
    }

    fn list_side(&self, dir: &Path) -> Result<BTreeSet<OsString>, ListError> {
        self.list(dir).map_err(|source| ListError {
            path: dir.to_path_buf(),
            source,
        })
    }
}

fn entry_kind(path: &Path) -> Option<EntryKind> {
    fs::symlink_metadata(path)
        .ok()
        .map(|m| EntryKind::from_metadata(&m))
}
