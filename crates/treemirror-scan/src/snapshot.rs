//! Serial whole-tree snapshots used for mirror verification.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use treemirror_core::{EntryKind, FailedOperation, SyncFailure, SyncMode};

use crate::hidden::is_hidden;

/// Errors that prevent a snapshot from being taken.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Root path is missing or unreadable.
    #[error("Cannot read snapshot root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Snapshot root is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// One entry recorded in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Entry type, without following symlinks.
    pub kind: EntryKind,
    /// Byte length for files, zero otherwise.
    pub size: u64,
}

/// Relative paths of a tree with their kinds and sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Root the paths are relative to.
    pub root: PathBuf,
    /// Entries keyed by path relative to `root`.
    pub entries: BTreeMap<PathBuf, SnapshotEntry>,
    /// Entries that could not be read.
    pub errors: Vec<SyncFailure>,
}

impl TreeSnapshot {
    /// Walk `root` serially and record every visible entry.
    ///
    /// Hidden filtering prunes whole subtrees, matching what a sync pass
    /// with the same mode would touch.
    pub fn capture(root: impl AsRef<Path>, mode: SyncMode) -> Result<Self, SnapshotError> {
        let root = root.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&root).map_err(|source| SnapshotError::Root {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(SnapshotError::NotADirectory { path: root });
        }

        let filter_hidden = mode.filter_hidden;
        let walker = WalkDir::new(&root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .process_read_dir(move |depth, _path, _state, children| {
                // The root itself arrives with no depth and is never filtered.
                if filter_hidden && depth.is_some() {
                    children.retain(|child| {
                        child
                            .as_ref()
                            .map(|entry| !is_hidden(&entry.file_name))
                            .unwrap_or(true)
                    });
                }
            });

        let mut entries = BTreeMap::new();
        let mut errors = Vec::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    errors.push(SyncFailure::new(path, FailedOperation::List, err.to_string()));
                    continue;
                }
            };

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&root).map(Path::to_path_buf) else {
                continue;
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            let size = if kind.is_file() {
                match entry.metadata() {
                    Ok(m) => m.len(),
                    Err(err) => {
                        errors.push(SyncFailure::new(
                            &path,
                            FailedOperation::Inspect,
                            err.to_string(),
                        ));
                        continue;
                    }
                }
            } else {
                0
            };

            entries.insert(relative, SnapshotEntry { kind, size });
        }

        Ok(Self {
            root,
            entries,
            errors,
        })
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree had no visible entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by relative path.
    pub fn get(&self, relative: impl AsRef<Path>) -> Option<&SnapshotEntry> {
        self.entries.get(relative.as_ref())
    }

    /// Number of regular files recorded.
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| e.kind.is_file()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::create_dir(root.join(".hidden_dir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world").unwrap();
        fs::write(root.join("dir1/subdir/.secret"), "s").unwrap();
        fs::write(root.join(".hidden_dir/inner.txt"), "i").unwrap();

        temp
    }

    #[test]
    fn test_capture_all_entries() {
        let temp = create_test_tree();
        let snapshot = TreeSnapshot::capture(temp.path(), SyncMode::new(false)).unwrap();

        assert_eq!(snapshot.len(), 7);
        assert_eq!(snapshot.file_count(), 4);
        assert_eq!(
            snapshot.get("dir1/file2.txt"),
            Some(&SnapshotEntry {
                kind: EntryKind::File,
                size: 11
            })
        );
        assert!(snapshot.get(".hidden_dir/inner.txt").is_some());
        assert!(snapshot.errors.is_empty());
    }

    #[test]
    fn test_capture_skips_hidden_subtrees() {
        let temp = create_test_tree();
        let snapshot = TreeSnapshot::capture(temp.path(), SyncMode::new(true)).unwrap();

        assert_eq!(snapshot.len(), 4);
        assert!(snapshot.get(".hidden_dir").is_none());
        assert!(snapshot.get(".hidden_dir/inner.txt").is_none());
        assert!(snapshot.get("dir1/subdir/.secret").is_none());
        assert_eq!(snapshot.get("dir1/subdir").map(|e| e.kind), Some(EntryKind::Directory));
    }

    #[test]
    fn test_capture_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = TreeSnapshot::capture(temp.path().join("nope"), SyncMode::default());
        assert!(matches!(result, Err(SnapshotError::Root { .. })));
    }

    #[test]
    fn test_capture_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, "x").unwrap();
        let result = TreeSnapshot::capture(&file, SyncMode::default());
        assert!(matches!(result, Err(SnapshotError::NotADirectory { .. })));
    }
}
