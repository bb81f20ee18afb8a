//! Read-only verification that a destination mirrors a source.
//!
//! The check compares two [`TreeSnapshot`]s path by path:
//! 1. Paths present on one side only
//! 2. Kind and size for common paths
//! 3. Optionally, BLAKE3 digests of common files of equal size
//!
//! Nothing on disk is modified.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use treemirror_core::{DEFAULT_HASH_CHUNK_SIZE, EntryKind, FailedOperation, SyncFailure, SyncMode};
use treemirror_scan::{SnapshotError, TreeSnapshot};

use crate::hasher::ContentHasher;

/// Configuration for mirror verification.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct CheckConfig {
    /// Ignore entries whose name starts with `.`.
    #[builder(default = "false")]
    pub filter_hidden: bool,

    /// Hash common files to compare content, not just size.
    #[builder(default = "false")]
    pub deep: bool,

    /// Bytes read per hashing step.
    #[builder(default = "DEFAULT_HASH_CHUNK_SIZE")]
    pub hash_chunk_size: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            filter_hidden: false,
            deep: false,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
        }
    }
}

impl CheckConfig {
    /// Create a new config builder.
    pub fn builder() -> CheckConfigBuilder {
        CheckConfigBuilder::default()
    }
}

/// A single way in which the destination differs from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discrepancy {
    /// Present in the source, absent from the destination.
    Missing { path: PathBuf },
    /// Present in the destination only.
    Extra { path: PathBuf },
    /// Same path, different entry types.
    KindMismatch {
        path: PathBuf,
        expected: EntryKind,
        found: EntryKind,
    },
    /// Same file path, different byte lengths.
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
    /// Same length, different digests.
    ContentMismatch { path: PathBuf },
}

impl Discrepancy {
    /// Relative path the discrepancy refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path }
            | Self::Extra { path }
            | Self::KindMismatch { path, .. }
            | Self::SizeMismatch { path, .. }
            | Self::ContentMismatch { path } => path,
        }
    }
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "missing: {}", path.display()),
            Self::Extra { path } => write!(f, "extra: {}", path.display()),
            Self::KindMismatch {
                path,
                expected,
                found,
            } => write!(f, "type differs ({expected} vs {found}): {}", path.display()),
            Self::SizeMismatch {
                path,
                expected,
                found,
            } => write!(f, "size differs ({expected} vs {found} bytes): {}", path.display()),
            Self::ContentMismatch { path } => write!(f, "content differs: {}", path.display()),
        }
    }
}

/// Results from mirror verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorReport {
    /// Differences found, sorted by path.
    pub discrepancies: Vec<Discrepancy>,
    /// Number of distinct relative paths examined.
    pub entries_compared: usize,
    /// Number of files hashed (deep mode only).
    pub files_hashed: u64,
    /// Entries that could not be read on either side.
    pub errors: Vec<SyncFailure>,
}

impl MirrorReport {
    /// Whether the destination mirrors the source and every entry was readable.
    pub fn is_mirror(&self) -> bool {
        self.discrepancies.is_empty() && self.errors.is_empty()
    }
}

/// Mirror verifier.
pub struct MirrorCheck {
    config: CheckConfig,
    hasher: ContentHasher,
}

impl MirrorCheck {
    /// Create a verifier with default config.
    pub fn new() -> Self {
        Self::with_config(CheckConfig::default())
    }

    /// Create a verifier with custom config.
    pub fn with_config(config: CheckConfig) -> Self {
        let hasher = ContentHasher::with_chunk_size(config.hash_chunk_size);
        Self { config, hasher }
    }

    /// Snapshot both trees and compare them.
    pub fn check(&self, source: &Path, destination: &Path) -> Result<MirrorReport, SnapshotError> {
        let mode = SyncMode::new(self.config.filter_hidden);
        let source_snapshot = TreeSnapshot::capture(source, mode)?;
        let destination_snapshot = TreeSnapshot::capture(destination, mode)?;
        Ok(self.compare(&source_snapshot, &destination_snapshot))
    }

    /// Compare two snapshots already taken.
    pub fn compare(&self, source: &TreeSnapshot, destination: &TreeSnapshot) -> MirrorReport {
        let mut report = MirrorReport::default();
        report.errors.extend(source.errors.iter().cloned());
        report.errors.extend(destination.errors.iter().cloned());

        for (path, expected) in &source.entries {
            report.entries_compared += 1;

            let Some(found) = destination.entries.get(path) else {
                report.discrepancies.push(Discrepancy::Missing { path: path.clone() });
                continue;
            };

            if expected.kind != found.kind {
                report.discrepancies.push(Discrepancy::KindMismatch {
                    path: path.clone(),
                    expected: expected.kind,
                    found: found.kind,
                });
                continue;
            }

            if !expected.kind.is_file() {
                continue;
            }

            if expected.size != found.size {
                report.discrepancies.push(Discrepancy::SizeMismatch {
                    path: path.clone(),
                    expected: expected.size,
                    found: found.size,
                });
                continue;
            }

            if self.config.deep {
                self.compare_content(path, source, destination, &mut report);
            }
        }

        for path in destination.entries.keys() {
            if !source.entries.contains_key(path) {
                report.entries_compared += 1;
                report.discrepancies.push(Discrepancy::Extra { path: path.clone() });
            }
        }

        report
            .discrepancies
            .sort_by(|a, b| a.path().cmp(b.path()));

        tracing::debug!(
            compared = report.entries_compared,
            discrepancies = report.discrepancies.len(),
            "mirror check finished"
        );

        report
    }

    fn compare_content(
        &self,
        relative: &Path,
        source: &TreeSnapshot,
        destination: &TreeSnapshot,
        report: &mut MirrorReport,
    ) {
        let mut digests = Vec::with_capacity(2);
        for root in [&source.root, &destination.root] {
            let path = root.join(relative);
            match self.hasher.digest(&path) {
                Ok(hash) => {
                    report.files_hashed += 1;
                    digests.push(hash);
                }
                Err(err) => {
                    report
                        .errors
                        .push(SyncFailure::io(path, FailedOperation::Hash, &err));
                    return;
                }
            }
        }

        if digests[0] != digests[1] {
            report.discrepancies.push(Discrepancy::ContentMismatch {
                path: relative.to_path_buf(),
            });
        }
    }
}

impl Default for MirrorCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_mirrored_pair() -> (TempDir, TempDir) {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        for root in [source.path(), destination.path()] {
            fs::create_dir(root.join("sub")).unwrap();
            fs::write(root.join("a.txt"), "alpha").unwrap();
            fs::write(root.join("sub/b.txt"), "beta").unwrap();
        }
        (source, destination)
    }

    #[test]
    fn test_identical_trees_are_mirror() {
        let (source, destination) = create_mirrored_pair();
        let report = MirrorCheck::new()
            .check(source.path(), destination.path())
            .unwrap();

        assert!(report.is_mirror());
        assert_eq!(report.entries_compared, 3);
        assert_eq!(report.files_hashed, 0);
    }

    #[test]
    fn test_missing_and_extra() {
        let (source, destination) = create_mirrored_pair();
        fs::write(source.path().join("new.txt"), "n").unwrap();
        fs::write(destination.path().join("stale.txt"), "s").unwrap();

        let report = MirrorCheck::new()
            .check(source.path(), destination.path())
            .unwrap();

        assert_eq!(
            report.discrepancies,
            vec![
                Discrepancy::Missing {
                    path: PathBuf::from("new.txt")
                },
                Discrepancy::Extra {
                    path: PathBuf::from("stale.txt")
                },
            ]
        );
    }

    #[test]
    fn test_kind_and_size_mismatch() {
        let (source, destination) = create_mirrored_pair();
        fs::write(destination.path().join("a.txt"), "alphabet").unwrap();
        fs::remove_file(destination.path().join("sub/b.txt")).unwrap();
        fs::create_dir(destination.path().join("sub/b.txt")).unwrap();

        let report = MirrorCheck::new()
            .check(source.path(), destination.path())
            .unwrap();

        assert_eq!(report.discrepancies.len(), 2);
        assert!(matches!(
            report.discrepancies[0],
            Discrepancy::SizeMismatch {
                expected: 5,
                found: 8,
                ..
            }
        ));
        assert!(matches!(
            report.discrepancies[1],
            Discrepancy::KindMismatch {
                expected: EntryKind::File,
                found: EntryKind::Directory,
                ..
            }
        ));
    }

    #[test]
    fn test_deep_check_detects_same_size_changes() {
        let (source, destination) = create_mirrored_pair();
        fs::write(destination.path().join("a.txt"), "ALPHA").unwrap();

        let shallow = MirrorCheck::new()
            .check(source.path(), destination.path())
            .unwrap();
        assert!(shallow.is_mirror());

        let config = CheckConfig::builder().deep(true).build().unwrap();
        let deep = MirrorCheck::with_config(config)
            .check(source.path(), destination.path())
            .unwrap();
        assert_eq!(
            deep.discrepancies,
            vec![Discrepancy::ContentMismatch {
                path: PathBuf::from("a.txt")
            }]
        );
        assert_eq!(deep.files_hashed, 4);
    }

    #[test]
    fn test_hidden_entries_ignored_when_filtering() {
        let (source, destination) = create_mirrored_pair();
        fs::write(destination.path().join(".local"), "x").unwrap();

        let config = CheckConfig::builder().filter_hidden(true).build().unwrap();
        let report = MirrorCheck::with_config(config)
            .check(source.path(), destination.path())
            .unwrap();
        assert!(report.is_mirror());

        let report = MirrorCheck::new()
            .check(source.path(), destination.path())
            .unwrap();
        assert!(!report.is_mirror());
    }

    #[test]
    fn test_discrepancy_display() {
        let d = Discrepancy::SizeMismatch {
            path: PathBuf::from("x.bin"),
            expected: 1,
            found: 2,
        };
        assert_eq!(d.to_string(), "size differs (1 vs 2 bytes): x.bin");
    }
}
