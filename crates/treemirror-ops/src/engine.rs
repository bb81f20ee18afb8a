//! Recursive one-way synchronization.
//!
//! Each pass walks the source and destination depth-first, one directory
//! level at a time. At every level the classifier partitions the names,
//! then the engine:
//! 1. Copies source-only entries
//! 2. Updates common files whose content changed
//! 3. Recurses into common directories
//! 4. Replaces entries whose types differ
//! 5. Deletes destination-only entries
//!
//! Metadata differences alone never cause an overwrite; both sides are
//! hashed and the file is copied only on a digest mismatch.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use treemirror_core::{
    ContentHash, DirectoryNode, EntryKind, FailedOperation, SyncAction, SyncConfig, SyncError,
    SyncEvent, SyncFailure, SyncReport,
};
use treemirror_scan::EntryClassifier;
use treemirror_verify::ContentHasher;

use crate::copy::{copy_file, copy_tree, overwrite_file};
use crate::remove::remove_entry;

/// One-way mirror from a source tree into a destination tree.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: SyncConfig,
    classifier: EntryClassifier,
    hasher: ContentHasher,
}

impl SyncEngine {
    /// Create an engine for the given configuration.
    pub fn new(config: SyncConfig) -> Self {
        let classifier = EntryClassifier::new(config.mode());
        let hasher = ContentHasher::with_chunk_size(config.hash_chunk_size);
        Self {
            config,
            classifier,
            hasher,
        }
    }

    /// Replace the classifier, e.g. to use a different hidden predicate.
    pub fn with_classifier(mut self, classifier: EntryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run one pass.
    pub fn sync(&self) -> Result<SyncReport, SyncError> {
        self.sync_with(|_| {})
    }

    /// Run one pass, handing every event to `observer` as it happens.
    ///
    /// Fatal errors are detected before the destination is touched.
    pub fn sync_with<F>(&self, observer: F) -> Result<SyncReport, SyncError>
    where
        F: FnMut(&SyncEvent),
    {
        let start = Instant::now();
        let source = self.config.source.as_path();

        self.check_source()?;
        let resolved = self.check_overlap()?;

        // `..` after a missing component cannot be walked as written.
        let destination = if has_parent_component(&self.config.destination) {
            resolved.as_path()
        } else {
            self.config.destination.as_path()
        };

        let mut pass = Pass {
            report: SyncReport::new(source, destination),
            observer,
        };
        pass.report.destination_created = prepare_destination(destination)?;

        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            filter_hidden = self.config.filter_hidden,
            "starting sync pass"
        );

        self.sync_level(source, destination, &mut pass);

        let mut report = pass.report;
        report.duration = start.elapsed();

        tracing::debug!(
            summary = %report.summary(),
            elapsed_ms = report.duration.as_millis() as u64,
            "sync pass finished"
        );

        Ok(report)
    }

    fn check_source(&self) -> Result<(), SyncError> {
        let source = &self.config.source;
        let metadata = fs::metadata(source).map_err(|err| SyncError::source_io(source, err))?;
        if !metadata.is_dir() {
            return Err(SyncError::SourceNotADirectory {
                path: source.clone(),
            });
        }
        Ok(())
    }

    /// Returns the resolved destination.
    fn check_overlap(&self) -> Result<PathBuf, SyncError> {
        let source = resolve(&self.config.source).map_err(|source| SyncError::Io {
            path: self.config.source.clone(),
            source,
        })?;
        let destination = resolve(&self.config.destination).map_err(|source| SyncError::Io {
            path: self.config.destination.clone(),
            source,
        })?;

        if source.starts_with(&destination) || destination.starts_with(&source) {
            return Err(SyncError::OverlappingRoots {
                source_root: self.config.source.clone(),
                destination: self.config.destination.clone(),
            });
        }
        Ok(destination)
    }

    fn sync_level<F>(&self, source: &Path, destination: &Path, pass: &mut Pass<F>)
    where
        F: FnMut(&SyncEvent),
    {
        let comparison = match self.classifier.classify(source, destination) {
            Ok(comparison) => comparison,
            Err(err) => {
                pass.failure(SyncFailure::io(&err.path, FailedOperation::List, &err.source));
                return;
            }
        };
        pass.report.stats.dirs_compared += 1;

        for name in &comparison.source_only {
            self.create_entry(&source.join(name), &destination.join(name), pass);
        }

        for name in &comparison.common_files {
            self.update_file(&source.join(name), &destination.join(name), pass);
        }

        for name in &comparison.common_dirs {
            self.sync_level(&source.join(name), &destination.join(name), pass);
        }

        for name in &comparison.common_other {
            self.replace_entry(&source.join(name), &destination.join(name), pass);
        }

        for name in &comparison.destination_only {
            self.delete_entry(&destination.join(name), pass);
        }
    }

    fn create_entry<F>(&self, source: &Path, destination: &Path, pass: &mut Pass<F>)
    where
        F: FnMut(&SyncEvent),
    {
        let kind = match fs::symlink_metadata(source) {
            Ok(metadata) => EntryKind::from_metadata(&metadata),
            Err(err) => {
                pass.failure(SyncFailure::io(source, FailedOperation::Inspect, &err));
                return;
            }
        };

        match kind {
            EntryKind::File => match copy_file(source, destination) {
                Ok(bytes) => {
                    pass.report.stats.files_copied += 1;
                    pass.report.stats.bytes_copied += bytes;
                    pass.action(SyncAction::created(EntryKind::File, destination));
                }
                Err(err) => {
                    pass.failure(SyncFailure::io(destination, FailedOperation::Create, &err));
                }
            },
            EntryKind::Directory => match copy_tree(source, destination, &self.classifier) {
                Ok(outcome) => {
                    pass.report.stats.files_copied += outcome.files;
                    pass.report.stats.bytes_copied += outcome.bytes;
                    pass.action(SyncAction::created(EntryKind::Directory, destination));
                    for failure in outcome.failures {
                        pass.failure(failure);
                    }
                    for path in outcome.skipped {
                        pass.skipped(path);
                    }
                }
                Err(err) => {
                    pass.failure(SyncFailure::io(destination, FailedOperation::Create, &err));
                }
            },
            EntryKind::Other => pass.skipped(source.to_path_buf()),
        }
    }

    fn update_file<F>(&self, source: &Path, destination: &Path, pass: &mut Pass<F>)
    where
        F: FnMut(&SyncEvent),
    {
        let source_node = match DirectoryNode::read(source) {
            Ok(node) => node,
            Err(err) => {
                pass.failure(SyncFailure::io(source, FailedOperation::Inspect, &err));
                return;
            }
        };
        let destination_node = match DirectoryNode::read(destination) {
            Ok(node) => node,
            Err(err) => {
                pass.failure(SyncFailure::io(destination, FailedOperation::Inspect, &err));
                return;
            }
        };

        if !source_node.metadata_differs(&destination_node) {
            return;
        }

        let Some(source_hash) = self.digest(source, pass) else {
            return;
        };
        let Some(destination_hash) = self.digest(destination, pass) else {
            return;
        };

        if source_hash == destination_hash {
            pass.report.stats.verified_unchanged += 1;
            tracing::trace!(path = %destination.display(), "metadata differs, content identical");
            return;
        }

        match overwrite_file(source, destination) {
            Ok(bytes) => {
                pass.report.stats.files_copied += 1;
                pass.report.stats.bytes_copied += bytes;
                pass.action(SyncAction::updated(destination));
            }
            Err(err) => {
                pass.failure(SyncFailure::io(destination, FailedOperation::Update, &err));
            }
        }
    }

    fn replace_entry<F>(&self, source: &Path, destination: &Path, pass: &mut Pass<F>)
    where
        F: FnMut(&SyncEvent),
    {
        match fs::symlink_metadata(source) {
            Ok(metadata) if EntryKind::from_metadata(&metadata).is_regular() => {}
            Ok(_) => {
                pass.skipped(source.to_path_buf());
                return;
            }
            Err(err) => {
                pass.failure(SyncFailure::io(source, FailedOperation::Inspect, &err));
                return;
            }
        }

        match remove_entry(destination) {
            Ok(kind) => pass.action(SyncAction::deleted(reported_kind(kind), destination)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                pass.failure(SyncFailure::io(destination, FailedOperation::Delete, &err));
                return;
            }
        }

        self.create_entry(source, destination, pass);
    }

    fn delete_entry<F>(&self, destination: &Path, pass: &mut Pass<F>)
    where
        F: FnMut(&SyncEvent),
    {
        match remove_entry(destination) {
            Ok(kind) => pass.action(SyncAction::deleted(reported_kind(kind), destination)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(path = %destination.display(), "already gone");
            }
            Err(err) => {
                pass.failure(SyncFailure::io(destination, FailedOperation::Delete, &err));
            }
        }
    }

    fn digest<F>(&self, path: &Path, pass: &mut Pass<F>) -> Option<ContentHash>
    where
        F: FnMut(&SyncEvent),
    {
        match self.hasher.digest(path) {
            Ok(hash) => {
                pass.report.stats.files_hashed += 1;
                Some(hash)
            }
            Err(err) => {
                pass.failure(SyncFailure::io(path, FailedOperation::Hash, &err));
                None
            }
        }
    }
}

/// State of a single pass.
struct Pass<F> {
    report: SyncReport,
    observer: F,
}

impl<F: FnMut(&SyncEvent)> Pass<F> {
    fn emit(&mut self, event: SyncEvent) {
        (self.observer)(&event);
        self.report.record(event);
    }

    fn action(&mut self, action: SyncAction) {
        self.emit(SyncEvent::Action(action));
    }

    fn failure(&mut self, failure: SyncFailure) {
        tracing::trace!(%failure, "entry failed");
        self.emit(SyncEvent::Failure(failure));
    }

    fn skipped(&mut self, path: PathBuf) {
        self.emit(SyncEvent::Skipped(path));
    }
}

/// Returns whether the destination root had to be created.
fn prepare_destination(destination: &Path) -> Result<bool, SyncError> {
    match fs::metadata(destination) {
        Ok(metadata) if metadata.is_dir() => Ok(false),
        Ok(_) => Err(SyncError::DestinationNotADirectory {
            path: destination.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(destination).map_err(|source| SyncError::DestinationCreate {
                path: destination.to_path_buf(),
                source,
            })?;
            tracing::debug!(path = %destination.display(), "created destination root");
            Ok(true)
        }
        Err(source) => Err(SyncError::Io {
            path: destination.to_path_buf(),
            source,
        }),
    }
}

/// Links and special files are reported as files.
fn reported_kind(kind: EntryKind) -> EntryKind {
    match kind {
        EntryKind::Directory => EntryKind::Directory,
        EntryKind::File | EntryKind::Other => EntryKind::File,
    }
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| c == Component::ParentDir)
}

/// Absolute, symlink-free form of `path`, even if its tail does not exist.
///
/// The longest existing prefix is canonicalized. The missing components
/// are applied to it lexically, so `..` pops the previous component.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let components: Vec<Component<'_>> = absolute.components().collect();

    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        let Ok(mut resolved) = prefix.canonicalize() else {
            continue;
        };
        for component in &components[split..] {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir => {}
                other => resolved.push(other),
            }
        }
        return Ok(resolved);
    }

    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_missing_tail() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let resolved = resolve(&temp.path().join("a/b")).unwrap();
        assert_eq!(resolved, base.join("a").join("b"));
    }

    #[test]
    fn test_resolve_existing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("x")).unwrap();
        let resolved = resolve(&temp.path().join("x/../x")).unwrap();
        assert_eq!(resolved, temp.path().canonicalize().unwrap().join("x"));
    }

    #[test]
    fn test_resolve_parent_after_missing_component() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("src")).unwrap();

        let resolved = resolve(&temp.path().join("src/missing/../../dst")).unwrap();
        assert_eq!(resolved, temp.path().canonicalize().unwrap().join("dst"));
    }

    #[test]
    fn test_destination_with_parent_components_is_not_overlap() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        let engine = SyncEngine::new(SyncConfig::new(&source, source.join("missing/../../dst")));
        let report = engine.sync().unwrap();

        assert!(report.destination_created);
        assert_eq!(report.actions.len(), 1);
        assert!(temp.path().join("dst/a.txt").exists());
        assert!(!source.join("missing").exists());
    }

    #[test]
    fn test_reported_kind() {
        assert_eq!(reported_kind(EntryKind::Other), EntryKind::File);
        assert_eq!(reported_kind(EntryKind::Directory), EntryKind::Directory);
    }

    #[test]
    fn test_nested_destination_rejected_before_mutation() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        let engine = SyncEngine::new(SyncConfig::new(&source, source.join("mirror")));
        let err = engine.sync().unwrap_err();

        assert!(matches!(err, SyncError::OverlappingRoots { .. }));
        assert!(!source.join("mirror").exists());
    }

    #[test]
    fn test_destination_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let destination = temp.path().join("dst");
        fs::create_dir(&source).unwrap();
        fs::write(&destination, "not a dir").unwrap();

        let err = SyncEngine::new(SyncConfig::new(&source, &destination))
            .sync()
            .unwrap_err();
        assert!(matches!(err, SyncError::DestinationNotADirectory { .. }));
    }
}
