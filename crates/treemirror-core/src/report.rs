//! Actions and per-pass reports.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::SyncFailure;
use crate::node::EntryKind;

/// What was done to a destination entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ActionKind {
    Created,
    Updated,
    Deleted,
}

/// A change applied to the destination tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAction {
    /// The change made.
    pub action: ActionKind,
    /// Whether a file or a directory (subtree) was affected.
    pub kind: EntryKind,
    /// Destination path acted upon.
    pub path: PathBuf,
}

impl SyncAction {
    /// Create a new action record.
    pub fn new(action: ActionKind, kind: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self {
            action,
            kind,
            path: path.into(),
        }
    }

    /// Entry created in the destination.
    pub fn created(kind: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self::new(ActionKind::Created, kind, path)
    }

    /// File overwritten with new content.
    pub fn updated(path: impl Into<PathBuf>) -> Self {
        Self::new(ActionKind::Updated, EntryKind::File, path)
    }

    /// Entry removed from the destination.
    pub fn deleted(kind: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self::new(ActionKind::Deleted, kind, path)
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.action {
            ActionKind::Created => "copied",
            ActionKind::Updated => "updated",
            ActionKind::Deleted => "removed",
        };
        write!(f, "{} {}: {}", self.kind, verb, self.path.display())
    }
}

/// An event emitted while a pass runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    /// A change was applied.
    Action(SyncAction),
    /// An entry could not be processed.
    Failure(SyncFailure),
    /// A source entry that is neither file nor directory was left alone.
    Skipped(PathBuf),
}

/// Counters gathered during a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Bytes written to the destination.
    pub bytes_copied: u64,
    /// Files copied, including files inside copied directories.
    pub files_copied: u64,
    /// Files hashed during integrity checks.
    pub files_hashed: u64,
    /// Common files whose metadata differed but whose content matched.
    pub verified_unchanged: u64,
    /// Directories visited on both sides.
    pub dirs_compared: u64,
}

/// Result of one synchronization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Source root.
    pub source: PathBuf,
    /// Destination root.
    pub destination: PathBuf,
    /// Whether the destination root was missing and had to be created.
    pub destination_created: bool,
    /// Changes applied, in order.
    pub actions: Vec<SyncAction>,
    /// Per-entry failures, in order.
    pub failures: Vec<SyncFailure>,
    /// Source entries skipped because they are not files or directories.
    pub skipped: Vec<PathBuf>,
    /// Counters.
    pub stats: SyncStats,
    /// When the pass started.
    pub started_at: DateTime<Local>,
    /// How long the pass took.
    pub duration: Duration,
}

impl SyncReport {
    /// Create an empty report for a pass starting now.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            destination_created: false,
            actions: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            stats: SyncStats::default(),
            started_at: Local::now(),
            duration: Duration::ZERO,
        }
    }

    /// Record an event.
    pub fn record(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Action(action) => self.actions.push(action),
            SyncEvent::Failure(failure) => self.failures.push(failure),
            SyncEvent::Skipped(path) => self.skipped.push(path),
        }
    }

    /// Whether the pass changed nothing and failed nowhere.
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty() && self.failures.is_empty()
    }

    /// Whether any entry failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Count actions of one kind.
    pub fn count(&self, action: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.action == action).count()
    }

    /// Get a human-readable summary of the pass.
    pub fn summary(&self) -> String {
        let base = format!(
            "{} created, {} updated, {} deleted",
            self.count(ActionKind::Created),
            self.count(ActionKind::Updated),
            self.count(ActionKind::Deleted)
        );
        if self.failures.is_empty() {
            base
        } else {
            format!("{base}, {} failed", self.failures.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailedOperation;

    #[test]
    fn test_record_events() {
        let mut report = SyncReport::new("/src", "/dst");
        assert!(report.is_noop());

        report.record(SyncEvent::Action(SyncAction::created(EntryKind::File, "/dst/a")));
        report.record(SyncEvent::Action(SyncAction::deleted(
            EntryKind::Directory,
            "/dst/old",
        )));
        report.record(SyncEvent::Skipped(PathBuf::from("/src/link")));

        assert!(!report.is_noop());
        assert_eq!(report.count(ActionKind::Created), 1);
        assert_eq!(report.count(ActionKind::Deleted), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.summary(), "1 created, 0 updated, 1 deleted");
    }

    #[test]
    fn test_summary_with_failures() {
        let mut report = SyncReport::new("/src", "/dst");
        report.record(SyncEvent::Failure(SyncFailure::new(
            "/dst/x",
            FailedOperation::Update,
            "disk full",
        )));
        assert!(report.has_failures());
        assert!(!report.is_noop());
        assert!(report.summary().ends_with("1 failed"));
    }

    #[test]
    fn test_action_display() {
        let action = SyncAction::updated("/dst/a.txt");
        assert_eq!(action.to_string(), "File updated: /dst/a.txt");
    }
}
