//! Directory comparison for treemirror.
//!
//! This crate answers "what differs at this level" for a pair of
//! directories, and can capture a whole-tree snapshot for verification.
//!
//! # Overview
//!
//! - **Hidden predicate** - names starting with `.` are hidden
//! - **Entry classification** - one `read_dir` per side, partitioned into
//!   source-only, destination-only, common files, common directories and
//!   common entries of mismatched or unusual type
//! - **Snapshots** - serial `jwalk` traversal recording relative paths
//!
//! # Example
//!
//! ```rust,no_run
//! use treemirror_scan::{EntryClassifier, SyncMode};
//! use std::path::Path;
//!
//! let classifier = EntryClassifier::new(SyncMode::new(true));
//! let result = classifier
//!     .classify(Path::new("/data/source"), Path::new("/data/replica"))
//!     .unwrap();
//!
//! for name in &result.source_only {
//!     println!("missing in replica: {}", name.to_string_lossy());
//! }
//! ```

mod classify;
mod hidden;
mod snapshot;

pub use classify::{ComparisonResult, EntryClassifier, ListError};
pub use hidden::{HIDDEN_MARKER, HiddenPredicate, is_hidden};
pub use snapshot::{SnapshotEntry, SnapshotError, TreeSnapshot};

// Re-export core types for convenience
pub use treemirror_core::{EntryKind, SyncMode};
