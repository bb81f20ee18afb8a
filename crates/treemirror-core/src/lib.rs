//! Core types for treemirror.
//!
//! This crate provides the data structures shared across the treemirror
//! workspace: filesystem entry nodes, sync configuration, action and
//! report records, and error types.

mod config;
mod error;
mod node;
mod report;

pub use config::{DEFAULT_HASH_CHUNK_SIZE, SyncConfig, SyncConfigBuilder, SyncMode};
pub use error::{FailedOperation, SyncError, SyncFailure};
pub use node::{ContentHash, DirectoryNode, EntryKind};
pub use report::{ActionKind, SyncAction, SyncEvent, SyncReport, SyncStats};
