//! Synchronization engine for treemirror.
//!
//! This crate applies one-way mirror passes: it copies new entries,
//! replaces files whose content changed, and force-deletes entries that
//! no longer exist in the source. Passes can run inline or on a blocking
//! task with events streamed over a channel.

mod copy;
mod engine;
mod remove;
mod task;

use std::path::PathBuf;

use treemirror_core::{SyncConfig, SyncError, SyncReport};

pub use copy::{CopyOutcome, copy_file, copy_tree, overwrite_file};
pub use engine::SyncEngine;
pub use remove::{clear_protections, purge_destination, remove_entry};
pub use task::{SyncMessage, start_sync};

/// Default channel buffer size for streamed sync events.
pub const SYNC_CHANNEL_SIZE: usize = 100;

/// Mirror `source` into `destination` once.
///
/// Empty or identical paths are rejected as [`SyncError::InvalidConfig`].
pub fn sync(
    source: impl Into<PathBuf>,
    destination: impl Into<PathBuf>,
    filter_hidden: bool,
) -> Result<SyncReport, SyncError> {
    let config = SyncConfig::builder()
        .source(source)
        .destination(destination)
        .filter_hidden(filter_hidden)
        .build()?;
    SyncEngine::new(config).sync()
}
