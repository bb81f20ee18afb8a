//! Running a pass on the blocking pool with streamed events.

use tokio::sync::mpsc;

use treemirror_core::{SyncConfig, SyncError, SyncEvent, SyncReport};

use crate::engine::SyncEngine;
use crate::SYNC_CHANNEL_SIZE;

/// Message sent through the channel while a pass runs.
#[derive(Debug)]
pub enum SyncMessage {
    /// An action, failure or skip, in the order it happened.
    Event(SyncEvent),
    /// The pass finished. Always the last message.
    Complete(Result<SyncReport, SyncError>),
}

/// Start a sync pass in the background.
///
/// The engine itself is synchronous, so it runs on a blocking task.
/// Returns a receiver for events and the final result.
pub fn start_sync(config: SyncConfig) -> mpsc::Receiver<SyncMessage> {
    let (tx, rx) = mpsc::channel(SYNC_CHANNEL_SIZE);

    tokio::task::spawn_blocking(move || {
        let engine = SyncEngine::new(config);
        let result = engine.sync_with(|event| {
            // A dropped receiver only means nobody is listening.
            let _ = tx.blocking_send(SyncMessage::Event(event.clone()));
        });
        let _ = tx.blocking_send(SyncMessage::Complete(result));
    });

    rx
}
