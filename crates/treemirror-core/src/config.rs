//! Synchronization configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default number of bytes read per hashing step.
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Mode flags fixed for a whole tree walk.
///
/// Set once at the top call and threaded unchanged through every level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMode {
    /// Exclude hidden entries from comparison, copy and deletion.
    pub filter_hidden: bool,
}

impl SyncMode {
    /// Create a mode.
    pub fn new(filter_hidden: bool) -> Self {
        Self { filter_hidden }
    }
}

/// Configuration for a mirror pass.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SyncConfig {
    /// Directory to mirror from.
    pub source: PathBuf,

    /// Directory to mirror into.
    pub destination: PathBuf,

    /// Skip entries whose name starts with `.`.
    #[builder(default = "false")]
    #[serde(default)]
    pub filter_hidden: bool,

    /// Bytes read per hashing step.
    #[builder(default = "DEFAULT_HASH_CHUNK_SIZE")]
    #[serde(default = "default_hash_chunk_size")]
    pub hash_chunk_size: usize,
}

fn default_hash_chunk_size() -> usize {
    DEFAULT_HASH_CHUNK_SIZE
}

impl SyncConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let source = match self.source {
            Some(ref source) if !source.as_os_str().is_empty() => source,
            Some(_) => return Err("Source path cannot be empty".to_string()),
            None => return Err("Source path is required".to_string()),
        };
        let destination = match self.destination {
            Some(ref destination) if !destination.as_os_str().is_empty() => destination,
            Some(_) => return Err("Destination path cannot be empty".to_string()),
            None => return Err("Destination path is required".to_string()),
        };
        if source == destination {
            return Err("Source and destination must differ".to_string());
        }
        if self.hash_chunk_size == Some(0) {
            return Err("Hash chunk size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl SyncConfig {
    /// Create a new config builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Create a config with default options.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            filter_hidden: false,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
        }
    }

    /// Set hidden-entry filtering.
    pub fn with_filter_hidden(mut self, filter_hidden: bool) -> Self {
        self.filter_hidden = filter_hidden;
        self
    }

    /// The walk mode derived from this config.
    pub fn mode(&self) -> SyncMode {
        SyncMode::new(self.filter_hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::builder()
            .source("/data/src")
            .destination("/data/dst")
            .filter_hidden(true)
            .hash_chunk_size(4096usize)
            .build()
            .unwrap();

        assert_eq!(config.source, PathBuf::from("/data/src"));
        assert_eq!(config.destination, PathBuf::from("/data/dst"));
        assert!(config.filter_hidden);
        assert_eq!(config.hash_chunk_size, 4096);
        assert_eq!(config.mode(), SyncMode::new(true));
    }

    #[test]
    fn test_config_defaults() {
        let config = SyncConfig::builder()
            .source("/a")
            .destination("/b")
            .build()
            .unwrap();
        assert!(!config.filter_hidden);
        assert_eq!(config.hash_chunk_size, DEFAULT_HASH_CHUNK_SIZE);
    }

    #[test]
    fn test_config_rejects_missing_paths() {
        assert!(SyncConfig::builder().destination("/b").build().is_err());
        assert!(SyncConfig::builder().source("/a").build().is_err());
        assert!(SyncConfig::builder().source("").destination("/b").build().is_err());
    }

    #[test]
    fn test_config_rejects_same_paths() {
        let result = SyncConfig::builder().source("/a").destination("/a").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_zero_chunk() {
        let result = SyncConfig::builder()
            .source("/a")
            .destination("/b")
            .hash_chunk_size(0usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_simple() {
        let config = SyncConfig::new("/a", "/b").with_filter_hidden(true);
        assert!(config.mode().filter_hidden);
    }
}
