//! Filesystem entry types.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// BLAKE3 content hash used to confirm or refute file equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Type of file system entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic links, sockets, devices, fifos.
    Other,
}

impl EntryKind {
    /// Classify metadata obtained without following symlinks.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a file or a directory.
    pub fn is_regular(&self) -> bool {
        !matches!(self, EntryKind::Other)
    }
}

/// A single file or directory, read fresh from storage.
///
/// Nodes are never cached between passes; every comparison calls
/// [`DirectoryNode::read`] again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Full path of the entry.
    pub path: PathBuf,

    /// Final name component (lossy for display).
    pub name: CompactString,

    /// Entry type. Symbolic links are [`EntryKind::Other`].
    pub kind: EntryKind,

    /// Size in bytes (as reported by the filesystem for directories).
    pub size: u64,

    /// Last modification time.
    pub modified: SystemTime,

    /// Whether the read-only attribute is set.
    pub readonly: bool,

    /// Unix permission bits, when the platform has them.
    pub mode: Option<u32>,
}

impl DirectoryNode {
    /// Read the node at `path` without following symbolic links.
    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    /// Build a node from already-fetched metadata.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_default();
        let permissions = metadata.permissions();

        #[cfg(unix)]
        let mode = Some(permissions.mode());
        #[cfg(not(unix))]
        let mode = None;

        Self {
            name,
            kind: EntryKind::from_metadata(metadata),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            readonly: permissions.readonly(),
            mode,
            path,
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this node is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Whether size or modification time differ from `other`.
    ///
    /// This is only a hint; callers confirm with a content hash.
    pub fn metadata_differs(&self, other: &DirectoryNode) -> bool {
        self.size != other.size || self.modified != other.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_hex().starts_with("abab"));
        assert_eq!(hash.to_string(), hash.to_hex());
    }

    #[test]
    fn test_read_file_node() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let node = DirectoryNode::read(&path).unwrap();
        assert!(node.is_file());
        assert!(!node.is_dir());
        assert_eq!(node.size, 5);
        assert_eq!(node.name, "a.txt");
    }

    #[test]
    fn test_read_directory_node() {
        let temp = TempDir::new().unwrap();
        let node = DirectoryNode::read(temp.path()).unwrap();
        assert!(node.is_dir());
        assert_eq!(node.kind.to_string(), "Directory");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_other() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let node = DirectoryNode::read(&link).unwrap();
        assert_eq!(node.kind, EntryKind::Other);
        assert!(!node.kind.is_regular());
    }

    #[test]
    fn test_metadata_differs() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "longer").unwrap();

        let node_a = DirectoryNode::read(&a).unwrap();
        let node_b = DirectoryNode::read(&b).unwrap();
        assert!(node_a.metadata_differs(&node_b));
        assert!(!node_a.metadata_differs(&node_a.clone()));
    }

    #[test]
    fn test_read_missing_path() {
        let temp = TempDir::new().unwrap();
        let err = DirectoryNode::read(temp.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
