//! Streaming BLAKE3 file digests.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;

use treemirror_core::{ContentHash, DEFAULT_HASH_CHUNK_SIZE};

/// Computes content fingerprints used to confirm file equality.
///
/// Files are streamed in fixed-size chunks, so memory use does not grow
/// with file size. The digest depends only on the bytes, never on name,
/// timestamps or permissions.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    chunk_size: usize,
}

impl ContentHasher {
    /// Create a hasher with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_HASH_CHUNK_SIZE)
    }

    /// Create a hasher reading `chunk_size` bytes at a time.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes read per step.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the digest of the file at `path`.
    ///
    /// Open and read failures are returned as-is, including failures
    /// partway through the file.
    pub fn digest(&self, path: &Path) -> io::Result<ContentHash> {
        let mut file = File::open(path)?;
        let mut hasher = Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let bytes_read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        let hash = ContentHash::new(*hasher.finalize().as_bytes());
        tracing::trace!(path = %path.display(), bytes = total, hash = %hash, "hashed file");
        Ok(hash)
    }

    /// Whether two files have identical content.
    pub fn same_content(&self, a: &Path, b: &Path) -> io::Result<bool> {
        Ok(self.digest(a)? == self.digest(b)?)
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
