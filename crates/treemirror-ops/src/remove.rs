//! Forced removal of destination entries.
//!
//! Removal is attempted as-is first. Only when that fails are write
//! protections cleared, recursively for directories, before a single
//! retry. Symbolic links are never followed.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use treemirror_core::EntryKind;

/// Make `path` and, for directories, everything below it writable.
///
/// Every entry is attempted; the first error encountered is returned.
pub fn clear_protections(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut first_error = make_writable(path, &metadata).err();

    if metadata.is_dir() {
        match fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries {
                    let result = entry.and_then(|e| clear_protections(&e.path()));
                    if let Err(err) = result {
                        first_error.get_or_insert(err);
                    }
                }
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Remove a file, link or whole directory subtree.
///
/// On failure the entry's protections are cleared and removal is retried
/// once; the retry's error is returned. Returns the kind that was removed.
pub fn remove_entry(path: &Path) -> io::Result<EntryKind> {
    let metadata = fs::symlink_metadata(path)?;
    let kind = EntryKind::from_metadata(&metadata);

    if let Err(err) = remove_once(path, kind) {
        tracing::debug!(path = %path.display(), error = %err, "removal failed, clearing protections");
        if let Err(clear_err) = clear_protections(path) {
            tracing::debug!(path = %path.display(), error = %clear_err, "could not clear all protections");
        }
        remove_once(path, kind)?;
    }

    Ok(kind)
}

/// Remove an entire destination root.
///
/// Returns `false` when there was nothing to remove.
pub fn purge_destination(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => {
            remove_entry(path)?;
            tracing::info!(path = %path.display(), "purged destination");
            Ok(true)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", path.display()),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn remove_once(path: &Path, kind: EntryKind) -> io::Result<()> {
    match kind {
        EntryKind::Directory => fs::remove_dir_all(path),
        EntryKind::File | EntryKind::Other => fs::remove_file(path),
    }
}

#[cfg(unix)]
fn make_writable(path: &Path, metadata: &Metadata) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    // Directories also need read and search to be listed and emptied.
    let wanted = if metadata.is_dir() {
        mode | 0o700
    } else {
        mode | 0o200
    };
    if wanted != mode {
        fs::set_permissions(path, fs::Permissions::from_mode(wanted))?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path, metadata: &Metadata) -> io::Result<()> {
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_readonly(path: &Path) {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path, permissions).unwrap();
    }

    #[test]
    fn test_remove_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f.txt");
        fs::write(&path, "x").unwrap();

        assert_eq!(remove_entry(&path).unwrap(), EntryKind::File);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_read_only_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("locked");
        fs::create_dir_all(root.join("inner")).unwrap();
        fs::write(root.join("inner/file.txt"), "x").unwrap();
        set_readonly(&root.join("inner/file.txt"));
        set_readonly(&root.join("inner"));
        set_readonly(&root);

        assert_eq!(remove_entry(&root).unwrap(), EntryKind::Directory);
        assert!(!root.exists());
    }

    #[test]
    fn test_remove_missing_entry() {
        let temp = TempDir::new().unwrap();
        let err = remove_entry(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_clear_protections_recursive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a"), "a").unwrap();
        set_readonly(&root.join("a"));
        set_readonly(&root);

        clear_protections(&root).unwrap();

        assert!(!fs::metadata(&root).unwrap().permissions().readonly());
        assert!(!fs::metadata(root.join("a")).unwrap().permissions().readonly());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_removed_not_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "k").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(remove_entry(&link).unwrap(), EntryKind::Other);
        assert!(target.join("keep.txt").exists());
    }

    #[test]
    fn test_purge_destination() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mirror");
        fs::create_dir_all(root.join("x")).unwrap();
        fs::write(root.join("x/y"), "y").unwrap();

        assert!(purge_destination(&root).unwrap());
        assert!(!root.exists());
        assert!(!purge_destination(&root).unwrap());
    }

    #[test]
    fn test_purge_refuses_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(purge_destination(&file).is_err());
        assert!(file.exists());
    }
}
