//! Durable file replacement shared by the salt and database artifacts.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` by staging into a temporary file in the same
/// directory and atomically renaming it into place. A crash mid-write
/// leaves the previous committed contents intact.
///
/// `mode` is applied to the staged file before the rename so the target
/// never becomes visible with looser permissions (Unix only).
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent directory")
    })?;
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged.as_file().set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    staged.persist(path).map_err(|e| e.error)?;
    fsync_dir(dir)
}

/// Flushes the directory entry so the rename itself is durable.
pub(crate) fn fsync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    File::open(dir)?.sync_all()?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file_with_contents() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("artifact.bin");

        write_atomic(&path, b"payload", 0o600).expect("write failed");

        assert_eq!(fs::read(&path).expect("read back"), b"payload");
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("artifact.bin");

        write_atomic(&path, b"old", 0o600).expect("first write failed");
        write_atomic(&path, b"new", 0o600).expect("second write failed");

        assert_eq!(fs::read(&path).expect("read back"), b"new");
    }

    #[test]
    fn test_write_atomic_creates_missing_directories() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("artifact.bin");

        write_atomic(&path, b"payload", 0o600).expect("write failed");

        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("artifact.bin");

        write_atomic(&path, b"payload", 0o400).expect("write failed");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o400);
    }
}
