//! Executable-bit checks for server binaries.

use std::fs;
use std::io;
use std::path::Path;

/// `S_IRUSR | S_IXUSR`.
pub(crate) const OWNER_READ_EXECUTE: u32 = 0o500;

/// Whether `path` is a file the current user can read and execute.
///
/// On Unix both owner bits must be set. Elsewhere, any existing regular file
/// counts, since there is no permission bit to check.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & OWNER_READ_EXECUTE == OWNER_READ_EXECUTE
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Add owner read + execute to an existing file.
pub fn mark_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        fs::set_permissions(path, fs::Permissions::from_mode(mode | OWNER_READ_EXECUTE))
    }

    #[cfg(not(unix))]
    {
        fs::metadata(path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(&dir.path().join("nope")));
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn plain_file_needs_mark() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server");
        fs::write(&path, b"bin").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!is_executable(&path));

        mark_executable(&path).unwrap();
        assert!(is_executable(&path));
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o744);
    }
}
