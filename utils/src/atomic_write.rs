//! Atomic file write helpers.
//!
//! Server binaries, `.dme` manifests and the config file are all replaced
//! through a temp file in the same directory followed by a rename, so a
//! reader sees either the old or the new contents.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Keep whatever mode the temp file was created with.
    #[default]
    Default,
    /// Add owner read + execute on top of the created mode (Unix).
    ///
    /// Ignored on non-Unix platforms, where any present file runs.
    Executable,
    /// Preserve an existing Unix mode from a previously-materialized file.
    ///
    /// Ignored on non-Unix platforms.
    Preserve(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteOptions {
    /// Call `sync_all` on the temp file before persisting.
    pub sync: bool,
    /// Permission policy for the persisted file.
    pub mode: PersistMode,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            sync: true,
            mode: PersistMode::Default,
        }
    }
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write_with_options(path, bytes, AtomicWriteOptions::default())
}

/// Write `bytes` to `path` through a sibling temp file.
///
/// Permissions are applied to the temp file before the rename, so the file
/// never appears at `path` without them.
pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    apply_mode(tmp.as_file(), options.mode)?;
    if options.sync {
        tmp.as_file().sync_all()?;
    }
    persist_over(tmp, path)
}

/// Rename `tmp` onto `path`. Windows refuses to rename over an existing
/// file, so the old file is moved to `.bak` first and restored on failure.
fn persist_over(tmp: NamedTempFile, path: &Path) -> io::Result<()> {
    let err = match tmp.persist(path) {
        Ok(_) => return Ok(()),
        Err(err) if path.exists() => err,
        Err(err) => return Err(err.error),
    };

    let backup = path.with_extension("bak");
    let _ = fs::remove_file(&backup);
    fs::rename(path, &backup)?;
    if let Err(retry) = err.file.persist(path) {
        let _ = fs::rename(&backup, path);
        return Err(retry.error);
    }
    if let Err(e) = fs::remove_file(&backup) {
        tracing::warn!(path = %backup.display(), "Leftover backup after atomic write: {e}");
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(file: &fs::File, mode: PersistMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let new_mode = match mode {
        PersistMode::Default => return Ok(()),
        PersistMode::Executable => {
            file.metadata()?.permissions().mode() | crate::exec::OWNER_READ_EXECUTE
        }
        PersistMode::Preserve(mode) => mode,
    };
    file.set_permissions(fs::Permissions::from_mode(new_mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &fs::File, _mode: PersistMode) -> io::Result<()> {
    Ok(())
}
