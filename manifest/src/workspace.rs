//! Tick status and toggling against files on disk.

use std::io;
use std::path::{Path, PathBuf};

use dmlc_types::{TickRequest, TickState, TickableKind};
use dmlc_utils::{AtomicWriteOptions, PersistMode, atomic_write_with_options};

use crate::environment::ManifestFile;
use crate::error::ManifestError;
use crate::toggle::TickEdit;

/// Result of [`toggle_on_disk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub manifest: PathBuf,
    /// Backslash-separated path of the toggled file.
    pub include: String,
    pub edit: TickEdit,
    pub state: TickState,
}

/// The manifest for `root` and the include path of `file` inside it.
///
/// `None` when `file` is not under `root`.
#[must_use]
pub fn environment_path(
    root: &Path,
    environment_file: &str,
    file: &Path,
) -> Option<(PathBuf, String)> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some((root.join(environment_file), parts.join("\\")))
}

/// Whether `file` is ticked. `None` for files that cannot be ticked.
pub fn tick_status(
    root: &Path,
    environment_file: &str,
    file: &Path,
) -> Result<Option<TickState>, ManifestError> {
    let Some((manifest_path, include)) = environment_path(root, environment_file, file) else {
        return Ok(None);
    };
    if TickableKind::from_path(&include).is_none() {
        return Ok(None);
    }
    let text = read_manifest(&manifest_path)?;
    let manifest = ManifestFile::parse(&text);
    Ok(Some(TickState::from_included(manifest.is_included(&include))))
}

/// Apply `request` for `file` to the manifest on disk.
///
/// The manifest is re-read for every call and rewritten atomically with its
/// permissions kept. A manifest without an include region is left alone.
pub fn toggle_on_disk(
    root: &Path,
    environment_file: &str,
    file: &Path,
    request: TickRequest,
) -> Result<ToggleOutcome, ManifestError> {
    let (manifest_path, include) = environment_path(root, environment_file, file)
        .ok_or_else(|| ManifestError::OutsideWorkspace {
            path: file.to_path_buf(),
        })?;
    if TickableKind::from_path(&include).is_none() {
        return Err(ManifestError::NotTickable {
            path: file.to_path_buf(),
        });
    }

    let text = read_manifest(&manifest_path)?;
    let edit = ManifestFile::parse(&text).toggle(&include, request);
    let updated = edit.apply(&text);
    if edit.is_change() {
        let options = AtomicWriteOptions {
            sync: true,
            mode: existing_mode(&manifest_path),
        };
        atomic_write_with_options(&manifest_path, updated.as_bytes(), options).map_err(
            |source| ManifestError::Write {
                path: manifest_path.clone(),
                source,
            },
        )?;
        tracing::info!(
            manifest = %manifest_path.display(),
            include = %include,
            "{} include",
            request.verb()
        );
    }

    let state = TickState::from_included(ManifestFile::parse(&updated).is_included(&include));
    Ok(ToggleOutcome {
        manifest: manifest_path,
        include,
        edit,
        state,
    })
}

/// File name of the `.dme` in `root`, for hosts that have not heard the
/// environment name from the language server yet.
///
/// With several candidates the first in name order wins.
#[must_use]
pub fn detect_environment_file(root: &Path) -> Option<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dme"))
        })
        .collect();
    names.sort();
    if names.len() > 1 {
        tracing::debug!(candidates = ?names, "several environment files, using the first");
    }
    names.into_iter().next()
}

fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ManifestError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

#[cfg(unix)]
fn existing_mode(path: &Path) -> PersistMode {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| PersistMode::Preserve(meta.permissions().mode() & 0o7777))
        .unwrap_or_default()
}

#[cfg(not(unix))]
fn existing_mode(_path: &Path) -> PersistMode {
    PersistMode::Default
}
