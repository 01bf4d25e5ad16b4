//! Lookup of files inside configured BYOND installations.

use std::path::PathBuf;

/// First existing `<install>/<relative>` over `installs`, trying each
/// candidate in order within one install before moving to the next.
#[must_use]
pub fn find_byond_file(installs: &[PathBuf], candidates: &[&str]) -> Option<PathBuf> {
    installs.iter().find_map(|install| {
        candidates
            .iter()
            .map(|relative| install.join(relative))
            .find(|path| path.is_file())
    })
}

/// The compiler or another BYOND tool: `<install>/bin/<name>`, then
/// `<install>/<name>`.
#[must_use]
pub fn find_byond_executable(installs: &[PathBuf], names: &[&str]) -> Option<PathBuf> {
    installs.iter().find_map(|install| {
        names.iter().find_map(|name| {
            [install.join("bin").join(name), install.join(name)]
                .into_iter()
                .find(|path| crate::is_executable(path))
        })
    })
}
