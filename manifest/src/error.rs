use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("There does not appear to be a .dme file.")]
    Missing { path: PathBuf },
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{} is not a tickable file", path.display())]
    NotTickable { path: PathBuf },
    #[error("{} is outside the workspace", path.display())]
    OutsideWorkspace { path: PathBuf },
}
