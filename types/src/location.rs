use std::path::{Path, PathBuf};

/// A server executable that was present and executable when it was resolved.
///
/// Only the resolver constructs these after checking the file. Nothing keeps
/// the file executable afterwards; a location is replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLocation {
    path: PathBuf,
}

impl ServerLocation {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}
