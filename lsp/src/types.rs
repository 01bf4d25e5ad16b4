//! Public types shared between the server tasks and the client facade.

use std::path::PathBuf;

use dmlc_types::{ObjectTreeType, ServerLocation};

use crate::protocol::WindowStatusParams;

/// How to launch dm-langserver.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub command: PathBuf,
    pub args: Vec<String>,
    /// Folder containing the `.dme` file.
    pub workspace_root: PathBuf,
}

impl LaunchConfig {
    #[must_use]
    pub fn new(location: &ServerLocation, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            command: location.path().to_path_buf(),
            args: Vec::new(),
            workspace_root: workspace_root.into(),
        }
    }
}

/// An event emitted by the server's reader task.
#[derive(Debug)]
pub enum LspEvent {
    WindowStatus(WindowStatusParams),
    ObjectTree(ObjectTreeType),
    ServerStopped(ServerStopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStopReason {
    /// The server closed its stdout.
    Exited,
    /// Reading from the server failed.
    Failed(String),
}
