//! Per-session client state: environment name, status text, update flag and
//! the latest object tree.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dmlc_resolver::StatusSink;
use dmlc_types::ObjectTreeType;

use crate::protocol::WindowStatusParams;

pub const DEFAULT_ENVIRONMENT: &str = "DM";
pub const UPDATE_READY_SUFFIX: &str = " - update ready";

/// Status bar text for an environment and its running tasks.
///
/// `tasks` is `None` before the server has reported anything.
#[must_use]
pub fn status_text(environment: &str, tasks: Option<&[String]>, update_ready: bool) -> String {
    let mut text = match tasks {
        None => format!("{environment}: Starting..."),
        Some([]) => format!("{environment}: ready"),
        Some([task]) => format!("{environment}: {task}"),
        Some(tasks) => format!("{environment} ({}): {}", tasks.len(), tasks.join("; ")),
    };
    if update_ready {
        text.push_str(UPDATE_READY_SUFFIX);
    }
    text
}

#[derive(Debug)]
struct SessionState {
    environment: String,
    tasks: Option<Vec<String>>,
    update_ready: bool,
    initialized: bool,
    object_tree: Option<ObjectTreeType>,
}

/// State of one language client session. Shared between the host and the
/// resolver's background refresh, so all access goes through `&self`.
#[derive(Debug)]
pub struct ClientSession {
    state: Mutex<SessionState>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                environment: DEFAULT_ENVIRONMENT.to_string(),
                tasks: None,
                update_ready: false,
                initialized: false,
                object_tree: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn environment(&self) -> String {
        self.lock().environment.clone()
    }

    /// `<environment>.dme`
    #[must_use]
    pub fn environment_file(&self) -> String {
        format!("{}.dme", self.lock().environment)
    }

    #[must_use]
    pub fn status_text(&self) -> String {
        let state = self.lock();
        status_text(&state.environment, state.tasks.as_deref(), state.update_ready)
    }

    /// Apply a `$window/status` notification and return the new status text.
    pub fn apply_window_status(&self, params: WindowStatusParams) -> String {
        let mut state = self.lock();
        if let Some(environment) = params.environment.filter(|e| !e.is_empty()) {
            if environment != state.environment {
                tracing::info!(%environment, "Environment changed");
            }
            state.environment = environment;
        }
        state.tasks = Some(params.tasks.unwrap_or_default());
        status_text(&state.environment, state.tasks.as_deref(), state.update_ready)
    }

    #[must_use]
    pub fn is_update_ready(&self) -> bool {
        self.lock().update_ready
    }

    pub fn mark_initialized(&self) {
        self.lock().initialized = true;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn set_object_tree(&self, root: ObjectTreeType) {
        tracing::debug!(types = root.type_count(), "Object tree received");
        self.lock().object_tree = Some(root);
    }

    #[must_use]
    pub fn object_tree(&self) -> Option<ObjectTreeType> {
        self.lock().object_tree.clone()
    }
}

impl StatusSink for ClientSession {
    fn update_ready(&self) {
        self.lock().update_ready = true;
    }
}
