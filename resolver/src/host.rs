//! Editor-side collaborators the resolver talks to.

use std::sync::Arc;

use dmlc_config::Settings;

/// Interactive prompts. Calls block until the user answers, so the resolver
/// only ever invokes them from the blocking pool.
pub trait Prompter: Send + Sync {
    /// Pick one of `choices`. `None` when the user dismisses the prompt.
    fn choose(&self, choices: &[&str]) -> Option<usize>;

    /// Ask the user to edit the configured executable path. `message`
    /// explains what is wrong. Returns `false` when the user declines.
    fn confirm_edit(&self, message: &str) -> bool;

    /// Open the settings for editing. Called once per prompt sequence.
    fn open_settings(&self);
}

/// Receives the "update ready" signal from background refreshes.
pub trait StatusSink: Send + Sync {
    fn update_ready(&self);
}

/// A sink that drops every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn update_ready(&self) {}
}

/// Everything the resolver needs from its host.
#[derive(Clone)]
pub struct ResolverHost {
    pub settings: Arc<dyn Settings>,
    pub prompter: Arc<dyn Prompter>,
    pub status: Arc<dyn StatusSink>,
}
