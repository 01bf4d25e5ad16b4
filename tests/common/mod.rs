//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dmlc_config::{FileSettings, Settings};
use dmlc_resolver::{NoStatus, Prompter, ReplacePolicy, Resolver, ResolverHost, ResolverOptions};
use dmlc_types::{Arch, Platform};

/// Answers prompts from queues and records what was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    choices: Mutex<VecDeque<Option<usize>>>,
    confirms: Mutex<VecDeque<bool>>,
    messages: Mutex<Vec<String>>,
    on_open: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ScriptedPrompter {
    pub fn choosing(answers: &[Option<usize>]) -> Self {
        Self {
            choices: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn confirming(answers: &[bool]) -> Self {
        Self {
            confirms: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }

    /// Runs `edit` when the resolver opens the settings, standing in for
    /// the user changing the config file.
    pub fn on_open_settings(self, edit: impl FnOnce() + Send + 'static) -> Self {
        *self.on_open.lock().unwrap() = Some(Box::new(edit));
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&self, _choices: &[&str]) -> Option<usize> {
        self.choices.lock().unwrap().pop_front().flatten()
    }

    fn confirm_edit(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.confirms.lock().unwrap().pop_front().unwrap_or(false)
    }

    fn open_settings(&self) {
        if let Some(edit) = self.on_open.lock().unwrap().take() {
            edit();
        }
    }
}

/// A config file in a temporary directory plus an install directory.
pub struct ConfigFixture {
    pub dir: tempfile::TempDir,
    pub config_path: PathBuf,
    pub install_dir: PathBuf,
}

impl ConfigFixture {
    /// `extra` is appended to the `[dreammaker]` table.
    pub fn new(update_url: &str, extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let install_dir = dir.path().join("install");
        fs::write(
            &config_path,
            format!(
                "# written by the test\n[dreammaker]\nupdate_url = {update_url:?}\ninstall_dir = {:?}\n{extra}",
                install_dir.display().to_string()
            ),
        )
        .unwrap();
        Self {
            dir,
            config_path,
            install_dir,
        }
    }

    pub fn settings(&self) -> Arc<FileSettings> {
        Arc::new(FileSettings::new(&self.config_path))
    }

    pub fn config_text(&self) -> String {
        fs::read_to_string(&self.config_path).unwrap()
    }

    pub fn resolver(&self, prompter: Arc<ScriptedPrompter>) -> Resolver {
        let settings: Arc<dyn Settings> = self.settings();
        let host = ResolverHost {
            settings,
            prompter,
            status: Arc::new(NoStatus),
        };
        Resolver::new(host, fast_options()).unwrap()
    }
}

pub fn fast_options() -> ResolverOptions {
    ResolverOptions {
        platform: Some(Platform::Linux),
        arch: Arch::X64,
        install_debounce: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
        replace: ReplacePolicy {
            attempts: 2,
            delay: Duration::from_millis(1),
        },
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
    }
}

/// An executable shell script at `path`.
pub fn write_executable(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "#!/bin/sh\n").unwrap();
    dmlc_utils::mark_executable(path).unwrap();
}
