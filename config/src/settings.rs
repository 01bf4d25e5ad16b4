//! The settings collaborator consumed by the resolver and the adapters.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use dmlc_types::UpdatePreference;

use crate::{
    ConfigError, DEFAULT_UPDATE_URL, DmlcConfig, DreammakerConfig, Persisted, persist_value,
};

/// Read/write access to the user's settings.
///
/// Writes are durable before they return. Reads always reflect the latest
/// durable state, including edits made outside this process.
pub trait Settings: Send + Sync {
    fn langserver_path(&self) -> Option<PathBuf>;

    fn set_langserver_path(&self, path: &Path) -> Result<(), ConfigError>;

    fn update_preference(&self) -> UpdatePreference;

    /// Persist a preference. `UpdateOnce` is not persisted; `Unset` clears it.
    fn set_update_preference(&self, preference: UpdatePreference) -> Result<(), ConfigError>;

    fn byond_paths(&self) -> Vec<PathBuf>;

    fn update_url(&self) -> String;

    fn install_dir(&self) -> Option<PathBuf>;
}

/// Settings backed by the TOML config file, re-read on every access.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> DreammakerConfig {
        match DmlcConfig::load_from(&self.path) {
            Ok(config) => config.dreammaker,
            Err(e) => {
                tracing::warn!("Using default settings: {e}");
                DreammakerConfig::default()
            }
        }
    }
}

impl Settings for FileSettings {
    fn langserver_path(&self) -> Option<PathBuf> {
        self.current()
            .langserver_path
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn set_langserver_path(&self, path: &Path) -> Result<(), ConfigError> {
        persist_value(
            &self.path,
            "langserver_path",
            Persisted::Str(&path.to_string_lossy()),
        )
    }

    fn update_preference(&self) -> UpdatePreference {
        UpdatePreference::from_persisted(self.current().auto_update)
    }

    fn set_update_preference(&self, preference: UpdatePreference) -> Result<(), ConfigError> {
        match preference {
            UpdatePreference::UpdateOnce => Ok(()),
            UpdatePreference::Unset => persist_value(&self.path, "auto_update", Persisted::Remove),
            UpdatePreference::AlwaysUpdate | UpdatePreference::NeverUpdate => {
                let value = preference.to_persisted().unwrap_or(false);
                persist_value(&self.path, "auto_update", Persisted::Bool(value))
            }
        }
    }

    fn byond_paths(&self) -> Vec<PathBuf> {
        self.current().byond_path
    }

    fn update_url(&self) -> String {
        self.current()
            .update_url
            .unwrap_or_else(|| DEFAULT_UPDATE_URL.to_string())
    }

    fn install_dir(&self) -> Option<PathBuf> {
        self.current()
            .install_dir
            .or_else(crate::default_install_dir)
    }
}

/// In-process settings for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: Mutex<DreammakerConfig>,
}

impl MemorySettings {
    #[must_use]
    pub fn new(config: DreammakerConfig) -> Self {
        Self {
            inner: Mutex::new(config),
        }
    }

    /// Snapshot of the current values.
    #[must_use]
    pub fn snapshot(&self) -> DreammakerConfig {
        self.lock().clone()
    }

    /// Replace the override path without going through the trait.
    pub fn put_langserver_path(&self, path: Option<PathBuf>) {
        self.lock().langserver_path = path;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DreammakerConfig> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Settings for MemorySettings {
    fn langserver_path(&self) -> Option<PathBuf> {
        self.lock()
            .langserver_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn set_langserver_path(&self, path: &Path) -> Result<(), ConfigError> {
        self.lock().langserver_path = Some(path.to_path_buf());
        Ok(())
    }

    fn update_preference(&self) -> UpdatePreference {
        UpdatePreference::from_persisted(self.lock().auto_update)
    }

    fn set_update_preference(&self, preference: UpdatePreference) -> Result<(), ConfigError> {
        if preference != UpdatePreference::UpdateOnce {
            self.lock().auto_update = preference.to_persisted();
        }
        Ok(())
    }

    fn byond_paths(&self) -> Vec<PathBuf> {
        self.lock().byond_path.clone()
    }

    fn update_url(&self) -> String {
        self.lock()
            .update_url
            .clone()
            .unwrap_or_else(|| DEFAULT_UPDATE_URL.to_string())
    }

    fn install_dir(&self) -> Option<PathBuf> {
        self.lock().install_dir.clone()
    }
}
