//! Configuration for dmlc.
//!
//! The file lives at `<config dir>/dmlc/config.toml` (or `$DMLC_CONFIG`) and
//! holds one `[dreammaker]` table:
//!
//! ```toml
//! [dreammaker]
//! langserver_path = "/opt/dm-langserver"
//! auto_update = true
//! byond_path = ["C:\\Program Files (x86)\\BYOND"]
//! ```
//!
//! Reads go through `serde`/`toml`; writes go through `toml_edit` so comments
//! and formatting the user wrote survive.

mod settings;

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

pub use settings::{FileSettings, MemorySettings, Settings};

/// Public endpoint serving prebuilt language-server binaries.
pub const DEFAULT_UPDATE_URL: &str = "https://wombat.platymuus.com/ss13/dm-langserver/update.php";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DMLC_CONFIG";

const TABLE: &str = "dreammaker";

#[derive(Debug, Default, Deserialize)]
pub struct DmlcConfig {
    #[serde(default)]
    pub dreammaker: DreammakerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DreammakerConfig {
    /// Explicit server executable. Disables auto-update when set.
    pub langserver_path: Option<PathBuf>,
    /// Persisted auto-update preference; absent means "ask".
    pub auto_update: Option<bool>,
    /// BYOND installation directories, searched in order.
    #[serde(default)]
    pub byond_path: Vec<PathBuf>,
    /// Update endpoint base URL.
    pub update_url: Option<String>,
    /// Directory holding `bin/dm-langserver-*`.
    pub install_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to edit config at {}: {source}", path.display())]
    Edit {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("failed to write config at {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Edit { path, .. }
            | ConfigError::Write { path, .. } => path,
        }
    }
}

impl DmlcConfig {
    /// Load the config at `path`. A missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// A single value to write back into the `[dreammaker]` table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Persisted<'a> {
    Str(&'a str),
    Bool(bool),
    Remove,
}

/// Set or remove `[dreammaker].<key>`, keeping the rest of the document intact.
///
/// Creates the file and its parent directory if they don't exist.
pub(crate) fn persist_value(path: &Path, key: &str, value: Persisted<'_>) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|source| ConfigError::Edit {
            path: path.to_path_buf(),
            source,
        })?;

    if !doc.contains_table(TABLE) {
        doc[TABLE] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    match value {
        Persisted::Str(s) => doc[TABLE][key] = toml_edit::value(s),
        Persisted::Bool(b) => doc[TABLE][key] = toml_edit::value(b),
        Persisted::Remove => {
            if let Some(table) = doc[TABLE].as_table_mut() {
                table.remove(key);
            }
        }
    }

    dmlc_utils::atomic_write(path, doc.to_string().as_bytes()).map_err(write_err)?;
    tracing::debug!(path = %path.display(), key, "Persisted config value");
    Ok(())
}

/// Location of the config file: `$DMLC_CONFIG`, else `<config dir>/dmlc/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV)
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join("dmlc").join("config.toml"))
}

/// Default install root for downloaded server binaries.
#[must_use]
pub fn default_install_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("dmlc"))
}
