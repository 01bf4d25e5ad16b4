//! Platform and architecture identifiers used to pick a server build.
//!
//! The names are the ones the update endpoint and the install layout expect,
//! not Rust's target names.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Operating-system family of a server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Darwin,
    Linux,
}

#[derive(Debug, Error)]
#[error("unknown platform '{0}' (expected windows, darwin or linux)")]
pub struct ParsePlatformError(String);

impl Platform {
    /// The platform this binary was compiled for, if builds exist for it.
    #[must_use]
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }

    /// Executable suffix; only the Windows family has one.
    #[must_use]
    pub const fn exe_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Darwin | Self::Linux => "",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Windows),
            "darwin" | "osx" | "macos" => Ok(Self::Darwin),
            "linux" => Ok(Self::Linux),
            _ => Err(ParsePlatformError(s.to_string())),
        }
    }
}

/// CPU architecture of a server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X32,
    X64,
    Arm64,
    /// Any other target; carries Rust's architecture name verbatim.
    Other(&'static str),
}

impl Arch {
    #[must_use]
    pub fn current() -> Self {
        Self::from_target(std::env::consts::ARCH)
    }

    #[must_use]
    pub fn from_target(arch: &'static str) -> Self {
        match arch {
            "x86" => Self::X32,
            "x86_64" => Self::X64,
            "aarch64" => Self::Arm64,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X32 => "x32",
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
