//! Ticking: whether a source file is listed in the environment's include list.

use serde::Deserialize;

/// Desired membership after an include-list edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickRequest {
    Tick,
    Untick,
    Toggle,
}

impl TickRequest {
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Tick => "Tick",
            Self::Untick => "Untick",
            Self::Toggle => "Toggle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    Ticked,
    Unticked,
}

impl TickState {
    #[must_use]
    pub const fn from_included(included: bool) -> Self {
        if included { Self::Ticked } else { Self::Unticked }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ticked => "Ticked",
            Self::Unticked => "Unticked",
        }
    }
}

/// File kinds that may appear in an include list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickableKind {
    /// `.dm` code file.
    Code,
    /// `.dmm` map.
    Map,
    /// `.dmf` interface.
    Interface,
    /// `.dms` script.
    Script,
}

impl TickableKind {
    pub const ALL: [Self; 4] = [Self::Code, Self::Map, Self::Interface, Self::Script];

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Code => "dm",
            Self::Map => "dmm",
            Self::Interface => "dmf",
            Self::Script => "dms",
        }
    }

    /// Classify a path by its extension. Matching is exact (case-sensitive).
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}
