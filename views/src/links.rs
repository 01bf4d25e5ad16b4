//! Navigation links exchanged with the host.

use std::fmt;

const EXPAND: &str = "expand:";
const CONTRACT: &str = "contract:";
const FILE: &str = "file:";
const DMREF: &str = "dmref:";
const INFO_ANCHOR: &str = "info.html#";
const OPEN_REFERENCE: &str = "command:dreammaker.openReference";

/// A link clicked in one of the views.
///
/// Parsing never fails: anything outside the known vocabulary becomes
/// [`NavLink::Unknown`] and is left to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavLink {
    /// Show the children of an object tree type.
    Expand(String),
    /// Hide the children of an object tree type.
    Contract(String),
    /// Open a file in the editor.
    File(String),
    /// Look a DM path up in the reference.
    DmRef(String),
    /// `info.html#X` or `#X` inside a reference page.
    ReferenceEntry(String),
    /// The reference index page.
    ReferenceIndex,
    /// An `http://` or `https://` URL for the host's browser.
    External(String),
    Unknown(String),
}

impl NavLink {
    #[must_use]
    pub fn parse(href: &str) -> Self {
        if let Some(name) = href.strip_prefix(EXPAND) {
            Self::Expand(name.to_string())
        } else if let Some(name) = href.strip_prefix(CONTRACT) {
            Self::Contract(name.to_string())
        } else if let Some(path) = href.strip_prefix(FILE) {
            Self::File(path.to_string())
        } else if let Some(path) = href.strip_prefix(DMREF) {
            Self::DmRef(path.to_string())
        } else if let Some(path) = href.strip_prefix(INFO_ANCHOR) {
            Self::ReferenceEntry(path.to_string())
        } else if let Some(path) = href.strip_prefix('#') {
            Self::ReferenceEntry(path.to_string())
        } else if href == OPEN_REFERENCE {
            Self::ReferenceIndex
        } else if href.starts_with("http://") || href.starts_with("https://") {
            Self::External(href.to_string())
        } else {
            Self::Unknown(href.to_string())
        }
    }
}

impl fmt::Display for NavLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expand(name) => write!(f, "{EXPAND}{name}"),
            Self::Contract(name) => write!(f, "{CONTRACT}{name}"),
            Self::File(path) => write!(f, "{FILE}{path}"),
            Self::DmRef(path) => write!(f, "{DMREF}{path}"),
            Self::ReferenceEntry(path) => write!(f, "{INFO_ANCHOR}{path}"),
            Self::ReferenceIndex => f.write_str(OPEN_REFERENCE),
            Self::External(url) | Self::Unknown(url) => f.write_str(url),
        }
    }
}
