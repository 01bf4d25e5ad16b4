use std::io;
use std::path::PathBuf;

use dmlc_types::{Arch, Platform};
use thiserror::Error;

use crate::replace::ReplaceError;

/// Why an update check did not produce a usable binary.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Auto-update disabled.")]
    Disabled,
    /// DNS, connect, TLS or timeout failure; carries the transport error text.
    #[error("{0}.")]
    Network(String),
    #[error("Server returned {status} {reason}.")]
    ServerRejected { status: u16, reason: String },
    #[error("Update endpoint removed, try updating the extension.")]
    EndpointRetired,
    #[error("Binaries are not available for {arch}-{platform}.")]
    PlatformUnsupported { platform: Platform, arch: Arch },
    #[error("Unknown Content-encoding: {0}")]
    UnknownEncoding(String),
    #[error("Failed to decompress update: {0}")]
    Decompress(#[source] io::Error),
    #[error("Invalid update URL '{url}': {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Failures that end a resolver pass without a prompt.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Replace(#[from] ReplaceError),
    #[error("Failed to create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
