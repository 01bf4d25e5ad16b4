//! Language client for dm-langserver.
//!
//! [`LangClient`] launches the executable chosen by the resolver, performs
//! the LSP handshake with the DreamMaker extensions advertised, forwards
//! document changes and folds the server's `$window/status` and object tree
//! notifications into a [`ClientSession`].

pub mod codec;
pub mod types;

pub(crate) mod protocol;
pub(crate) mod server;

mod client;
mod session;

pub use client::{ClientUpdate, LangClient};
pub use protocol::{LANGUAGE_ID, WindowStatusParams, extra_capabilities};
pub use session::{ClientSession, DEFAULT_ENVIRONMENT, UPDATE_READY_SUFFIX, status_text};
pub use types::{LaunchConfig, LspEvent, ServerStopReason};
