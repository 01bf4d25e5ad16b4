//! Server executable resolution for the DreamMaker language client.
//!
//! [`Resolver`] decides which `dm-langserver` executable the protocol client
//! should launch. It honours a configured override, otherwise installs and
//! refreshes a prebuilt binary from the update endpoint, and falls back to
//! asking the user for a path. [`Resolver::spawn`] runs the whole pass on a
//! background task and hands back a [`ResolverHandle`] the host can poll.

mod error;
mod host;
mod replace;
mod resolver;
mod update;

pub use error::{ResolveError, UpdateError};
pub use host::{NoStatus, Prompter, ResolverHost, StatusSink};
pub use replace::{ReplaceError, ReplacePolicy, promote_staged_update, staged_path};
pub use resolver::{
    BackgroundTasks, OVERRIDE_INVALID, PATH_NOT_VALID, Resolution, Resolver, ResolverHandle,
    ResolverOptions, default_server_path,
};
pub use update::{UpdateCheckResult, UpdateOutcome, update_url};
