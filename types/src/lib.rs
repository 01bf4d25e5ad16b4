//! Core domain types for dmlc.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the workspace.

mod location;
mod objtree;
mod platform;
mod tick;
mod update;

pub use location::ServerLocation;
pub use objtree::ObjectTreeType;
pub use platform::{Arch, ParsePlatformError, Platform};
pub use tick::{TickRequest, TickState, TickableKind};
pub use update::{UpdateConsent, UpdatePreference};
