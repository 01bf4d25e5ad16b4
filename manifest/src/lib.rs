//! The include list of a DreamMaker environment (`.dme`) file.
//!
//! A `.dme` file lists the code, map and interface files that make up a
//! project between two marker comments:
//!
//! ```text
//! // BEGIN_INCLUDE
//! #include "code\game.dm"
//! #include "maps\station.dmm"
//! // END_INCLUDE
//! ```
//!
//! Files are "ticked" when they appear in that list. [`ManifestFile`] parses
//! the list, [`ManifestFile::toggle`] computes the single-line edit that
//! ticks or unticks a file while keeping DreamMaker's ordering, and the
//! [`workspace`] functions apply the same edits to files on disk.

mod environment;
mod error;
mod order;
mod toggle;
pub mod workspace;

pub use environment::{
    BEGIN_MARKER, END_MARKER, INCLUDE_PREFIX, INCLUDE_SUFFIX, IncludeEntry, ManifestFile,
};
pub use error::ManifestError;
pub use order::{compare, sort_less};
pub use toggle::TickEdit;
pub use workspace::{
    ToggleOutcome, detect_environment_file, environment_path, tick_status, toggle_on_disk,
};
