//! Auxiliary views for a DreamMaker editor session.
//!
//! Both views produce plain markup for the host to display and accept
//! navigation links back from it:
//!
//! - [`ObjectTreeState`] renders the object tree pushed by the language
//!   server, expanding and collapsing types on `expand:`/`contract:` links.
//! - [`ReferenceBrowser`] serves excerpts of the BYOND reference found in a
//!   local BYOND installation.
//!
//! Links are parsed into [`NavLink`] so hosts can route them without
//! matching on string prefixes.

mod links;
mod objtree;
mod reference;

pub use links::NavLink;
pub use objtree::{ObjectTreeState, PLACEHOLDER_LOADING, PLACEHOLDER_WAITING, render_tree};
pub use reference::{
    CONTENTS_PAGE, INFO_PAGE, ONLINE_REFERENCE, ReferenceBrowser, ReferenceError, clean_markup,
    decode_latin1, extract_entry, extract_index, flatten_pre, format_page,
};
