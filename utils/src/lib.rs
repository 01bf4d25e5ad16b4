//! Shared filesystem utilities for dmlc.
//!
//! - **`byond`**: Lookup of files inside BYOND installations
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`exec`**: Executable-bit checks for server binaries
//! - **`hash`**: MD5 content hashing used as an update cache validator

pub mod atomic_write;
pub mod byond;
pub mod exec;
pub mod hash;

pub use atomic_write::{AtomicWriteOptions, PersistMode, atomic_write, atomic_write_with_options};
pub use byond::{find_byond_executable, find_byond_file};
pub use exec::{is_executable, mark_executable};
pub use hash::md5_file;
