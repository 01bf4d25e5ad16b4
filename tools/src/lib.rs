//! DreamMaker compile launcher.
//!
//! [`BuildLauncher`] runs the BYOND compiler (`dm.exe` or `DreamMaker`) on a
//! workspace's `.dme` file. Compiler output is collected into a
//! [`BuildOutput`] shared behind a mutex so the host can redraw its output
//! panel while the build runs. Lines matching [`ERROR_LINE_PATTERN`] can be
//! turned into [`CompileMessage`]s for jump-to-error support.

mod build;
mod error;
mod output;

pub use build::{BuildLauncher, COMPILER_NAMES};
pub use error::BuildError;
pub use output::{BuildEnd, BuildOutput, CompileMessage, ERROR_LINE_PATTERN};
