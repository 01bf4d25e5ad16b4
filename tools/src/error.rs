use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("You must configure \"dreammaker.byondPath\" to point to a valid BYOND installation.")]
    NoCompiler,
    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] std::io::Error),
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for the compiler: {0}")]
    Wait(#[source] std::io::Error),
}
