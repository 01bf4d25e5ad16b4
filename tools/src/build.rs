//! Launching and cancelling compiler runs.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dmlc_types::Platform;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::{BuildEnd, BuildError, BuildOutput};

/// Compiler executables, Windows first.
pub const COMPILER_NAMES: [&str; 2] = ["dm.exe", "DreamMaker"];

const CHUNK_SIZE: usize = 8 * 1024;

/// Runs the compiler for one workspace, at most one build at a time.
///
/// Must be used from inside a tokio runtime.
pub struct BuildLauncher {
    installs: Vec<PathBuf>,
    current: Option<RunningBuild>,
}

struct RunningBuild {
    child: Child,
    cancelled: Arc<AtomicBool>,
    output: Arc<Mutex<BuildOutput>>,
    reader: Option<JoinHandle<()>>,
}

impl BuildLauncher {
    #[must_use]
    pub fn new(installs: Vec<PathBuf>) -> Self {
        Self {
            installs,
            current: None,
        }
    }

    /// Output of the current or most recent build.
    #[must_use]
    pub fn output(&self) -> Option<Arc<Mutex<BuildOutput>>> {
        self.current.as_ref().map(|run| Arc::clone(&run.output))
    }

    /// Starts compiling `environment_file` in `workspace_root`, killing any
    /// build still running. The new build gets a fresh output buffer.
    pub fn start(
        &mut self,
        workspace_root: &Path,
        environment_file: &str,
    ) -> Result<Arc<Mutex<BuildOutput>>, BuildError> {
        let compiler = dmlc_utils::find_byond_executable(&self.installs, &COMPILER_NAMES)
            .ok_or(BuildError::NoCompiler)?;

        self.cancel();

        let output = Arc::new(Mutex::new(BuildOutput::new()));
        lock(&output).append(&format!(
            "-- {} {environment_file}\n",
            compiler.display()
        ));

        let (reader, writer) = std::io::pipe().map_err(BuildError::Pipe)?;
        let child = {
            let stderr = writer.try_clone().map_err(BuildError::Pipe)?;
            let mut command = Command::new(&compiler);
            command
                .arg(environment_file)
                .current_dir(workspace_root)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(stderr)
                .kill_on_drop(true);
            if Platform::current() != Some(Platform::Windows)
                && let Some(dir) = compiler.parent()
            {
                command.env("LD_LIBRARY_PATH", dir);
            }
            // Dropping the command closes our copies of the pipe's write end,
            // so the reader sees EOF once the compiler exits.
            command.spawn().map_err(|source| BuildError::Spawn {
                program: compiler.clone(),
                source,
            })?
        };
        tracing::info!(
            compiler = %compiler.display(),
            environment = environment_file,
            pid = child.id(),
            "started build"
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let reader = {
            let output = Arc::clone(&output);
            let cancelled = Arc::clone(&cancelled);
            tokio::task::spawn_blocking(move || pump_output(reader, &output, &cancelled))
        };

        self.current = Some(RunningBuild {
            child,
            cancelled,
            output: Arc::clone(&output),
            reader: Some(reader),
        });
        Ok(output)
    }

    #[must_use]
    pub fn is_running(&mut self) -> bool {
        self.current
            .as_mut()
            .is_some_and(|run| matches!(run.child.try_wait(), Ok(None)))
    }

    /// Kills the running build. Returns whether there was one to kill.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(run) = self.current.as_mut() else {
            return false;
        };
        run.cancelled.store(true, Ordering::SeqCst);
        match run.child.start_kill() {
            Ok(()) => {
                tracing::info!("cancelled build");
                true
            }
            Err(e) => {
                tracing::warn!("failed to kill build: {e}");
                false
            }
        }
    }

    /// Waits for the current build to exit and its output to be fully
    /// collected. `None` when no build was ever started.
    pub async fn wait(&mut self) -> Result<Option<ExitStatus>, BuildError> {
        let Some(run) = self.current.as_mut() else {
            return Ok(None);
        };
        let status = run.child.wait().await.map_err(BuildError::Wait)?;
        if let Some(reader) = run.reader.take()
            && let Err(e) = reader.await
        {
            tracing::warn!("build output reader failed: {e}");
        }
        tracing::info!(%status, "build exited");
        Ok(Some(status))
    }
}

fn lock(output: &Mutex<BuildOutput>) -> std::sync::MutexGuard<'_, BuildOutput> {
    output.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copies decoded compiler output into `output` until EOF.
///
/// A multi-byte character split across reads is held back until the rest
/// arrives; any other invalid UTF-8 ends collection with an error line.
fn pump_output(mut reader: impl Read, output: &Mutex<BuildOutput>, cancelled: &AtomicBool) {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut pending = Vec::new();
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("reading build output failed: {e}");
                0
            }
        };
        pending.extend_from_slice(&chunk[..read]);

        let valid = match std::str::from_utf8(&pending) {
            Ok(_) => pending.len(),
            Err(e) if e.error_len().is_none() && read > 0 => e.valid_up_to(),
            Err(e) => {
                let mut output = lock(output);
                if let Ok(text) = std::str::from_utf8(&pending[..e.valid_up_to()]) {
                    output.append(text);
                }
                output.append(&format!("Error decoding output using utf-8 - {e}"));
                output.finish(BuildEnd::DecodeFailed);
                return;
            }
        };
        if let Ok(text) = std::str::from_utf8(&pending[..valid])
            && !text.is_empty()
        {
            lock(output).append(text);
        }
        pending.drain(..valid);

        if read == 0 {
            let end = if cancelled.load(Ordering::SeqCst) {
                BuildEnd::Cancelled
            } else {
                BuildEnd::Finished
            };
            lock(output).finish(end);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn pump_collects_until_eof() {
        let output = Mutex::new(BuildOutput::new());
        pump_output(
            Cursor::new(b"loading game.dme\r\ngame.dmb - 0 errors\r\n".to_vec()),
            &output,
            &AtomicBool::new(false),
        );
        let output = lock(&output);
        assert_eq!(
            output.text(),
            "loading game.dme\ngame.dmb - 0 errors\n-- Finished"
        );
        assert_eq!(output.end(), Some(BuildEnd::Finished));
    }

    #[test]
    fn pump_reports_cancellation() {
        let output = Mutex::new(BuildOutput::new());
        pump_output(Cursor::new(Vec::new()), &output, &AtomicBool::new(true));
        assert_eq!(lock(&output).text(), "-- Cancelled");
    }

    #[test]
    fn pump_stops_at_invalid_utf8() {
        let output = Mutex::new(BuildOutput::new());
        pump_output(
            Cursor::new(b"ok\n\xff\xfe more".to_vec()),
            &output,
            &AtomicBool::new(false),
        );
        let output = lock(&output);
        assert!(output.text().starts_with("ok\nError decoding output using utf-8 - "));
        assert_eq!(output.end(), Some(BuildEnd::DecodeFailed));
    }

    /// Hands out one byte per read so every multi-byte character is split.
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn pump_joins_split_characters() {
        let output = Mutex::new(BuildOutput::new());
        pump_output(
            Trickle(Cursor::new("naïve → ok\n".as_bytes().to_vec())),
            &output,
            &AtomicBool::new(false),
        );
        assert_eq!(lock(&output).text(), "naïve → ok\n-- Finished");
    }

    #[cfg(unix)]
    fn fake_compiler(install: &Path, script: &str) -> PathBuf {
        let bin = install.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let compiler = bin.join("DreamMaker");
        std::fs::write(&compiler, format!("#!/bin/sh\n{script}")).unwrap();
        dmlc_utils::mark_executable(&compiler).unwrap();
        compiler
    }

    #[cfg(unix)]
    async fn wait_for_text(output: &Mutex<BuildOutput>, needle: &str) {
        for _ in 0..200 {
            if lock(output).text().contains(needle) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        panic!("output never contained {needle:?}: {:?}", lock(output).text());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn build_merges_streams_and_finishes() {
        let install = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let compiler = fake_compiler(
            install.path(),
            "echo \"loading $1\"\n\
             echo \"code/a.dm:3:error: bad thing\" >&2\n\
             printf 'LD=%s\\r\\n' \"$LD_LIBRARY_PATH\"\n\
             touch game.dmb\n",
        );

        let mut launcher = BuildLauncher::new(vec![install.path().to_path_buf()]);
        let output = launcher.start(workspace.path(), "game.dme").unwrap();
        let status = launcher.wait().await.unwrap().unwrap();
        assert!(status.success());

        let output = lock(&output);
        assert_eq!(
            output.text(),
            format!(
                "-- {} game.dme\nloading game.dme\ncode/a.dm:3:error: bad thing\nLD={}\n-- Finished",
                compiler.display(),
                install.path().join("bin").display()
            )
        );
        assert_eq!(output.messages().len(), 1);
        assert!(workspace.path().join("game.dmb").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_kills_running_build() {
        let install = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        fake_compiler(install.path(), "echo started\nexec sleep 30\n");

        let mut launcher = BuildLauncher::new(vec![install.path().to_path_buf()]);
        let output = launcher.start(workspace.path(), "game.dme").unwrap();
        wait_for_text(&output, "started").await;
        assert!(launcher.is_running());

        assert!(launcher.cancel());
        let status = launcher.wait().await.unwrap().unwrap();
        assert!(!status.success());
        assert!(lock(&output).text().ends_with("started\n-- Cancelled"));
        assert_eq!(lock(&output).end(), Some(BuildEnd::Cancelled));
        assert!(!launcher.cancel());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn new_build_replaces_running_one() {
        let install = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        fake_compiler(
            install.path(),
            "if [ \"$1\" = slow.dme ]; then echo started; exec sleep 30; fi\necho fast\n",
        );

        let mut launcher = BuildLauncher::new(vec![install.path().to_path_buf()]);
        let first = launcher.start(workspace.path(), "slow.dme").unwrap();
        wait_for_text(&first, "started").await;

        let second = launcher.start(workspace.path(), "fast.dme").unwrap();
        launcher.wait().await.unwrap();
        assert!(lock(&second).text().ends_with("fast\n-- Finished"));

        wait_for_text(&first, "-- Cancelled").await;
        assert!(Arc::ptr_eq(&launcher.output().unwrap(), &second));
    }

    #[tokio::test]
    async fn start_without_compiler_fails() {
        let empty = tempfile::tempdir().unwrap();
        let mut launcher = BuildLauncher::new(vec![empty.path().to_path_buf()]);
        let err = launcher.start(empty.path(), "game.dme").unwrap_err();
        assert!(matches!(err, BuildError::NoCompiler));
        assert!(launcher.output().is_none());
        assert_eq!(launcher.wait().await.unwrap(), None);
        assert!(!launcher.cancel());
    }
}
