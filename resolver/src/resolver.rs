use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dmlc_types::{Arch, Platform, ServerLocation};
use dmlc_utils::{is_executable, md5_file};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::{ResolveError, UpdateError};
use crate::host::ResolverHost;
use crate::replace::{ReplacePolicy, promote_staged_update, staged_path};
use crate::update::{UpdateOutcome, UpdateRequest, run_update_check};

/// Prompt text when the configured override cannot be used.
pub const OVERRIDE_INVALID: &str = "configured executable missing or invalid.";
/// Prompt text after the user picked a path that cannot be used.
pub const PATH_NOT_VALID: &str = "path not valid";

const USER_AGENT: &str = concat!("dmlc/", env!("CARGO_PKG_VERSION"));

/// Tunables for a resolver pass.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// `None` when no prebuilt binaries exist for this OS.
    pub platform: Option<Platform>,
    pub arch: Arch,
    /// Pause after a fresh install before handing the binary out, so
    /// on-access virus scanners can finish with it.
    pub install_debounce: Duration,
    /// How often the settings are re-read while waiting for the user.
    pub poll_interval: Duration,
    pub replace: ReplacePolicy,
    pub connect_timeout: Duration,
    /// Whole-request limit, body included.
    pub request_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            arch: Arch::current(),
            install_debounce: Duration::from_millis(500),
            poll_interval: Duration::from_secs(1),
            replace: ReplacePolicy::default(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// `<install>/bin/dm-langserver-<arch>-<platform><ext>`
#[must_use]
pub fn default_server_path(install_dir: &Path, platform: Platform, arch: Arch) -> PathBuf {
    install_dir.join("bin").join(format!(
        "dm-langserver-{arch}-{platform}{}",
        platform.exe_suffix()
    ))
}

/// How a resolver pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ServerLocation),
    /// The user walked away from the prompt.
    Unresolved,
    /// Staged promotion or install setup failed; carries the error text.
    Failed(String),
}

impl Resolution {
    #[must_use]
    pub fn location(&self) -> Option<&ServerLocation> {
        match self {
            Self::Resolved(location) => Some(location),
            Self::Unresolved | Self::Failed(_) => None,
        }
    }
}

/// Update checks a pass left running after it returned.
///
/// Clones share the same set. The tasks are aborted once every clone is
/// dropped, so a caller that wants them finished must [`join`](Self::join).
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.lock().spawn(task);
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for every task, including ones started while waiting. Dropping
    /// the returned future aborts the tasks it had taken over.
    pub async fn join(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.lock());
            if set.is_empty() {
                return;
            }
            while let Some(result) = set.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("Background update task failed: {e}");
                }
            }
        }
    }
}

/// Decides which server executable to launch.
#[derive(Clone)]
pub struct Resolver {
    host: ResolverHost,
    client: reqwest::Client,
    options: ResolverOptions,
    background: BackgroundTasks,
}

impl Resolver {
    pub fn new(host: ResolverHost, options: ResolverOptions) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(ResolveError::HttpClient)?;
        Ok(Self {
            host,
            client,
            options,
            background: BackgroundTasks::default(),
        })
    }

    /// Refreshes started by [`resolve`](Self::resolve) on this resolver or
    /// its clones.
    #[must_use]
    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Run the pass on a background task. The handle reports "not ready"
    /// until it finishes.
    #[must_use]
    pub fn spawn(self) -> ResolverHandle {
        let (tx, rx) = watch::channel(None);
        let background = self.background.clone();
        tokio::spawn(async move {
            let resolution = match self.resolve().await {
                Ok(Some(location)) => Resolution::Resolved(location),
                Ok(None) => Resolution::Unresolved,
                Err(e) => {
                    tracing::error!("Server resolution failed: {e}");
                    Resolution::Failed(e.to_string())
                }
            };
            tx.send_replace(Some(resolution));
        });
        ResolverHandle { rx, background }
    }

    /// The whole pass. `Ok(None)` means the user abandoned the prompt.
    pub async fn resolve(&self) -> Result<Option<ServerLocation>, ResolveError> {
        if let Some(path) = self.host.settings.langserver_path() {
            return self.resolve_override(path).await;
        }

        let arch = self.options.arch;
        let Some(platform) = self.options.platform else {
            let message = format!(
                "Binaries are not available for {arch}-{}.",
                std::env::consts::OS
            );
            return Ok(self.prompt_for_server(message).await);
        };
        let Some(install_dir) = self.host.settings.install_dir() else {
            return Ok(self
                .prompt_for_server("no install directory is available.".to_string())
                .await);
        };

        let auto_file = default_server_path(&install_dir, platform, arch);
        let update_file = staged_path(&auto_file);
        promote_staged_update(&auto_file, &update_file, self.options.replace).await?;

        if is_executable(&auto_file) {
            let path = auto_file.clone();
            let hashed = tokio::task::spawn_blocking(move || md5_file(&path))
                .await
                .unwrap_or_else(|e| Err(io::Error::other(e)));
            match hashed {
                Ok(hash) => self.spawn_refresh(platform, update_file, hash),
                Err(e) => tracing::warn!("Skipping update check, cannot hash server: {e}"),
            }
            tracing::info!(path = %auto_file.display(), "Using installed dm-langserver");
            return Ok(Some(ServerLocation::new(auto_file)));
        }

        if let Some(bin_dir) = auto_file.parent() {
            std::fs::create_dir_all(bin_dir).map_err(|source| ResolveError::CreateDir {
                path: bin_dir.to_path_buf(),
                source,
            })?;
        }
        let request = UpdateRequest {
            platform,
            arch,
            destination: &auto_file,
            content_hash: None,
        };
        match run_update_check(&self.host, &self.client, request).await {
            Ok(_) if is_executable(&auto_file) => {
                tokio::time::sleep(self.options.install_debounce).await;
                tracing::info!(path = %auto_file.display(), "Installed dm-langserver");
                Ok(Some(ServerLocation::new(auto_file)))
            }
            Ok(_) => Ok(self
                .prompt_for_server("downloaded executable is not valid.".to_string())
                .await),
            Err(e) => {
                tracing::warn!("dm-langserver install failed: {e}");
                Ok(self.prompt_for_server(e.to_string()).await)
            }
        }
    }

    async fn resolve_override(&self, path: PathBuf) -> Result<Option<ServerLocation>, ResolveError> {
        promote_staged_update(&path, &staged_path(&path), self.options.replace).await?;
        if is_executable(&path) {
            tracing::info!(path = %path.display(), "Using configured dm-langserver");
            return Ok(Some(ServerLocation::new(path)));
        }
        tracing::warn!(path = %path.display(), "Configured dm-langserver is not usable");
        Ok(self.prompt_for_server(OVERRIDE_INVALID.to_string()).await)
    }

    fn spawn_refresh(&self, platform: Platform, update_file: PathBuf, hash: String) {
        let this = self.clone();
        self.background.spawn(async move {
            let request = UpdateRequest {
                platform,
                arch: this.options.arch,
                destination: &update_file,
                content_hash: Some(&hash),
            };
            match run_update_check(&this.host, &this.client, request).await {
                Ok(UpdateOutcome::Installed { announce: true }) => {
                    tracing::info!("dm-langserver update staged");
                    this.host.status.update_ready();
                }
                Ok(_) => {}
                Err(UpdateError::Disabled) => tracing::debug!("Auto-update disabled"),
                Err(e) => tracing::warn!("Background update check failed: {e}"),
            }
        });
    }

    /// Ask the user for a path until a valid one shows up in the settings.
    /// Returns `None` once the user declines.
    async fn prompt_for_server(&self, mut message: String) -> Option<ServerLocation> {
        let mut opened = false;
        let mut current = self.host.settings.langserver_path();
        loop {
            if !self.confirm_edit(message).await {
                tracing::info!("Server selection abandoned");
                return None;
            }
            if !opened {
                let prompter = Arc::clone(&self.host.prompter);
                if let Err(e) = tokio::task::spawn_blocking(move || prompter.open_settings()).await
                {
                    tracing::warn!("Failed to open settings: {e}");
                }
                opened = true;
            }

            loop {
                let latest = self.host.settings.langserver_path();
                if latest != current {
                    current = latest;
                    break;
                }
                tokio::time::sleep(self.options.poll_interval).await;
            }

            if let Some(path) = &current
                && is_executable(path)
            {
                tracing::info!(path = %path.display(), "Using selected dm-langserver");
                return Some(ServerLocation::new(path.clone()));
            }
            message = PATH_NOT_VALID.to_string();
        }
    }

    async fn confirm_edit(&self, message: String) -> bool {
        let prompter = Arc::clone(&self.host.prompter);
        tokio::task::spawn_blocking(move || prompter.confirm_edit(&message))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Prompt failed: {e}");
                false
            })
    }
}

/// Read side of a spawned resolver pass. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResolverHandle {
    rx: watch::Receiver<Option<Resolution>>,
    background: BackgroundTasks,
}

impl ResolverHandle {
    /// A handle that is already finished.
    #[must_use]
    pub fn ready(resolution: Resolution) -> Self {
        let (_tx, rx) = watch::channel(Some(resolution));
        Self {
            rx,
            background: BackgroundTasks::default(),
        }
    }

    /// Update checks the pass left running. Holding the handle keeps them
    /// alive.
    #[must_use]
    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The resolution, once the pass has finished.
    #[must_use]
    pub fn resolution(&self) -> Option<Resolution> {
        self.rx.borrow().clone()
    }

    /// The server path, once resolved successfully.
    #[must_use]
    pub fn location(&self) -> Option<ServerLocation> {
        self.rx
            .borrow()
            .as_ref()
            .and_then(Resolution::location)
            .cloned()
    }

    /// Wait for the pass to finish.
    pub async fn wait(&mut self) -> Resolution {
        let finished = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map(|value| value.clone());
        match finished {
            Ok(Some(resolution)) => resolution,
            // The task ended without reporting; only a panic gets here.
            _ => Resolution::Failed("resolver task ended".to_string()),
        }
    }
}
