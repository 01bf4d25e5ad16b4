//! Subcommand implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dmlc_config::Settings;
use dmlc_lsp::{ClientSession, ClientUpdate, LangClient};
use dmlc_manifest::{detect_environment_file, tick_status, toggle_on_disk};
use dmlc_resolver::{Resolution, Resolver, ResolverHandle, ResolverHost, ResolverOptions};
use dmlc_tools::{BuildLauncher, BuildOutput};
use dmlc_types::TickRequest;
use dmlc_views::{NavLink, ObjectTreeState, ReferenceBrowser};

const OUTPUT_POLL: Duration = Duration::from_millis(50);
const EVENT_POLL: Duration = Duration::from_millis(100);
const EVENT_BUDGET: usize = 64;
/// Upper bound on waiting for the update check of an installed server.
const REFRESH_GRACE: Duration = Duration::from_secs(600);

/// The folder being edited and its environment file.
pub struct Workspace {
    root: PathBuf,
    environment: Option<String>,
}

impl Workspace {
    pub fn new(root: &Path, environment: Option<String>) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("workspace folder {} not found", root.display()))?;
        let environment = environment.or_else(|| detect_environment_file(&root));
        Ok(Self { root, environment })
    }

    fn environment(&self) -> Result<&str> {
        match &self.environment {
            Some(environment) => Ok(environment),
            None => bail!("There does not appear to be a .dme file."),
        }
    }

    fn file(&self, file: &Path) -> Result<PathBuf> {
        file.canonicalize()
            .with_context(|| format!("{} not found", file.display()))
    }
}

pub async fn resolve(host: ResolverHost) -> Result<ExitCode> {
    let mut handle = Resolver::new(host, ResolverOptions::default())?.spawn();
    match handle.wait().await {
        Resolution::Resolved(location) => {
            println!("{}", location.path().display());
            finish_refresh(&handle).await;
            Ok(ExitCode::SUCCESS)
        }
        Resolution::Unresolved => {
            eprintln!("No dm-langserver executable was selected.");
            Ok(ExitCode::FAILURE)
        }
        Resolution::Failed(e) => {
            eprintln!("dm-langserver could not be prepared: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The path is already printed; the process stays up until the refresh has
/// staged its update or saved the consent answer.
async fn finish_refresh(handle: &ResolverHandle) {
    let background = handle.background();
    if background.is_empty() {
        return;
    }
    tracing::debug!(tasks = background.len(), "Waiting for update check");
    if tokio::time::timeout(REFRESH_GRACE, background.join())
        .await
        .is_err()
    {
        tracing::warn!(
            "Update check did not finish within {}s",
            REFRESH_GRACE.as_secs()
        );
    }
}

pub fn toggle(workspace: &Workspace, file: &Path, request: TickRequest) -> Result<ExitCode> {
    let file = workspace.file(file)?;
    let outcome = toggle_on_disk(&workspace.root, workspace.environment()?, &file, request)?;
    if !outcome.edit.is_change() {
        tracing::debug!(include = %outcome.include, "include list unchanged");
    }
    println!("{}: {}", outcome.include, outcome.state.label());
    Ok(ExitCode::SUCCESS)
}

pub fn status(workspace: &Workspace, file: &Path) -> Result<ExitCode> {
    let file = workspace.file(file)?;
    match tick_status(&workspace.root, workspace.environment()?, &file)? {
        Some(state) => {
            println!("{}", state.label());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} cannot be ticked.", file.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn reference(settings: &dyn Settings, dm_path: Option<&str>) -> Result<ExitCode> {
    let browser = ReferenceBrowser::new(settings.byond_paths());
    match browser.open(dm_path) {
        Ok(page) => {
            println!("{page}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.needs_configuration() => {
            eprintln!("{e}");
            eprintln!("Set [dreammaker] byond_path in your config file.");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Streams compiler output to stdout until the build ends. Ctrl-C cancels.
pub async fn build(workspace: &Workspace, settings: &dyn Settings) -> Result<ExitCode> {
    let mut launcher = BuildLauncher::new(settings.byond_paths());
    let output = launcher.start(&workspace.root, workspace.environment()?)?;

    let mut printed = 0;
    let mut ticker = tokio::time::interval(OUTPUT_POLL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelled = false;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = &mut ctrl_c, if !cancelled => {
                if let Err(e) = result {
                    tracing::warn!("failed to listen for ctrl-c: {e}");
                }
                cancelled = true;
                launcher.cancel();
            }
        }
        let (next, ended) = print_new_output(&output, printed)?;
        printed = next;
        if ended {
            break;
        }
    }

    let status = launcher.wait().await?;
    println!();
    Ok(match status {
        Some(status) if status.success() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn print_new_output(output: &Mutex<BuildOutput>, printed: usize) -> Result<(usize, bool)> {
    let output = output.lock().unwrap_or_else(PoisonError::into_inner);
    let text = output.text();
    let mut stdout = io::stdout().lock();
    stdout.write_all(text[printed..].as_bytes())?;
    stdout.flush()?;
    Ok((text.len(), output.end().is_some()))
}

/// Runs a language client for the workspace, printing status lines to
/// stderr and each new object tree to stdout until Ctrl-C.
pub async fn session(
    workspace: &Workspace,
    settings: Arc<dyn Settings>,
    prompter: Arc<dyn dmlc_resolver::Prompter>,
    expand: &[String],
) -> Result<ExitCode> {
    let session = Arc::new(ClientSession::new());
    let host = ResolverHost {
        settings,
        prompter,
        status: session.clone(),
    };
    eprintln!("{}", session.status_text());
    let mut handle = Resolver::new(host, ResolverOptions::default())?.spawn();
    handle.wait().await;

    let Some(mut client) =
        LangClient::start(&handle, &workspace.root, Arc::clone(&session)).await?
    else {
        bail!("dm-langserver resolution did not finish");
    };

    let environment = workspace.root.join(workspace.environment()?);
    let text = std::fs::read_to_string(&environment)
        .with_context(|| format!("failed to read {}", environment.display()))?;
    client.on_file_changed(&environment, &text).await;

    let mut tree = ObjectTreeState::new();
    for name in expand {
        tree.navigate(&NavLink::Expand(name.clone()));
    }

    let mut ticker = tokio::time::interval(EVENT_POLL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut exit = ExitCode::SUCCESS;
    while client.is_running() {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => break,
        }
        for update in client.poll_events(EVENT_BUDGET) {
            match update {
                ClientUpdate::Status(text) => eprintln!("{text}"),
                ClientUpdate::ObjectTree => {
                    let root = session.object_tree();
                    println!("{}", tree.render(root.as_ref(), session.is_initialized()));
                }
                ClientUpdate::Stopped(reason) => {
                    eprintln!("dm-langserver stopped: {reason:?}");
                    exit = ExitCode::FAILURE;
                }
            }
        }
    }

    client.shutdown().await;
    Ok(exit)
}
