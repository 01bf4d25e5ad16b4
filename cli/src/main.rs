//! dmlc: DreamMaker language client from the command line.
//!
//! Every editor-facing piece of the client is reachable as a subcommand:
//! resolving (and auto-updating) dm-langserver, ticking files in the `.dme`
//! include list, reading the BYOND reference, running the compiler, and a
//! live language-server session that prints the object tree.
//!
//! Results go to stdout, prompts and progress to stderr, and logs to
//! `<config dir>/logs/dmlc.log`.

mod commands;
mod prompter;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dmlc_config::{FileSettings, Settings};
use dmlc_resolver::{NoStatus, ResolverHost};
use dmlc_types::TickRequest;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::Workspace;
use prompter::TerminalPrompter;

#[derive(Parser)]
#[command(name = "dmlc", version)]
#[command(about = "DreamMaker language client: dm-langserver, include lists and the BYOND reference")]
struct Cli {
    /// Workspace folder containing the .dme file
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Environment file name, e.g. tgstation.dme (detected when omitted)
    #[arg(long, global = true)]
    environment: Option<String>,
    /// Config file (default: $DMLC_CONFIG or <config dir>/dmlc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find or install dm-langserver and print its path
    Resolve,
    /// Tick or untick a file in the environment's include list
    Toggle {
        file: PathBuf,
        /// Only tick; leave the file alone if it is already ticked
        #[arg(long, conflicts_with = "untick")]
        tick: bool,
        /// Only untick
        #[arg(long)]
        untick: bool,
    },
    /// Print whether a file is ticked
    Status { file: PathBuf },
    /// Print a page of the BYOND reference, or its index
    Reference {
        /// DM path such as /proc/sleep
        path: Option<String>,
    },
    /// Compile the environment with the BYOND compiler
    Build,
    /// Run dm-langserver and print status changes and the object tree
    Session {
        /// Type to show expanded in the object tree (repeatable)
        #[arg(long = "expand", value_name = "TYPE")]
        expand: Vec<String>,
    },
}

fn init_tracing(config_path: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(config_path);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Without a log file, stay silent rather than mix logs into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file(config_path: &Path) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config_path) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config_path: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(config_dir) = config_path.parent()
        && !config_dir.as_os_str().is_empty()
    {
        candidates.push(config_dir.join("logs").join("dmlc.log"));
    }

    candidates.push(PathBuf::from(".dmlc").join("logs").join("dmlc.log"));

    candidates
}

fn tick_request(tick: bool, untick: bool) -> TickRequest {
    match (tick, untick) {
        (true, _) => TickRequest::Tick,
        (_, true) => TickRequest::Untick,
        _ => TickRequest::Toggle,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let Some(config_path) = cli.config.clone().or_else(dmlc_config::config_path) else {
        bail!("no config directory is available; pass --config");
    };
    init_tracing(&config_path);

    let settings: Arc<dyn Settings> = Arc::new(FileSettings::new(&config_path));
    let prompter = Arc::new(TerminalPrompter::new(config_path));

    match cli.command {
        Commands::Resolve => {
            let host = ResolverHost {
                settings,
                prompter,
                status: Arc::new(NoStatus),
            };
            commands::resolve(host).await
        }
        Commands::Toggle { file, tick, untick } => {
            let workspace = Workspace::new(&cli.root, cli.environment)?;
            commands::toggle(&workspace, &file, tick_request(tick, untick))
        }
        Commands::Status { file } => {
            let workspace = Workspace::new(&cli.root, cli.environment)?;
            commands::status(&workspace, &file)
        }
        Commands::Reference { path } => commands::reference(settings.as_ref(), path.as_deref()),
        Commands::Build => {
            let workspace = Workspace::new(&cli.root, cli.environment)?;
            commands::build(&workspace, settings.as_ref()).await
        }
        Commands::Session { expand } => {
            let workspace = Workspace::new(&cli.root, cli.environment)?;
            commands::session(&workspace, settings, prompter, &expand).await
        }
    }
}
