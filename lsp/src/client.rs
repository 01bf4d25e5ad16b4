//! `LangClient` facade: the host's single entry point to the language server.
//!
//! A client exists only while a server runs; a stopped server is dropped
//! from the client and further document notifications are skipped.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use dmlc_resolver::{Resolution, ResolverHandle};
use tokio::sync::mpsc;

use crate::protocol;
use crate::server::RunningServer;
use crate::session::ClientSession;
use crate::types::{LaunchConfig, LspEvent, ServerStopReason};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Extensions of documents the server wants to see.
const DOCUMENT_EXTENSIONS: [&str; 2] = ["dm", "dme"];

/// What `poll_events` observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientUpdate {
    Status(String),
    ObjectTree,
    Stopped(ServerStopReason),
}

pub struct LangClient {
    server: Option<RunningServer>,
    session: Arc<ClientSession>,
    event_rx: mpsc::Receiver<LspEvent>,
    #[cfg_attr(not(test), allow(dead_code))]
    event_tx: mpsc::Sender<LspEvent>,
}

impl LangClient {
    /// Start the server once the resolver has finished.
    ///
    /// Returns `Ok(None)` while resolution is still running; the host should
    /// try again later.
    pub async fn start(
        resolver: &ResolverHandle,
        workspace_root: &Path,
        session: Arc<ClientSession>,
    ) -> Result<Option<Self>> {
        let location = match resolver.resolution() {
            None => return Ok(None),
            Some(Resolution::Resolved(location)) => location,
            Some(Resolution::Unresolved) => bail!("no dm-langserver executable was selected"),
            Some(Resolution::Failed(e)) => bail!("dm-langserver could not be prepared: {e}"),
        };

        let config = LaunchConfig::new(&location, workspace_root);
        tracing::info!(command = %config.command.display(), "Starting dm-langserver");
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let server = RunningServer::start(&config, event_tx.clone()).await?;
        session.mark_initialized();
        tracing::info!("dm-langserver initialized");

        Ok(Some(Self {
            server: Some(server),
            session,
            event_rx,
            event_tx,
        }))
    }

    #[must_use]
    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.server.is_some()
    }

    /// Send the document to the server if it is a DM source file.
    pub async fn on_file_changed(&mut self, path: &Path, text: &str) {
        let is_document = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
        if !is_document {
            return;
        }
        let Some(server) = self.server.as_mut() else {
            return;
        };
        let uri = match protocol::path_to_file_uri(path) {
            Ok(uri) => uri.to_string(),
            Err(e) => {
                tracing::warn!("Skipping document notification: {e}");
                return;
            }
        };
        if let Err(e) = server.notify_file_changed(&uri, text).await {
            tracing::warn!("Failed to send {} to dm-langserver: {e:#}", path.display());
        }
    }

    /// Drain up to `budget` pending server events into the session.
    /// Never blocks.
    pub fn poll_events(&mut self, budget: usize) -> Vec<ClientUpdate> {
        let mut updates = Vec::new();
        for _ in 0..budget {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            updates.push(self.handle_event(event));
        }
        updates
    }

    fn handle_event(&mut self, event: LspEvent) -> ClientUpdate {
        match event {
            LspEvent::WindowStatus(params) => {
                let text = self.session.apply_window_status(params);
                tracing::debug!(status = %text, "Status changed");
                ClientUpdate::Status(text)
            }
            LspEvent::ObjectTree(root) => {
                self.session.set_object_tree(root);
                ClientUpdate::ObjectTree
            }
            LspEvent::ServerStopped(reason) => {
                match &reason {
                    ServerStopReason::Exited => tracing::info!("dm-langserver exited"),
                    ServerStopReason::Failed(e) => tracing::warn!("dm-langserver failed: {e}"),
                }
                self.server = None;
                ClientUpdate::Stopped(reason)
            }
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(server) = self.server.take() {
            tracing::info!("Shutting down dm-langserver");
            server.shutdown().await;
        }
    }

    #[cfg(test)]
    fn detached(session: Arc<ClientSession>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            server: None,
            session,
            event_rx,
            event_tx,
        }
    }
}
