//! A running dm-langserver process and its reader and writer tasks.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{self, Notification, ObjectTreeParams, Request, WindowStatusParams};
use crate::types::{LaunchConfig, LspEvent, ServerStopReason};

/// dm-langserver parses the whole environment before answering `initialize`.
const INIT_TIMEOUT: Duration = Duration::from_secs(120);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const WRITER_CHANNEL_CAPACITY: usize = 64;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>>;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

#[derive(Debug)]
enum IncomingFrame {
    Response {
        id: u64,
        body: serde_json::Value,
    },
    ServerRequest {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

fn parse_incoming(frame: &serde_json::Value) -> Option<IncomingFrame> {
    let id = frame.get("id");
    let method = frame
        .get("method")
        .and_then(serde_json::Value::as_str)
        .map(String::from);
    let is_response = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method) {
        (Some(id), None) if is_response => Some(IncomingFrame::Response {
            id: id.as_u64()?,
            body: frame.clone(),
        }),
        (Some(id), Some(method)) => Some(IncomingFrame::ServerRequest {
            id: id.clone(),
            method,
        }),
        (None, Some(method)) => Some(IncomingFrame::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}

/// Turn a server notification into an event. Unknown methods yield `None`.
fn notification_event(method: &str, params: Option<serde_json::Value>) -> Option<LspEvent> {
    let params = params.unwrap_or(serde_json::Value::Null);
    match method {
        protocol::WINDOW_STATUS => match serde_json::from_value::<WindowStatusParams>(params) {
            Ok(status) => Some(LspEvent::WindowStatus(status)),
            Err(e) => {
                tracing::debug!("Malformed {method} notification: {e}");
                None
            }
        },
        protocol::OBJECT_TREE => match serde_json::from_value::<ObjectTreeParams>(params) {
            Ok(tree) => Some(LspEvent::ObjectTree(tree.root)),
            Err(e) => {
                tracing::debug!("Malformed {method} notification: {e}");
                None
            }
        },
        _ => {
            tracing::trace!("Ignoring notification: {method}");
            None
        }
    }
}

pub(crate) struct RunningServer {
    child: Child,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: u64,
    pending: PendingMap,
    /// Last version sent per document URI; presence means `didOpen` was sent.
    documents: HashMap<String, i32>,
}

impl RunningServer {
    /// Spawn the server and complete the `initialize` handshake.
    pub async fn start(config: &LaunchConfig, event_tx: mpsc::Sender<LspEvent>) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .current_dir(&config.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", config.command.display()))?;

        let stdout = child.stdout.take().context("no stdout from dm-langserver")?;
        let stdin = child.stdin.take().context("no stdin from dm-langserver")?;
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!("dm-langserver write error: {e:#}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_writer_tx = writer_tx.clone();
        tokio::spawn(async move {
            let mut reader = FrameReader::new(stdout);
            let reason = loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        Self::dispatch_frame(&frame, &reader_pending, &event_tx, &reader_writer_tx)
                            .await;
                    }
                    Ok(None) => break ServerStopReason::Exited,
                    Err(e) => break ServerStopReason::Failed(format!("{e:#}")),
                }
            };
            match &reason {
                ServerStopReason::Exited => tracing::info!("dm-langserver closed stdout"),
                ServerStopReason::Failed(e) => tracing::warn!("dm-langserver reader error: {e}"),
            }
            let _ = event_tx.send(LspEvent::ServerStopped(reason)).await;
        });

        let mut server = Self {
            child,
            writer_tx,
            next_id: 1,
            pending,
            documents: HashMap::new(),
        };
        server.initialize(config).await?;
        Ok(server)
    }

    async fn dispatch_frame(
        frame: &serde_json::Value,
        pending: &Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>,
        event_tx: &mpsc::Sender<LspEvent>,
        writer_tx: &mpsc::Sender<WriterCommand>,
    ) {
        let Some(incoming) = parse_incoming(frame) else {
            tracing::trace!("Ignoring malformed JSON-RPC frame");
            return;
        };

        match incoming {
            IncomingFrame::Response { id, body } => {
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(body);
                }
            }
            IncomingFrame::ServerRequest { id, method } => {
                tracing::debug!("dm-langserver sent request {method}; replying method not found");
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("Method not found: {method}")
                    }
                });
                let _ = writer_tx.send(WriterCommand::Send(response)).await;
            }
            IncomingFrame::Notification { method, params } => {
                if let Some(event) = notification_event(&method, params) {
                    let _ = event_tx.send(event).await;
                }
            }
        }
    }

    async fn initialize(&mut self, config: &LaunchConfig) -> Result<()> {
        let root_uri = protocol::path_to_file_uri(&config.workspace_root)
            .context("converting workspace root to URI")?;
        let params = protocol::initialize_params(root_uri.as_str());
        let response = self
            .send_request("initialize", Some(params), INIT_TIMEOUT)
            .await?;
        if let Some(error) = response.get("error") {
            bail!(
                "dm-langserver initialize failed: {}",
                error["message"].as_str().unwrap_or("unknown error")
            );
        }
        self.send_notification("initialized", Some(serde_json::json!({})))
            .await
    }

    async fn send_request(
        &mut self,
        method: &'static str,
        params: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = serde_json::to_value(Request::new(id, method, params))
            .context("serializing request")?;
        if self
            .writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            bail!("writer channel closed");
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                bail!("dm-langserver exited before answering {method}")
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                bail!("{method} timed out")
            }
        }
    }

    async fn send_notification(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<()> {
        let frame = serde_json::to_value(Notification::new(method, params))
            .context("serializing notification")?;
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .map_err(|_| anyhow::anyhow!("writer channel closed"))
    }

    /// `didOpen` the first time a document is seen, `didChange` after.
    pub async fn notify_file_changed(&mut self, uri: &str, text: &str) -> Result<()> {
        let (method, params) = match self.documents.entry(uri.to_string()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                let params = protocol::did_change_params(uri, *entry.get(), text);
                ("textDocument/didChange", params)
            }
            Entry::Vacant(entry) => {
                entry.insert(1);
                ("textDocument/didOpen", protocol::did_open_params(uri, 1, text))
            }
        };
        self.send_notification(method, Some(params)).await
    }

    /// `shutdown` + `exit`, then kill if the process lingers.
    pub async fn shutdown(mut self) {
        if let Ok(response) = self
            .send_request("shutdown", None, REQUEST_TIMEOUT)
            .await
            && response.get("error").is_none()
        {
            let _ = self.send_notification("exit", None).await;
        }
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            tracing::debug!("dm-langserver didn't exit in time, killing");
            let _ = self.child.kill().await;
        }
    }
}
