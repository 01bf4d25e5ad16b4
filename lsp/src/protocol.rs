//! JSON-RPC message shapes exchanged with dm-langserver.

use std::path::{Path, PathBuf};

use dmlc_types::ObjectTreeType;
use serde::{Deserialize, Serialize};

/// Language identifier the server expects in `didOpen`.
pub const LANGUAGE_ID: &str = "dreammaker";

pub(crate) const WINDOW_STATUS: &str = "$window/status";
pub(crate) const OBJECT_TREE: &str = "experimental/dreammaker/objectTree";

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub(crate) struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(id: u64, method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Client capabilities specific to dm-langserver.
#[must_use]
pub fn extra_capabilities() -> serde_json::Value {
    serde_json::json!({
        "experimental": {
            "dreammaker": {
                "objectTree": true
            }
        }
    })
}

/// Recursively merge `extra` into `base`. Objects merge key by key; any
/// other value in `extra` replaces the one in `base`.
fn merge_json(base: &mut serde_json::Value, extra: serde_json::Value) {
    match (base, extra) {
        (serde_json::Value::Object(base), serde_json::Value::Object(extra)) => {
            for (key, value) in extra {
                merge_json(base.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

pub(crate) fn initialize_params(root_uri: &str) -> serde_json::Value {
    let mut capabilities = serde_json::json!({
        "textDocument": {
            "synchronization": {
                "dynamicRegistration": false,
                "willSave": false,
                "willSaveWaitUntil": false,
                "didSave": false
            }
        },
        "workspace": {
            "workspaceFolders": true
        }
    });
    merge_json(&mut capabilities, extra_capabilities());

    serde_json::json!({
        "processId": std::process::id(),
        "clientInfo": {
            "name": "dmlc",
            "version": env!("CARGO_PKG_VERSION")
        },
        "rootUri": root_uri,
        "capabilities": capabilities,
        "workspaceFolders": [{
            "uri": root_uri,
            "name": "workspace"
        }]
    })
}

pub(crate) fn did_open_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": LANGUAGE_ID,
            "version": version,
            "text": text
        }
    })
}

pub(crate) fn did_change_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "version": version
        },
        "contentChanges": [{
            "text": text
        }]
    })
}

/// Payload of `$window/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WindowStatusParams {
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub tasks: Option<Vec<String>>,
}

/// Payload of `experimental/dreammaker/objectTree`.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectTreeParams {
    pub root: ObjectTreeType,
}

pub(crate) fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}
