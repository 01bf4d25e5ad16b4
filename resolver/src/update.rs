//! The update endpoint: consent, request, response interpretation and the
//! write of the new binary.

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use dmlc_types::{Arch, Platform, UpdateConsent, UpdatePreference};
use dmlc_utils::{AtomicWriteOptions, PersistMode, atomic_write_with_options};
use flate2::read::GzDecoder;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use url::Url;

use crate::error::UpdateError;
use crate::host::ResolverHost;

/// What the update endpoint said, before any decision is made about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckResult {
    NewVersion {
        body: Vec<u8>,
        content_encoding: Option<String>,
    },
    Unmodified,
    NotFound,
    EndpointRemoved,
    ServerError {
        status: u16,
        reason: String,
    },
    TransportError(String),
}

/// A completed update check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new binary was written. `announce` is set for refreshes of an
    /// existing install, which the user should hear about.
    Installed { announce: bool },
    /// The installed binary is current.
    Unchanged,
}

#[derive(Debug)]
pub(crate) struct UpdateRequest<'a> {
    pub platform: Platform,
    pub arch: Arch,
    pub destination: &'a Path,
    /// MD5 of the installed binary; absent on a first install.
    pub content_hash: Option<&'a str>,
}

#[derive(Debug, PartialEq, Eq)]
enum Interpretation {
    Write(Vec<u8>),
    Unchanged,
}

/// `<base>?platform=..&arch=..[&hash=..]`
pub fn update_url(
    base: &str,
    platform: Platform,
    arch: Arch,
    content_hash: Option<&str>,
) -> Result<Url, UpdateError> {
    let mut url = Url::parse(base).map_err(|source| UpdateError::Url {
        url: base.to_string(),
        source,
    })?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("platform", platform.as_str())
            .append_pair("arch", arch.as_str());
        if let Some(hash) = content_hash {
            query.append_pair("hash", hash);
        }
    }
    Ok(url)
}

/// Ask, fetch, interpret and write. Exactly one request is made.
pub(crate) async fn run_update_check(
    host: &ResolverHost,
    client: &reqwest::Client,
    request: UpdateRequest<'_>,
) -> Result<UpdateOutcome, UpdateError> {
    let has_hash = request.content_hash.is_some();
    consent(host, !has_hash).await?;

    let url = update_url(
        &host.settings.update_url(),
        request.platform,
        request.arch,
        request.content_hash,
    )?;
    tracing::info!(%url, "Checking for dm-langserver update");
    let result = fetch(client, url).await;

    let interpretation = match interpret(result, has_hash, request.platform, request.arch) {
        Err(UpdateError::EndpointRetired) => {
            if let Err(e) = host
                .settings
                .set_update_preference(UpdatePreference::NeverUpdate)
            {
                tracing::warn!("Failed to disable auto-update: {e}");
            }
            return Err(UpdateError::EndpointRetired);
        }
        other => other?,
    };

    match interpretation {
        Interpretation::Unchanged => {
            tracing::info!("dm-langserver is up to date");
            Ok(UpdateOutcome::Unchanged)
        }
        Interpretation::Write(bytes) => {
            let options = AtomicWriteOptions {
                sync: true,
                mode: PersistMode::Executable,
            };
            let size = bytes.len();
            let destination = request.destination.to_path_buf();
            tokio::task::spawn_blocking(move || {
                atomic_write_with_options(&destination, &bytes, options)
            })
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)))
            .map_err(|source| UpdateError::Write {
                path: request.destination.to_path_buf(),
                source,
            })?;
            tracing::info!(
                path = %request.destination.display(),
                bytes = size,
                "Wrote dm-langserver binary"
            );
            Ok(UpdateOutcome::Installed { announce: has_hash })
        }
    }
}

/// Use the persisted preference, or ask once.
async fn consent(host: &ResolverHost, first_install: bool) -> Result<(), UpdateError> {
    match host.settings.update_preference().allows_update() {
        Some(true) => return Ok(()),
        Some(false) => return Err(UpdateError::Disabled),
        None => {}
    }

    let choices = UpdateConsent::choices(first_install);
    let prompter = Arc::clone(&host.prompter);
    let picked = tokio::task::spawn_blocking(move || {
        let labels: Vec<&str> = choices.iter().map(|c| c.label()).collect();
        prompter.choose(&labels)
    })
    .await
    .unwrap_or_else(|e| {
        tracing::warn!("Update prompt failed: {e}");
        None
    });

    let Some(answer) = picked.and_then(|i| choices.get(i).copied()) else {
        tracing::info!("Update prompt dismissed");
        return Err(UpdateError::Disabled);
    };
    let preference = answer.preference();
    if let Err(e) = host.settings.set_update_preference(preference) {
        tracing::warn!("Failed to save update preference: {e}");
    }
    match preference.allows_update() {
        Some(true) => Ok(()),
        _ => Err(UpdateError::Disabled),
    }
}

async fn fetch(client: &reqwest::Client, url: Url) -> UpdateCheckResult {
    let response = match client
        .get(url)
        .header(ACCEPT_ENCODING, "gzip")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return UpdateCheckResult::TransportError(e.to_string()),
    };

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "Update endpoint responded");
    match status {
        StatusCode::OK => {
            let content_encoding = response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            match response.bytes().await {
                Ok(body) => UpdateCheckResult::NewVersion {
                    body: body.to_vec(),
                    content_encoding,
                },
                Err(e) => UpdateCheckResult::TransportError(e.to_string()),
            }
        }
        StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED => UpdateCheckResult::Unmodified,
        StatusCode::NOT_FOUND => UpdateCheckResult::NotFound,
        StatusCode::GONE => UpdateCheckResult::EndpointRemoved,
        other => server_error(other),
    }
}

fn server_error(status: StatusCode) -> UpdateCheckResult {
    UpdateCheckResult::ServerError {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

fn interpret(
    result: UpdateCheckResult,
    has_hash: bool,
    platform: Platform,
    arch: Arch,
) -> Result<Interpretation, UpdateError> {
    match result {
        UpdateCheckResult::NewVersion {
            body,
            content_encoding,
        } => decode_body(body, content_encoding.as_deref()).map(Interpretation::Write),
        // Without a hash there is nothing to be unmodified relative to.
        UpdateCheckResult::Unmodified if has_hash => Ok(Interpretation::Unchanged),
        UpdateCheckResult::Unmodified | UpdateCheckResult::NotFound => {
            Err(UpdateError::PlatformUnsupported { platform, arch })
        }
        UpdateCheckResult::EndpointRemoved => Err(UpdateError::EndpointRetired),
        UpdateCheckResult::ServerError { status, reason } => {
            Err(UpdateError::ServerRejected { status, reason })
        }
        UpdateCheckResult::TransportError(message) => Err(UpdateError::Network(message)),
    }
}

fn decode_body(body: Vec<u8>, content_encoding: Option<&str>) -> Result<Vec<u8>, UpdateError> {
    match content_encoding {
        None => Ok(body),
        Some(encoding) if encoding.eq_ignore_ascii_case("gzip") => {
            let mut decoded = Vec::new();
            GzDecoder::new(body.as_slice())
                .read_to_end(&mut decoded)
                .map_err(UpdateError::Decompress)?;
            Ok(decoded)
        }
        Some(other) => Err(UpdateError::UnknownEncoding(other.to_string())),
    }
}
