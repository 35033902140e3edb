//! Persist request attachments into the task directory root.

use base64::Engine as _;
use pagesmith_core::io::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment '{0}' has an empty url")]
    EmptyUrl(String),

    #[error("attachment name '{0}' is not a usable file name")]
    InvalidName(String),

    #[error("attachment '{0}' is an invalid data URI: missing comma separator")]
    InvalidDataUri(String),

    #[error("attachment '{name}' is neither a data URI, an http(s) URL nor base64")]
    Unsupported {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("attachment '{name}' has invalid base64 payload")]
    Decode {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("downloading attachment '{name}' failed")]
    Download {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Write(#[from] pagesmith_core::PagesmithError),
}

/// Reduce a requested name to its final path component.
pub fn bare_name(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other),
    }
}

/// Save every attachment under `dir`, returning the written paths in order.
/// The first failure aborts the batch.
pub async fn save_attachments(
    http: &reqwest::Client,
    attachments: &[Attachment],
    dir: &Path,
) -> Result<Vec<PathBuf>, AttachmentError> {
    let mut saved = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        match save_one(http, attachment, dir).await {
            Ok(path) => saved.push(path),
            Err(e) => {
                error!(
                    name = %attachment.name,
                    url = %attachment.url.chars().take(200).collect::<String>(),
                    error = %e,
                    "failed to save attachment"
                );
                return Err(e);
            }
        }
    }
    Ok(saved)
}

async fn save_one(
    http: &reqwest::Client,
    attachment: &Attachment,
    dir: &Path,
) -> Result<PathBuf, AttachmentError> {
    let Attachment { name, url } = attachment;
    if url.is_empty() {
        return Err(AttachmentError::EmptyUrl(name.clone()));
    }
    let file_name = bare_name(name).ok_or_else(|| AttachmentError::InvalidName(name.clone()))?;
    let path = dir.join(file_name);

    let (bytes, kind) = if let Some(rest) = url.strip_prefix("data:") {
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| AttachmentError::InvalidDataUri(name.clone()))?;
        let bytes = if header.contains(";base64") {
            decode(data).map_err(|source| AttachmentError::Decode {
                name: name.clone(),
                source,
            })?
        } else {
            data.as_bytes().to_vec()
        };
        (bytes, "data-uri")
    } else if url.starts_with("http://") || url.starts_with("https://") {
        let bytes = download(http, url)
            .await
            .map_err(|source| AttachmentError::Download {
                name: name.clone(),
                source,
            })?;
        (bytes, "download")
    } else {
        let bytes = decode(url).map_err(|source| AttachmentError::Unsupported {
            name: name.clone(),
            source,
        })?;
        (bytes, "base64")
    };

    atomic_write(&path, &bytes)?;
    info!(name = %file_name, kind, bytes = bytes.len(), "saved attachment");
    Ok(path)
}

fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(data.trim())
}

async fn download(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = http
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
