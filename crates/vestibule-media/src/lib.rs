use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not read staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("media host unreachable: {0}")]
    Request(#[from] reqwest::Error),

    #[error("media host rejected upload with status {0}")]
    Rejected(u16),

    #[error("media host returned a malformed response")]
    Payload,
}

#[derive(Debug, Deserialize)]
pub struct MediaAsset {
    pub url: String,
}

/// Client for the external media host. The rest of the system treats it as
/// an opaque `upload(path) -> url` function; every failure surfaces as a
/// [`MediaError`] and becomes an upstream error at the API boundary.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    base_url: String,
}

impl MediaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Push a staged local file to the media host and return its public URL.
    /// `kind` namespaces the asset on the host ("avatar", "cover-image").
    pub async fn upload(&self, path: &Path, kind: &str) -> Result<MediaAsset, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), kind, size = bytes.len(), "uploading media");

        let response = self
            .http
            .post(format!("{}/upload/{}", self.base_url, kind))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(kind, status = status.as_u16(), "media host rejected upload");
            return Err(MediaError::Rejected(status.as_u16()));
        }

        let asset: MediaAsset = response.json().await.map_err(|_| MediaError::Payload)?;
        if asset.url.is_empty() {
            return Err(MediaError::Payload);
        }

        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_staged_file_is_an_io_error() {
        let client = MediaClient::new("http://127.0.0.1:1");
        let err = client
            .upload(Path::new("/nonexistent/staged-file"), "avatar")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
