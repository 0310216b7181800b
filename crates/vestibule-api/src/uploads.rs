use std::path::{Path, PathBuf};

use tracing::{error, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// 10 MB limit for avatar / cover-image uploads
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Stage an uploaded file part into the upload directory under a fresh
/// random name, so the media client can push it from a local path.
pub async fn stage(dir: &Path, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("uploaded file is empty".into()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::TooLarge);
    }

    tokio::fs::create_dir_all(dir).await.map_err(stage_failed)?;

    let path = dir.join(Uuid::new_v4().to_string());
    tokio::fs::write(&path, bytes).await.map_err(stage_failed)?;
    Ok(path)
}

/// Remove a staged file once the media host has it (or the request failed).
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove staged file {}: {}", path.display(), e),
    }
}

fn stage_failed(e: std::io::Error) -> ApiError {
    error!("staging upload failed: {}", e);
    ApiError::Internal
}
