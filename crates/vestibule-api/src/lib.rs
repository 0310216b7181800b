pub mod auth;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod uploads;
pub mod users;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use vestibule_auth::{SessionManager, TokenService};
use vestibule_db::Database;
use vestibule_media::MediaClient;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: SessionManager<Arc<Database>>,
    pub tokens: TokenService,
    pub media: MediaClient,
    pub upload_dir: PathBuf,
}

/// Run store or credential work off the async runtime. A panicked task maps
/// to a generic internal error rather than leaking anything to the caller.
pub(crate) async fn run_blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(Into::into),
        Err(e) => {
            error!("blocking task failed: {}", e);
            Err(ApiError::Internal)
        }
    }
}
