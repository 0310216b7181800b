use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use vestibule_auth::{AuthError, StoreError};
use vestibule_media::MediaError;

/// Typed API failure carrying its HTTP status. Everything a handler can
/// fail with funnels through here, and `into_response` is the single place
/// errors become wire responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} already in use")]
    Conflict(&'static str),

    #[error("uploaded file exceeds the size limit")]
    TooLarge,

    #[error("account not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("unauthorized request")]
    Unauthorized,

    #[error("refresh token is expired or already used")]
    TokenReuse,

    #[error("media upload failed: {0}")]
    Upstream(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthorized | Self::TokenReuse => {
                StatusCode::UNAUTHORIZED
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound => Self::NotFound,
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::InvalidToken => Self::InvalidToken,
            AuthError::Unauthorized => Self::Unauthorized,
            AuthError::TokenReuse => Self::TokenReuse,
            AuthError::Store(e) => e.into(),
            e @ (AuthError::Signing | AuthError::Hash) => {
                error!("credential processing failed: {}", e);
                Self::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => Self::Conflict(field),
            StoreError::Backend(e) => {
                error!("credential store failure: {:#}", e);
                Self::Internal
            }
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        error!("media upload failed: {}", err);
        Self::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
