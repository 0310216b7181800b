use thiserror::Error;

/// Failures surfaced by the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE column rejected the write (`username` or `email`).
    #[error("{0} already in use")]
    Duplicate(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failures surfaced by the session lifecycle manager and token service.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bad signature, expired, or malformed token.
    #[error("invalid or expired token")]
    InvalidToken,

    /// No token was presented at all.
    #[error("unauthorized request")]
    Unauthorized,

    /// A validly-signed refresh token that no longer matches the stored
    /// value: stale, already rotated, or revoked by logout.
    #[error("refresh token is expired or already used")]
    TokenReuse,

    #[error("token signing failed")]
    Signing,

    #[error("password hashing failed")]
    Hash,

    #[error(transparent)]
    Store(#[from] StoreError),
}
