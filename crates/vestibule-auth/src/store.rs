use std::sync::Arc;

use uuid::Uuid;

use vestibule_types::models::Account;

use crate::error::StoreError;

/// Fields supplied when creating an account; the store assigns the id and
/// creation timestamp.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Contract the session lifecycle manager consumes. Backed by SQLite in
/// production (`vestibule-db`) and by an in-memory map in tests.
///
/// Methods are synchronous; callers on the async runtime run them through
/// `tokio::task::spawn_blocking` so store work never blocks a worker thread.
pub trait CredentialStore: Send + Sync {
    fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Single lookup matching `identifier` against username OR email.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Registration pre-check: is either field already claimed?
    fn taken_username_or_email(&self, username: &str, email: &str) -> Result<bool, StoreError>;

    /// Overwrite (login) or clear (logout, password change) the stored
    /// refresh token.
    fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError>;

    /// Atomic rotation primitive: replace the stored refresh token with
    /// `new` only if it still equals `expected`. Returns whether the swap
    /// happened. The store update is the single point of truth, so
    /// concurrent rotations of the same superseded token observe `false`
    /// after the first one wins.
    fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> Result<bool, StoreError>;

    fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;

    fn update_profile(&self, id: Uuid, full_name: &str, email: &str)
    -> Result<Account, StoreError>;

    fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError>;

    fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        (**self).create(account)
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        (**self).find_by_identifier(identifier)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        (**self).find_by_id(id)
    }

    fn taken_username_or_email(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        (**self).taken_username_or_email(username, email)
    }

    fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        (**self).update_refresh_token(id, token)
    }

    fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> Result<bool, StoreError> {
        (**self).swap_refresh_token(id, expected, new)
    }

    fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        (**self).update_password_hash(id, hash)
    }

    fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Account, StoreError> {
        (**self).update_profile(id, full_name, email)
    }

    fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
        (**self).update_avatar_url(id, url)
    }

    fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
        (**self).update_cover_image_url(id, url)
    }
}
