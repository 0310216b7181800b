use tracing::info;
use uuid::Uuid;

use vestibule_types::models::Account;

use crate::error::AuthError;
use crate::password;
use crate::store::CredentialStore;
use crate::token::{TokenPair, TokenService};

/// Orchestrates the session lifecycle over one account: login issues a
/// fresh token pair and overwrites the stored refresh token, logout clears
/// it, refresh rotates it. At most one refresh token is valid per account
/// at any moment.
#[derive(Clone)]
pub struct SessionManager<S> {
    store: S,
    tokens: TokenService,
}

impl<S: CredentialStore> SessionManager<S> {
    pub fn new(store: S, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify credentials and start a session. Overwriting the stored
    /// refresh token invalidates any previously issued one for this account.
    pub fn login(&self, identifier: &str, password: &str) -> Result<(TokenPair, Account), AuthError> {
        let account = self
            .store
            .find_by_identifier(identifier)?
            .ok_or(AuthError::NotFound)?;

        if !password::verify(&account.password_hash, password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.tokens.issue_pair(&account)?;
        self.store
            .update_refresh_token(account.id, Some(&pair.refresh_token))?;

        info!(account = %account.username, "session started");
        Ok((pair, account))
    }

    /// Clear the stored refresh token unconditionally. No token is verified
    /// here; logout is authorized upstream by access-token possession.
    pub fn logout(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.store.update_refresh_token(account_id, None)?;
        info!(%account_id, "session ended");
        Ok(())
    }

    /// Exchange a refresh token for a fresh pair, rotating the stored value.
    /// The presented token must exactly equal the stored one; a validly
    /// signed but superseded token fails with [`AuthError::TokenReuse`].
    pub fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = presented.ok_or(AuthError::Unauthorized)?;
        let claims = self.tokens.verify_refresh_token(presented)?;

        let account = self
            .store
            .find_by_id(claims.sub)?
            .ok_or(AuthError::NotFound)?;

        let pair = self.tokens.issue_pair(&account)?;

        // The guarded store update is the single point of truth: if the
        // stored token no longer equals the presented one (rotated, logged
        // out, or overwritten by a newer login), the swap does not happen.
        if !self
            .store
            .swap_refresh_token(account.id, presented, &pair.refresh_token)?
        {
            return Err(AuthError::TokenReuse);
        }

        info!(account = %account.username, "refresh token rotated");
        Ok(pair)
    }

    /// Replace the password hash after verifying the old password, and
    /// revoke the outstanding refresh token so existing sessions must
    /// re-authenticate.
    pub fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .store
            .find_by_id(account_id)?
            .ok_or(AuthError::NotFound)?;

        if !password::verify(&account.password_hash, old_password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = password::hash(new_password)?;
        self.store.update_password_hash(account_id, &hash)?;
        self.store.update_refresh_token(account_id, None)?;

        info!(account = %account.username, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::StoreError;
    use crate::store::NewAccount;
    use crate::token::TokenConfig;

    /// In-memory store mirroring the guarded-update semantics of the SQLite
    /// implementation.
    #[derive(Default)]
    struct MemoryStore {
        accounts: Mutex<HashMap<Uuid, Account>>,
    }

    impl CredentialStore for MemoryStore {
        fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts
                .values()
                .any(|a| a.username == account.username || a.email == account.email)
            {
                return Err(StoreError::Duplicate("username"));
            }
            let stored = Account {
                id: Uuid::new_v4(),
                username: account.username,
                email: account.email,
                full_name: account.full_name,
                password_hash: account.password_hash,
                refresh_token: None,
                avatar_url: account.avatar_url,
                cover_image_url: account.cover_image_url,
                created_at: chrono::Utc::now(),
            };
            accounts.insert(stored.id, stored.clone());
            Ok(stored)
        }

        fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts
                .values()
                .find(|a| a.username == identifier || a.email == identifier)
                .cloned())
        }

        fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
            Ok(self.accounts.lock().unwrap().get(&id).cloned())
        }

        fn taken_username_or_email(
            &self,
            username: &str,
            email: &str,
        ) -> Result<bool, StoreError> {
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts
                .values()
                .any(|a| a.username == username || a.email == email))
        }

        fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            account.refresh_token = token.map(str::to_owned);
            Ok(())
        }

        fn swap_refresh_token(
            &self,
            id: Uuid,
            expected: &str,
            new: &str,
        ) -> Result<bool, StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            if account.refresh_token.as_deref() == Some(expected) {
                account.refresh_token = Some(new.to_owned());
                Ok(true)
            } else {
                Ok(false)
            }
        }

        fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            account.password_hash = hash.to_owned();
            Ok(())
        }

        fn update_profile(
            &self,
            id: Uuid,
            full_name: &str,
            email: &str,
        ) -> Result<Account, StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            account.full_name = full_name.to_owned();
            account.email = email.to_owned();
            Ok(account.clone())
        }

        fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            account.avatar_url = url.to_owned();
            Ok(account.clone())
        }

        fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such account")))?;
            account.cover_image_url = Some(url.to_owned());
            Ok(account.clone())
        }
    }

    fn manager() -> SessionManager<MemoryStore> {
        SessionManager::new(
            MemoryStore::default(),
            TokenService::new(TokenConfig {
                access_secret: "access-secret-for-tests".into(),
                refresh_secret: "refresh-secret-for-tests".into(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 604_800,
            }),
        )
    }

    fn register(manager: &SessionManager<MemoryStore>, username: &str, pw: &str) -> Account {
        manager
            .store
            .create(NewAccount {
                username: username.to_owned(),
                email: format!("{username}@x.com"),
                full_name: username.to_owned(),
                password_hash: password::hash(pw).unwrap(),
                avatar_url: "https://media.test/avatar/1".into(),
                cover_image_url: None,
            })
            .unwrap()
    }

    #[test]
    fn login_with_username_or_email() {
        let mgr = manager();
        register(&mgr, "alice", "p1");

        let (by_name, _) = mgr.login("alice", "p1").unwrap();
        assert!(!by_name.access_token.is_empty());

        let (by_email, _) = mgr.login("alice@x.com", "p1").unwrap();
        assert_ne!(by_name.refresh_token, by_email.refresh_token);
    }

    #[test]
    fn login_wrong_password_leaves_store_untouched() {
        let mgr = manager();
        let account = register(&mgr, "alice", "p1");

        assert!(matches!(
            mgr.login("alice", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));

        let stored = mgr.store.find_by_id(account.id).unwrap().unwrap();
        assert_eq!(stored.refresh_token, None);
    }

    #[test]
    fn login_unknown_identifier_is_not_found() {
        let mgr = manager();
        assert!(matches!(mgr.login("ghost", "p1"), Err(AuthError::NotFound)));
    }

    #[test]
    fn login_overwrites_previous_refresh_token() {
        let mgr = manager();
        register(&mgr, "alice", "p1");

        let (first, _) = mgr.login("alice", "p1").unwrap();
        let (second, _) = mgr.login("alice", "p1").unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        // The first session's token is validly signed but superseded.
        assert!(matches!(
            mgr.refresh(Some(&first.refresh_token)),
            Err(AuthError::TokenReuse)
        ));
        assert!(mgr.refresh(Some(&second.refresh_token)).is_ok());
    }

    #[test]
    fn refresh_rotates_and_invalidates_the_presented_token() {
        let mgr = manager();
        register(&mgr, "alice", "p1");
        let (pair, _) = mgr.login("alice", "p1").unwrap();

        let rotated = mgr.refresh(Some(&pair.refresh_token)).unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // Replay of the old token must fail; the rotated one is the only
        // valid token.
        assert!(matches!(
            mgr.refresh(Some(&pair.refresh_token)),
            Err(AuthError::TokenReuse)
        ));
        assert!(mgr.refresh(Some(&rotated.refresh_token)).is_ok());
    }

    #[test]
    fn refresh_without_token_is_unauthorized() {
        let mgr = manager();
        assert!(matches!(mgr.refresh(None), Err(AuthError::Unauthorized)));
    }

    #[test]
    fn refresh_with_garbage_token_is_invalid() {
        let mgr = manager();
        assert!(matches!(
            mgr.refresh(Some("not.a.jwt")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn refresh_for_deleted_account_is_not_found() {
        let mgr = manager();
        let token = mgr.tokens().issue_refresh_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            mgr.refresh(Some(&token)),
            Err(AuthError::NotFound)
        ));
    }

    #[test]
    fn logout_revokes_the_session() {
        let mgr = manager();
        let account = register(&mgr, "alice", "p1");
        let (pair, _) = mgr.login("alice", "p1").unwrap();

        mgr.logout(account.id).unwrap();

        let stored = mgr.store.find_by_id(account.id).unwrap().unwrap();
        assert_eq!(stored.refresh_token, None);
        assert!(matches!(
            mgr.refresh(Some(&pair.refresh_token)),
            Err(AuthError::TokenReuse)
        ));
    }

    #[test]
    fn change_password_swaps_hash_and_revokes_session() {
        let mgr = manager();
        let account = register(&mgr, "alice", "p1");
        let (pair, _) = mgr.login("alice", "p1").unwrap();

        mgr.change_password(account.id, "p1", "p2").unwrap();

        assert!(matches!(
            mgr.login("alice", "p1"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(mgr.login("alice", "p2").is_ok());
        // change_password cleared the stored token before the new login
        // overwrote it, so the old session's token stays dead.
        assert!(matches!(
            mgr.refresh(Some(&pair.refresh_token)),
            Err(AuthError::TokenReuse)
        ));
    }

    #[test]
    fn change_password_rejects_wrong_old_password() {
        let mgr = manager();
        let account = register(&mgr, "alice", "p1");
        let (pair, _) = mgr.login("alice", "p1").unwrap();

        assert!(matches!(
            mgr.change_password(account.id, "wrong", "p2"),
            Err(AuthError::InvalidCredentials)
        ));

        // Failed change leaves both hash and session intact.
        assert!(mgr.refresh(Some(&pair.refresh_token)).is_ok());
    }
}
