use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vestibule_types::models::Account;

use crate::error::AuthError;

/// Claims carried by a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub exp: usize,
}

/// Claims carried by a refresh token. The `jti` makes every issued token
/// unique, so rotation yields a distinct token even within one clock second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub exp: usize,
}

/// Signing secrets and expiries, loaded once at startup and immutable
/// thereafter. The two secrets are independent: rotating one never breaks
/// tokens of the other kind.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Pure function of the account, the access secret, and the clock.
    pub fn issue_access_token(&self, account: &Account) -> Result<String, AuthError> {
        let claims = AccessClaims {
            sub: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            exp: expiry(self.config.access_ttl_secs),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )
        .map_err(|_| AuthError::Signing)
    }

    pub fn issue_refresh_token(&self, account_id: Uuid) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            sub: account_id,
            jti: Uuid::new_v4(),
            exp: expiry(self.config.refresh_ttl_secs),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
        )
        .map_err(|_| AuthError::Signing)
    }

    pub fn issue_pair(&self, account: &Account) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(account.id)?,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}

fn expiry(ttl_secs: i64) -> usize {
    (chrono::Utc::now() + chrono::Duration::seconds(ttl_secs)).timestamp() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig {
            access_secret: "access-secret-for-tests".into(),
            refresh_secret: "refresh-secret-for-tests".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
        })
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            full_name: "Alice".into(),
            password_hash: String::new(),
            refresh_token: None,
            avatar_url: "https://media.test/avatar/1".into(),
            cover_image_url: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn access_claims_roundtrip() {
        let svc = service();
        let acct = account();

        let token = svc.issue_access_token(&acct).unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, acct.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "a@x.com");
    }

    #[test]
    fn secrets_are_independent() {
        let svc = service();
        let acct = account();

        let access = svc.issue_access_token(&acct).unwrap();
        let refresh = svc.issue_refresh_token(acct.id).unwrap();

        // Each token kind only verifies under its own secret.
        assert!(svc.verify_refresh_token(&access).is_err());
        assert!(svc.verify_access_token(&refresh).is_err());
        assert!(svc.verify_refresh_token(&refresh).is_ok());
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let expired = TokenService::new(TokenConfig {
            access_secret: "access-secret-for-tests".into(),
            refresh_secret: "refresh-secret-for-tests".into(),
            access_ttl_secs: -120,
            refresh_ttl_secs: -120,
        });

        let token = expired.issue_refresh_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            service().verify_refresh_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(matches!(
            service().verify_refresh_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn refresh_tokens_are_unique_per_issue() {
        let svc = service();
        let id = Uuid::new_v4();
        let a = svc.issue_refresh_token(id).unwrap();
        let b = svc.issue_refresh_token(id).unwrap();
        assert_ne!(a, b);
    }
}
