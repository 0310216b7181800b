use anyhow::anyhow;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use vestibule_auth::error::StoreError;
use vestibule_auth::store::{CredentialStore, NewAccount};
use vestibule_types::models::Account;

use crate::Database;

const ACCOUNT_COLUMNS: &str =
    "id, username, email, full_name, password_hash, refresh_token, avatar_url, cover_image_url, created_at";

impl Database {
    fn run<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Backend(anyhow!("DB lock poisoned: {}", e)))?;
        f(&conn).map_err(translate)
    }
}

impl CredentialStore for Database {
    fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        self.run(|conn| {
            conn.execute(
                "INSERT INTO accounts
                    (id, username, email, full_name, password_hash, avatar_url, cover_image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id.to_string(),
                    account.username,
                    account.email,
                    account.full_name,
                    account.password_hash,
                    account.avatar_url,
                    account.cover_image_url,
                    created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;

        Ok(Account {
            id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            password_hash: account.password_hash,
            refresh_token: None,
            avatar_url: account.avatar_url,
            cover_image_url: account.cover_image_url,
            created_at,
        })
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let row = self.run(|conn| {
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1 OR email = ?1"
            );
            conn.query_row(&sql, [identifier], map_row).optional()
        })?;

        row.map(into_account).transpose()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = self.run(|conn| {
            let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
            conn.query_row(&sql, [id.to_string()], map_row).optional()
        })?;

        row.map(into_account).transpose()
    }

    fn taken_username_or_email(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        self.run(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1 OR email = ?2)",
                [username, email],
                |row| row.get(0),
            )
        })
    }

    fn update_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        self.run(|conn| {
            conn.execute(
                "UPDATE accounts SET refresh_token = ?1 WHERE id = ?2",
                rusqlite::params![token, id.to_string()],
            )?;
            Ok(())
        })
    }

    fn swap_refresh_token(&self, id: Uuid, expected: &str, new: &str) -> Result<bool, StoreError> {
        // Guarded update: the row only changes while the stored token still
        // equals the presented one, which makes rotation atomic per account.
        self.run(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET refresh_token = ?1
                 WHERE id = ?2 AND refresh_token = ?3",
                rusqlite::params![new, id.to_string(), expected],
            )?;
            Ok(changed == 1)
        })
    }

    fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        self.run(|conn| {
            conn.execute(
                "UPDATE accounts SET password_hash = ?1 WHERE id = ?2",
                rusqlite::params![hash, id.to_string()],
            )?;
            Ok(())
        })
    }

    fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Account, StoreError> {
        self.run(|conn| {
            conn.execute(
                "UPDATE accounts SET full_name = ?1, email = ?2 WHERE id = ?3",
                rusqlite::params![full_name, email, id.to_string()],
            )?;
            Ok(())
        })?;
        self.reload(id)
    }

    fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
        self.run(|conn| {
            conn.execute(
                "UPDATE accounts SET avatar_url = ?1 WHERE id = ?2",
                rusqlite::params![url, id.to_string()],
            )?;
            Ok(())
        })?;
        self.reload(id)
    }

    fn update_cover_image_url(&self, id: Uuid, url: &str) -> Result<Account, StoreError> {
        self.run(|conn| {
            conn.execute(
                "UPDATE accounts SET cover_image_url = ?1 WHERE id = ?2",
                rusqlite::params![url, id.to_string()],
            )?;
            Ok(())
        })?;
        self.reload(id)
    }
}

impl Database {
    fn reload(&self, id: Uuid) -> Result<Account, StoreError> {
        self.find_by_id(id)?
            .ok_or_else(|| StoreError::Backend(anyhow!("account {} vanished mid-update", id)))
    }
}

struct AccountRow {
    id: String,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    refresh_token: Option<String>,
    avatar_url: String,
    cover_image_url: Option<String>,
    created_at: String,
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        refresh_token: row.get(5)?,
        avatar_url: row.get(6)?,
        cover_image_url: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn into_account(row: AccountRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row
            .id
            .parse()
            .map_err(|e| StoreError::Backend(anyhow!("bad account id: {}", e)))?,
        username: row.username,
        email: row.email,
        full_name: row.full_name,
        password_hash: row.password_hash,
        refresh_token: row.refresh_token,
        avatar_url: row.avatar_url,
        cover_image_url: row.cover_image_url,
        created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| StoreError::Backend(anyhow!("bad created_at: {}", e)))?
            .with_timezone(&Utc),
    })
}

fn translate(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, message) = &e {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            let field = match message.as_deref() {
                Some(m) if m.contains("email") => "email",
                _ => "username",
            };
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Backend(e.into())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
