use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use vestibule_auth::TokenConfig;

/// Placeholder signing secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub media_url: String,
    pub tokens: TokenConfig,
}

impl Config {
    /// Read the whole configuration once at startup; it is immutable for
    /// the life of the process.
    pub fn from_env() -> Result<Self> {
        let access_secret = require_secret("VESTIBULE_ACCESS_TOKEN_SECRET")?;
        let refresh_secret = require_secret("VESTIBULE_REFRESH_TOKEN_SECRET")?;
        if access_secret == refresh_secret {
            bail!("VESTIBULE_ACCESS_TOKEN_SECRET and VESTIBULE_REFRESH_TOKEN_SECRET must differ");
        }

        Ok(Self {
            host: std::env::var("VESTIBULE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("VESTIBULE_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .context("VESTIBULE_PORT must be a port number")?,
            db_path: std::env::var("VESTIBULE_DB_PATH")
                .unwrap_or_else(|_| "vestibule.db".into())
                .into(),
            upload_dir: std::env::var("VESTIBULE_UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".into())
                .into(),
            media_url: std::env::var("VESTIBULE_MEDIA_URL")
                .unwrap_or_else(|_| "http://localhost:9200".into()),
            tokens: TokenConfig {
                access_secret,
                refresh_secret,
                access_ttl_secs: env_i64("VESTIBULE_ACCESS_TOKEN_TTL_SECS", 900)?,
                refresh_ttl_secs: env_i64("VESTIBULE_REFRESH_TOKEN_TTL_SECS", 604_800)?,
            },
        })
    }
}

fn require_secret(name: &str) -> Result<String> {
    let value = std::env::var(name).unwrap_or_default();
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        bail!("{name} is unset or still a placeholder; set it before starting");
    }
    Ok(value)
}

fn env_i64(name: &str, default: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} must be a number of seconds")),
        Err(_) => Ok(default),
    }
}
