use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use tracing::{info, warn};

use muamma_api::AdminCredentials;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => bail!("unknown session store '{}' (expected 'memory' or 'sqlite')", other),
        }
    }
}

/// Everything the server needs at startup, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub admin: AdminCredentials,
    pub session_backend: SessionBackend,
    pub session_ttl_hours: i64,
    pub session_purge_secs: u64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: load("MUAMMA_HOST", "0.0.0.0")?,
            port: load("MUAMMA_PORT", "3000")?,
            db_path: load("MUAMMA_DB_PATH", "muamma.db")?,
            admin: AdminCredentials {
                username: load("MUAMMA_ADMIN_USERNAME", "admin")?,
                password: load("MUAMMA_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD)?,
            },
            session_backend: load("MUAMMA_SESSION_STORE", "sqlite")?,
            session_ttl_hours: load("MUAMMA_SESSION_TTL_HOURS", "24")?,
            session_purge_secs: load("MUAMMA_SESSION_PURGE_SECS", "3600")?,
            secure_cookies: load("MUAMMA_COOKIE_SECURE", "false")?,
        };

        if config.admin.username.is_empty() || config.admin.password.is_empty() {
            bail!("MUAMMA_ADMIN_USERNAME and MUAMMA_ADMIN_PASSWORD must not be empty");
        }
        if config.session_ttl_hours <= 0 {
            bail!("MUAMMA_SESSION_TTL_HOURS must be positive");
        }
        if config.session_purge_secs == 0 {
            bail!("MUAMMA_SESSION_PURGE_SECS must be positive");
        }
        if config.admin.password == DEFAULT_ADMIN_PASSWORD {
            warn!("MUAMMA_ADMIN_PASSWORD is the built-in default; set it before exposing this server");
        }

        Ok(config)
    }
}

fn load<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}"))
}
