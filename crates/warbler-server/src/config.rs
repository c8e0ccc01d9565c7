use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Secret used when `WARBLER_SECRET_KEY` is unset. Fine for local runs only.
pub const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub session_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("WARBLER_PORT") {
            Some(v) => v
                .parse()
                .with_context(|| format!("WARBLER_PORT is not a port number: {v}"))?,
            None => 5000,
        };
        let session_days = match lookup("WARBLER_SESSION_DAYS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("WARBLER_SESSION_DAYS is not a number: {v}"))?,
            None => 30,
        };
        if session_days <= 0 {
            anyhow::bail!("WARBLER_SESSION_DAYS must be positive, got {session_days}");
        }

        Ok(Self {
            db_path: lookup("WARBLER_DB_PATH")
                .unwrap_or_else(|| "warbler.db".into())
                .into(),
            host: lookup("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            secret_key: lookup("WARBLER_SECRET_KEY")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEV_SECRET.into()),
            session_days,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET
    }
}
