//! Typed configuration from environment variables.
//!
//! Loads once at startup. Every setting has a default; malformed values fail
//! fast. Sensitive values are wrapped in secrecy::SecretString to prevent log
//! leaks.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::worker::WorkerConfig;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgConnectOptions;

#[derive(Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    /// Number of workers started by `jobq serve`.
    pub worker_count: usize,
    /// How long the built-in placeholder execution step takes.
    pub exec_delay: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Where the store lives and how many connections to keep.
#[derive(Debug)]
pub struct DatabaseConfig {
    /// Full connection URL. When set, the individual parts are ignored.
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: SecretString::from("password".to_string()),
            name: "testdb".to_string(),
            min_connections: 2,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Config that connects to `url` with the default pool bounds.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(SecretString::from(url.into())),
            ..Self::default()
        }
    }

    /// Build sqlx connect options from either the URL or the parts.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(ref url) = self.url {
            return url
                .expose_secret()
                .parse()
                .map_err(|e| Error::Config(format!("invalid DATABASE_URL: {e}")));
        }

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.name))
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").map(SecretString::from),
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "DB_PORT", defaults.port)?,
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD")
                .map(SecretString::from)
                .unwrap_or(defaults.password),
            name: lookup("DB_NAME").unwrap_or(defaults.name),
            min_connections: parse_var(&lookup, "DB_POOL_MIN", defaults.min_connections)?,
            max_connections: parse_var(&lookup, "DB_POOL_MAX", defaults.max_connections)?,
        };

        if database.max_connections == 0 || database.max_connections < database.min_connections {
            return Err(Error::Config(format!(
                "DB_POOL_MAX ({}) must be positive and at least DB_POOL_MIN ({})",
                database.max_connections, database.min_connections
            )));
        }

        let worker_defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            idle_interval: parse_millis(
                &lookup,
                "WORKER_IDLE_INTERVAL_MS",
                worker_defaults.idle_interval,
            )?,
            error_backoff: parse_millis(
                &lookup,
                "WORKER_ERROR_BACKOFF_MS",
                worker_defaults.error_backoff,
            )?,
        };

        // A zero pause turns the worker loop into a busy poll of the store.
        for (name, pause) in [
            ("WORKER_IDLE_INTERVAL_MS", worker.idle_interval),
            ("WORKER_ERROR_BACKOFF_MS", worker.error_backoff),
        ] {
            if pause.is_zero() {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }

        Ok(Self {
            database,
            worker,
            worker_count: parse_var(&lookup, "WORKER_COUNT", 1)?,
            exec_delay: parse_millis(&lookup, "WORKER_EXEC_DELAY_MS", Duration::from_secs(2))?,
            otel_endpoint: lookup("OTEL_ENDPOINT"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn parse_millis<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_var(lookup, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}
