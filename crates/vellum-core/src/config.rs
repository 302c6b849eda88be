//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured) once at startup.

use std::env;

use crate::constants::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE_KB};

const DEFAULT_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Console log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Object storage settings.
///
/// `connection_variable` is the *name* of the environment variable holding the
/// connection string; the string itself is only resolved when an externally stored
/// document is requested, so a missing value is fatal for those documents alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectStorageSettings {
    pub connection_variable: Option<String>,
    pub container: Option<String>,
}

/// Gateway configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// Transfer chunk size in bytes.
    pub chunk_size: usize,
    pub object_storage: ObjectStorageSettings,
    pub log_format: LogFormat,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let chunk_size_kb = env::var("CONTENT_CHUNK_SIZE_KB")
            .unwrap_or_else(|_| (DEFAULT_CHUNK_SIZE / 1024).to_string())
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("CONTENT_CHUNK_SIZE_KB must be a valid number"))?;

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            chunk_size: chunk_size_kb.saturating_mul(1024),
            object_storage: ObjectStorageSettings {
                connection_variable: non_empty_var("STORAGE_CONNECTION_VARIABLE"),
                container: non_empty_var("STORAGE_CONTAINER"),
            },
            log_format: LogFormat::parse(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            ),
            run_migrations: env::var("RUN_MIGRATIONS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        let chunk_size_kb = self.chunk_size / 1024;
        if self.chunk_size % 1024 != 0 || chunk_size_kb == 0 || chunk_size_kb > MAX_CHUNK_SIZE_KB {
            return Err(anyhow::anyhow!(
                "CONTENT_CHUNK_SIZE_KB must be between 1 and {}",
                MAX_CHUNK_SIZE_KB
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
