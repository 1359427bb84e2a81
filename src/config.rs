use std::time::Duration;

use copa_persistence_sea_orm::DEFAULT_DATABASE_URL;
use copa_server_app::{AppConfig, DEFAULT_CONFIRMATION_TTL, services::deadline::DEFAULT_STORE_TIMEOUT};
use copa_server_http_api::{AuthConfig, HttpConfig};

use crate::logs::LogFile;

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_HTTP_BIND: &str = "127.0.0.1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub app: AppConfig,
    pub log_file: Option<LogFile>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("COPA_HTTP_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "COPA_HTTP_PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_HTTP_PORT,
        };

        let store_timeout = seconds(
            var("COPA_STORE_TIMEOUT_SECS"),
            "COPA_STORE_TIMEOUT_SECS",
            DEFAULT_STORE_TIMEOUT,
        )?;
        let confirmation_ttl = seconds(
            var("COPA_CONFIRMATION_TTL_SECS"),
            "COPA_CONFIRMATION_TTL_SECS",
            DEFAULT_CONFIRMATION_TTL,
        )?;

        let log_file = match (var("LOG_FILE_PATH"), var("LOG_ARCHIVE_PATTERN")) {
            (Some(path), Some(archive_pattern)) => Some(LogFile {
                path,
                archive_pattern,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: var("COPA_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            http: HttpConfig {
                bind: var("COPA_HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string()),
                port,
            },
            auth: AuthConfig {
                jwt_secret: var("COPA_JWT_SECRET"),
                admin_username: var("COPA_ADMIN_USERNAME"),
                admin_password_hash: var("COPA_ADMIN_PASSWORD_HASH"),
            },
            app: AppConfig {
                store_timeout,
                confirmation_ttl,
            },
            log_file,
        })
    }
}

fn seconds(
    value: Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid {
                name,
                expected: "a positive number of seconds",
                value,
            }),
        },
        None => Ok(default),
    }
}
