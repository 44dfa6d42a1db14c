//! Environment-driven settings.
//!
//! # Responsibility
//! - Load `.env` (when present) and resolve every runtime setting once.
//! - Fail fast at setup on unknown environments or missing required keys.
//!
//! # Invariants
//! - `debug` is true only in development.
//! - `page_size <= max_page_size`.

use crate::logging::default_log_level;
use crate::model::base::UserId;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "stencil.sqlite3";
pub const DEFAULT_PAGE_SIZE: u32 = 24;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("ENVIRONMENT must be one of: development, deployment; got `{0}`")]
    UnknownEnvironment(String),
    #[error("{0} is required in deployment")]
    Missing(&'static str),
    #[error("{key} must be {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Deployment,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "deployment" => Ok(Self::Deployment),
            _ => Err(ConfigError::UnknownEnvironment(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub environment: Environment,
    pub debug: bool,
    pub database_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub page_size: u32,
    pub max_page_size: u32,
    /// User substituted into audit columns when a referenced user is
    /// hard deleted. `None` writes NULL.
    pub audit_default_user: Option<UserId>,
}

impl Settings {
    /// Reads settings from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match get("ENVIRONMENT") {
            Some(raw) => raw.parse()?,
            None => Environment::Development,
        };
        let deployment = environment == Environment::Deployment;

        let database_path = match get("DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None if deployment => return Err(ConfigError::Missing("DATABASE_PATH")),
            None => PathBuf::from(DEFAULT_DATABASE_PATH),
        };
        let log_dir = match get("LOG_DIR") {
            Some(dir) => Some(PathBuf::from(dir)),
            None if deployment => return Err(ConfigError::Missing("LOG_DIR")),
            None => None,
        };

        let page_size = parse_or("PAGE_SIZE", get("PAGE_SIZE"), DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_or("MAX_PAGE_SIZE", get("MAX_PAGE_SIZE"), DEFAULT_MAX_PAGE_SIZE)?;
        if page_size == 0 || page_size > max_page_size {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                expected: "between 1 and MAX_PAGE_SIZE",
                value: page_size.to_string(),
            });
        }

        let audit_default_user = get("AUDIT_DEFAULT_USER_ID")
            .map(|raw| {
                raw.parse::<UserId>().map_err(|_| ConfigError::Invalid {
                    key: "AUDIT_DEFAULT_USER_ID",
                    expected: "an integer user id",
                    value: raw,
                })
            })
            .transpose()?;

        Ok(Self {
            environment,
            debug: !deployment,
            database_path,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| default_log_level().to_string()),
            log_dir,
            page_size,
            max_page_size,
            audit_default_user,
        })
    }
}

fn parse_or(key: &'static str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a positive integer",
            value,
        }),
    }
}
