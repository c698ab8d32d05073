//! Server configuration parsed from environment variables.

use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use crate::services::uploads::{DEFAULT_MAX_UPLOAD_BYTES, UPLOADS_ROUTE};

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("{key} is not valid UTF-8: '{value}'")]
    NotUnicode { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    /// Origin prefixed to upload URLs. `None` means "use the request Host".
    pub public_base_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATA_DIR`: default `data`
    /// - `UPLOADS_DIR`: default `uploads`
    /// - `PUBLIC_BASE_URL`: unset by default
    /// - `MAX_UPLOAD_BYTES`: default 10 MiB
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `MAX_UPLOAD_BYTES` is not a number, or if
    /// any of these variables is not valid UTF-8.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for key in ENV_KEYS {
            if let Some(value) = env_value(key, std::env::var(key))? {
                vars.insert(key, value);
            }
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `MAX_UPLOAD_BYTES` is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            data_dir: get("DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            uploads_dir: get("UPLOADS_DIR").map_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR), PathBuf::from),
            public_base_url: get("PUBLIC_BASE_URL").map(|v| v.trim().trim_end_matches('/').to_owned()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    /// Base joined with stored blob names: absolute when `PUBLIC_BASE_URL` is
    /// set, otherwise the bare route path.
    #[must_use]
    pub fn uploads_public_base(&self) -> String {
        match &self.public_base_url {
            Some(origin) => format!("{origin}{UPLOADS_ROUTE}"),
            None => UPLOADS_ROUTE.to_owned(),
        }
    }
}

/// Variables read by [`ServerConfig::from_env`].
const ENV_KEYS: [&str; 5] = ["PORT", "DATA_DIR", "UPLOADS_DIR", "PUBLIC_BASE_URL", "MAX_UPLOAD_BYTES"];

/// `Ok(None)` only when the variable is absent; a non-UTF-8 value is an error.
fn env_value(key: &'static str, value: Result<String, VarError>) -> Result<Option<String>, ConfigError> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::NotUnicode { key, value: raw.to_string_lossy().into_owned() }),
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::Invalid { key, value }),
    }
}
