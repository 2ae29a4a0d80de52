//! API key resolution
//!
//! The Gemini key is looked up in two places, in order: the process
//! environment, then a local TOML secrets file keyed the same way. The first
//! non-empty value wins.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of both the environment variable and the secrets-file key
pub const API_KEY_NAME: &str = "GEMINI_API_KEY";

/// Default location of the local secrets store
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("⚠️ Error: Gemini API Key not found. Add 'GEMINI_API_KEY' to the deployment variables or to {}.", .searched.display())]
    NotFound { searched: PathBuf },
    #[error("Failed to read secrets file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Secrets file {} is not valid TOML: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Where the key was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    SecretsFile,
}

/// An API credential. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey {
    value: String,
    source: KeySource,
}

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the API key from the environment first, then the secrets file.
pub fn resolve_api_key(secrets_path: &Path) -> Result<ApiKey, SecretError> {
    resolve_from(std::env::var(API_KEY_NAME).ok(), secrets_path)
}

/// Same as [`resolve_api_key`] with the environment value supplied by the caller.
pub fn resolve_from(env_value: Option<String>, secrets_path: &Path) -> Result<ApiKey, SecretError> {
    if let Some(value) = non_empty(env_value) {
        return Ok(ApiKey {
            value,
            source: KeySource::Environment,
        });
    }

    match read_secrets_file(secrets_path)? {
        Some(value) => Ok(ApiKey {
            value,
            source: KeySource::SecretsFile,
        }),
        None => Err(SecretError::NotFound {
            searched: secrets_path.to_path_buf(),
        }),
    }
}

fn read_secrets_file(path: &Path) -> Result<Option<String>, SecretError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No secrets file found");
            return Ok(None);
        }
        Err(source) => {
            return Err(SecretError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let secrets: toml::Table = toml::from_str(&content).map_err(|source| SecretError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let value = match secrets.get(API_KEY_NAME) {
        Some(toml::Value::String(s)) => Some(s.clone()),
        Some(other) => {
            tracing::warn!(path = %path.display(), kind = other.type_str(), "Ignoring non-string GEMINI_API_KEY");
            None
        }
        None => None,
    };
    Ok(non_empty(value))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
