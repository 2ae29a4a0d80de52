//! Process configuration, read once at startup from the environment

use crate::secrets::DEFAULT_SECRETS_PATH;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Fixed decoding parameters sent with every request
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub model: String,
    pub api_base: String,
    pub secrets_path: PathBuf,
    pub session_idle: Duration,
    pub request_timeout: Duration,
    pub generation: GenerationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            generation: GenerationSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parsed(&lookup, "DAISY_PORT")
            .or_else(|| parsed(&lookup, "PORT"))
            .unwrap_or(defaults.port);

        let session_idle = parsed::<u64>(&lookup, "DAISY_SESSION_IDLE_MINUTES")
            .and_then(|m| {
                let secs = m.checked_mul(60);
                if secs.is_none() {
                    tracing::warn!(
                        variable = "DAISY_SESSION_IDLE_MINUTES",
                        minutes = m,
                        "Idle timeout out of range, using default"
                    );
                }
                secs
            })
            .map_or(defaults.session_idle, Duration::from_secs);

        let request_timeout = parsed::<u64>(&lookup, "DAISY_REQUEST_TIMEOUT_SECS")
            .map_or(defaults.request_timeout, Duration::from_secs);

        Self {
            port,
            model: text("DAISY_MODEL").unwrap_or(defaults.model),
            api_base: text("DAISY_API_BASE").unwrap_or(defaults.api_base),
            secrets_path: text("DAISY_SECRETS_PATH").map_or(defaults.secrets_path, PathBuf::from),
            session_idle,
            request_timeout,
            generation: GenerationSettings {
                temperature: parsed(&lookup, "DAISY_TEMPERATURE"),
                max_output_tokens: parsed(&lookup, "DAISY_MAX_OUTPUT_TOKENS"),
            },
        }
    }
}

/// Parse a variable, logging and discarding values that do not parse
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable value, using default");
            None
        }
    }
}
