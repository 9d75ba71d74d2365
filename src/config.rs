//! Client configuration.

use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::ConfigError;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";
const DEFAULT_STORAGE_DIR: &str = ".workout-tracker";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without a trailing slash
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    /// Signed-in user; commits are refused without one
    pub user_id: Option<i64>,
    /// Directory backing the persisted draft
    pub storage_dir: PathBuf,
    /// Transport timeout per request in milliseconds
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_base_url(api_base_url.into()),
            api_token: None,
            user_id: None,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `WORKOUT_API_URL` - Backend base URL (default: "http://127.0.0.1:8080/api")
    /// - `WORKOUT_API_TOKEN` - Bearer token (default: none)
    /// - `WORKOUT_USER_ID` - Signed-in user id (default: none)
    /// - `WORKOUT_STORAGE_DIR` - Draft storage directory (default: ".workout-tracker")
    /// - `WORKOUT_REQUEST_TIMEOUT_MS` - Request timeout (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("WORKOUT_API_URL").unwrap_or_else(|| {
            info!("WORKOUT_API_URL not set, using default: {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let user_id = lookup("WORKOUT_USER_ID")
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError(format!("invalid WORKOUT_USER_ID: {e}")))
            })
            .transpose()?;

        let request_timeout_ms = match lookup("WORKOUT_REQUEST_TIMEOUT_MS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| ConfigError(format!("invalid WORKOUT_REQUEST_TIMEOUT_MS: {e}")))?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        let storage_dir = lookup("WORKOUT_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        Ok(Self {
            api_base_url: trim_base_url(api_base_url),
            api_token: lookup("WORKOUT_API_TOKEN").filter(|t| !t.is_empty()),
            user_id,
            storage_dir,
            request_timeout_ms,
        })
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
