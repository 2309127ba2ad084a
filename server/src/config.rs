//! Configuration management for the session host.

use std::env;
use std::time::Duration;

/// Session host configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// UI listener host address
    pub host: String,
    /// UI listener port
    pub port: u16,
    /// Base URL of the remote store (REST and auth endpoints)
    pub api_url: String,
    /// Project key sent with every store request
    pub api_key: String,
    /// The signed-in user's access token
    pub access_token: String,
    /// WebSocket endpoint of the push channel
    pub push_url: String,
    /// Deadline for a single insert/delete call
    pub remote_timeout: Duration,
    /// Upper bound on the resubscribe backoff
    pub resubscribe_max: Duration,
    /// Bearer token the UI must present (open access when unset)
    pub ui_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let api_url = lookup("SHELF_API_URL")
            .ok_or(ConfigError::Missing("SHELF_API_URL"))?
            .trim_end_matches('/')
            .to_string();
        let api_key = lookup("SHELF_API_KEY").ok_or(ConfigError::Missing("SHELF_API_KEY"))?;
        let access_token =
            lookup("SHELF_ACCESS_TOKEN").ok_or(ConfigError::Missing("SHELF_ACCESS_TOKEN"))?;

        let push_url = lookup("SHELF_PUSH_URL").unwrap_or_else(|| default_push_url(&api_url));

        let remote_timeout = seconds(&lookup, "SHELF_REMOTE_TIMEOUT_SECS", 10)?;
        let resubscribe_max = seconds(&lookup, "SHELF_RESUBSCRIBE_MAX_SECS", 30)?;

        let ui_token = lookup("UI_TOKEN").filter(|t| !t.is_empty());

        Ok(Self {
            host,
            port,
            api_url,
            api_key,
            access_token,
            push_url,
            remote_timeout,
            resubscribe_max,
            ui_token,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidDuration(key)),
        },
    }
}

/// `https://host/x` becomes `wss://host/x/realtime`.
fn default_push_url(api_url: &str) -> String {
    let ws = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    };
    format!("{ws}/realtime")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("{0} must be a positive number of seconds")]
    InvalidDuration(&'static str),
}
