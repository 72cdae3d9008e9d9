//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Portal API base URL (no trailing slash)
    pub base_url: String,
    /// Authority expected in attendance QR codes
    pub qr_authority: String,
    /// Where the secure token store lives on disk
    pub store_path: PathBuf,
    /// Timeout for ordinary API requests
    pub request_timeout: Duration,
    /// Timeout for requests that upload images
    pub upload_timeout: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            qr_authority: "qr.kstu.kg".to_string(),
            store_path: PathBuf::from(".kstu-portal/store.json"),
            request_timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            base_url: env::var("PORTAL_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("PORTAL_BASE_URL"))?,
            qr_authority: env::var("PORTAL_QR_AUTHORITY")
                .unwrap_or_else(|_| "qr.kstu.kg".to_string()),
            store_path: env::var("PORTAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".kstu-portal/store.json")),
            request_timeout: Duration::from_secs(
                env::var("PORTAL_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            upload_timeout: Duration::from_secs(
                env::var("PORTAL_UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("PORTAL_BASE_URL", "https://api.kstu.kg/");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.base_url, "https://api.kstu.kg");
        assert_eq!(config.qr_authority, "qr.kstu.kg");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.upload_timeout, Duration::from_secs(30));
    }
}
