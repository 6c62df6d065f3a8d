//! Application settings (TOML).
//!
//! Credentials never live here; they come from the
//! [`ConfigResolver`](crate::config::ConfigResolver). This file only tunes the
//! transport, chat session lifetimes, and logging. Every section is optional:
//!
//! ```toml
//! [api]
//! base_url = "https://api.vectara.io"
//! timeout_secs = 60
//!
//! [chat]
//! session_expiry_secs = 3600
//! cleanup_interval_secs = 60
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! vectara_kit = "info"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Token endpoint for OAuth2 client credentials, unless the credential
    /// profile names its own `auth_url`.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_url: default_auth_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.vectara.io".to_string()
}
fn default_auth_url() -> String {
    "https://auth.vectara.io/oauth2/token".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    #[serde(default = "default_session_expiry_secs")]
    pub session_expiry_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            session_expiry_secs: default_session_expiry_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_session_expiry_secs() -> u64 {
    3600
}
fn default_cleanup_interval_secs() -> u64 {
    60
}

impl ChatSettings {
    pub fn session_expiry(&self) -> Duration {
        Duration::from_secs(self.session_expiry_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Parse and validate settings from a TOML string.
pub fn parse_settings(content: &str) -> Result<Settings> {
    let settings: Settings =
        toml::from_str(content).with_context(|| "Failed to parse settings file")?;

    if settings.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if settings.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }
    if settings.chat.session_expiry_secs == 0 {
        anyhow::bail!("chat.session_expiry_secs must be > 0");
    }
    if settings.chat.cleanup_interval_secs == 0 {
        anyhow::bail!("chat.cleanup_interval_secs must be > 0");
    }

    match settings.logging.default.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => {}
        other => anyhow::bail!(
            "Unknown log level: '{}'. Must be error, warn, info, debug, or trace.",
            other
        ),
    }

    Ok(settings)
}

/// Load settings from `path`, or defaults when `path` is `None`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.api.base_url, "https://api.vectara.io");
        assert_eq!(settings.api.timeout_secs, 60);
        assert_eq!(settings.chat.session_expiry(), Duration::from_secs(3600));
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_partial_override() {
        let settings = parse_settings(
            r#"
[api]
base_url = "http://127.0.0.1:9000"

[chat]
session_expiry_secs = 5
cleanup_interval_secs = 6

[logging.modules]
vectara_kit = "debug"
"#,
        )
        .unwrap();
        assert_eq!(settings.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.api.timeout_secs, 60);
        assert_eq!(settings.chat.cleanup_interval(), Duration::from_secs(6));
        assert_eq!(settings.logging.modules["vectara_kit"], "debug");
    }

    #[test]
    fn test_rejects_zero_expiry() {
        let err = parse_settings("[chat]\nsession_expiry_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("session_expiry_secs"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(parse_settings("[logging]\ndefault = \"loud\"\n").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_settings(Some(Path::new("/nonexistent/vec.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
