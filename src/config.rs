//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use crate::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Maximum model turns per query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Timeout for a single model request
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// OAuth client used to refresh users' Google tokens
    #[serde(default)]
    pub google: GoogleConfig,

    /// Where per-user Google credentials are stored
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub download: DownloadConfig,
}

/// OAuth client credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token -> user id
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_keys: HashMap::new(),
        }
    }
}

/// Download reference signing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Signing secret. A random one is generated per process when empty,
    /// which invalidates outstanding references on restart.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_max_iterations() -> usize {
    20
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_ttl_secs() -> i64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_iterations: default_max_iterations(),
            llm_timeout_secs: default_llm_timeout_secs(),
            google: GoogleConfig::default(),
            credentials_path: default_credentials_path(),
            server: ServerConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).filter(|v| !v.is_empty());

        if let Some(key) = get("GEMINI_API_KEY") {
            self.gemini_api_key = key;
        }
        if let Some(model) = get("MINDLY_MODEL") {
            self.model = model;
        }
        if let Some(id) = get("GOOGLE_CLIENT_ID") {
            self.google.client_id = id;
        }
        if let Some(secret) = get("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = secret;
        }
        if let Some(secret) = get("MINDLY_DOWNLOAD_SECRET") {
            self.download.secret = secret;
        }
        if let Some(bind) = get("MINDLY_BIND") {
            self.server.bind = bind;
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mindly")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, falling back to defaults when it is absent.
/// Environment overrides are applied either way.
pub fn load() -> Result<Config> {
    let path = config_path();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)?
    } else {
        tracing::debug!("No config at {:?}, using defaults", path);
        Config::default()
    };

    config.apply_env();
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.download.ttl_secs, 3600);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"gemini_api_key": "k", "server": {"api_keys": {"tok": "user-1"}}}"#,
        )
        .unwrap();
        assert_eq!(config.gemini_api_key, "k");
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.server.api_keys.get("tok").map(String::as_str), Some("user-1"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "GEMINI_API_KEY" => Some("from-env".to_string()),
            "MINDLY_BIND" => Some("0.0.0.0:8080".to_string()),
            "GOOGLE_CLIENT_ID" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.gemini_api_key, "from-env");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        // empty values do not clobber
        assert_eq!(config.google.client_id, "");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
    }
}
