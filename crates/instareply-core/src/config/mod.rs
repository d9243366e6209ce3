use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration for instareply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatDefaults,
    pub providers: ProvidersConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.storage.data_dir)
    }

    /// Directory backing the client-scoped profile storage.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir().join("storage")
    }

    /// Completion-provider credential, if configured.
    pub fn openai_api_key(&self) -> Option<&str> {
        non_empty(&self.providers.openai.api_key)
    }

    /// Mailing-list credential, if configured.
    pub fn kit_api_key(&self) -> Option<&str> {
        non_empty(&self.providers.kit.api_key)
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Fixed parameters for every completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub kit: MailingListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailingListConfig {
    pub api_key: String,
    pub api_base: String,
    pub tag_name: String,
}

impl Default for MailingListConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.kit.com/v4".to_string(),
            tag_name: "instareply-waitlist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.instareply".to_string(),
        }
    }
}

// ====== Config loading/saving ======

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `INSTAREPLY_CONFIG` env var: full JSON config
/// 2. Individual env vars (merged on top of the file config)
/// 3. File fallback (`~/.instareply/config.json`)
pub fn load_config_from_env() -> Config {
    if let Ok(json) = std::env::var("INSTAREPLY_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse INSTAREPLY_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(None);

    // Completion provider
    if let Ok(v) = std::env::var("OPENAI_API_KEY") {
        cfg.providers.openai.api_key = v;
    }
    if let Ok(v) = std::env::var("OPENAI_API_BASE") {
        cfg.providers.openai.api_base = Some(v);
    }
    if let Ok(v) = std::env::var("INSTAREPLY_MODEL") {
        cfg.chat.model = v;
    }

    // Mailing list
    if let Ok(v) = std::env::var("KIT_API_KEY") {
        cfg.providers.kit.api_key = v;
    }
    if let Ok(v) = std::env::var("KIT_API_BASE") {
        cfg.providers.kit.api_base = v;
    }
    if let Ok(v) = std::env::var("KIT_TAG_NAME") {
        if !v.trim().is_empty() {
            cfg.providers.kit.tag_name = v;
        }
    }

    // Server
    if let Ok(v) = std::env::var("INSTAREPLY_HOST") {
        cfg.server.host = v;
    }
    if let Ok(v) = std::env::var("INSTAREPLY_PORT") {
        match v.parse() {
            Ok(port) => cfg.server.port = port,
            Err(e) => tracing::warn!("Ignoring INSTAREPLY_PORT={}: {}", v, e),
        }
    }

    // Storage
    if let Ok(v) = std::env::var("INSTAREPLY_DATA_DIR") {
        cfg.storage.data_dir = v;
    }

    cfg
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".instareply")
        .join("config.json")
}

/// Load configuration from file or create default.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> std::result::Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}
