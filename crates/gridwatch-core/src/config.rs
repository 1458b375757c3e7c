//! GridWatch configuration system.
//!
//! Resolution order: built-in defaults → TOML file (`~/.gridwatch/config.toml`
//! or `--config`) → environment variables. The result is an immutable
//! snapshot read once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GridWatchError, Result};
use crate::types::PlatformId;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridWatchConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub golem: GolemConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub ai_training: AiTrainingConfig,
}

impl GridWatchConfig {
    /// Load config from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GridWatchError::Config(format!("Failed to read config {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| GridWatchError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the GridWatch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gridwatch")
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(ids) = get("ALLOWED_CHAT_IDS") {
            self.telegram.allowed_chat_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>()
                        .map_err(|_| GridWatchError::Config(format!("ALLOWED_CHAT_IDS: invalid chat id '{s}'")))
                })
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(v) = get("MONITORING_ENABLED") {
            self.monitoring.enabled = parse_bool("MONITORING_ENABLED", &v)?;
        }
        if let Some(v) = get("MONITORING_INTERVAL") {
            self.monitoring.interval_secs = parse_u64("MONITORING_INTERVAL", &v)?;
        }
        if let Some(v) = get("ADAPTER_TIMEOUT") {
            self.monitoring.adapter_timeout_secs = parse_u64("ADAPTER_TIMEOUT", &v)?;
        }
        if let Some(v) = get("SUBSCRIBERS_PATH") {
            self.monitoring.subscribers_path = v;
        }

        if let Some(v) = get("GOLEM_ENABLED") {
            self.golem.enabled = parse_bool("GOLEM_ENABLED", &v)?;
        }
        if let Some(v) = get("GOLEMSP_PATH") {
            self.golem.binary_path = v;
        }

        if let Some(v) = get("RENDER_ENABLED") {
            self.render.enabled = parse_bool("RENDER_ENABLED", &v)?;
        }
        if let Some(v) = get("RENDER_STATUS_URL") {
            self.render.status_url = v;
        }

        if let Some(v) = get("TOGETHER_AI_ENABLED") {
            self.ai_training.together_ai_enabled = parse_bool("TOGETHER_AI_ENABLED", &v)?;
        }
        if let Some(v) = get("AKASH_NODE_ENABLED") {
            self.ai_training.akash_enabled = parse_bool("AKASH_NODE_ENABLED", &v)?;
        }
        if let Some(v) = get("AI_TRAINING_STATUS_URL") {
            self.ai_training.status_url = v;
        }
        if let Some(v) = get("AI_TRAINING_API_KEY") {
            self.ai_training.api_key = v;
        }
        Ok(())
    }

    /// Validate settings required to run the bot.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(GridWatchError::Config(
                "BOT_TOKEN is not set. Please set it in .env file or environment.".into(),
            ));
        }
        if self.monitoring.interval_secs == 0 {
            return Err(GridWatchError::Config("MONITORING_INTERVAL must be at least 1 second".into()));
        }
        if self.monitoring.adapter_timeout_secs == 0 {
            return Err(GridWatchError::Config("ADAPTER_TIMEOUT must be at least 1 second".into()));
        }
        Ok(())
    }

    pub fn is_platform_enabled(&self, platform: PlatformId) -> bool {
        match platform {
            PlatformId::Golem => self.golem.enabled,
            PlatformId::Render => self.render.enabled,
            PlatformId::AiTraining => self.ai_training.enabled(),
        }
    }

    pub fn enabled_platforms(&self) -> Vec<PlatformId> {
        PlatformId::ALL
            .into_iter()
            .filter(|p| self.is_platform_enabled(*p))
            .collect()
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.telegram.bot_token = mask(&copy.telegram.bot_token);
        copy.ai_training.api_key = mask(&copy.ai_training.api_key);
        copy
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "***".into()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(GridWatchError::Config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| GridWatchError::Config(format!("{key}: expected a number of seconds, got '{value}'")))
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// When non-empty, only these chats are served.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 { 1 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chat_ids: vec![],
            poll_interval: default_poll_interval(),
        }
    }
}

/// Background monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// JSON file mirroring the subscriber registry; empty keeps it in memory.
    #[serde(default)]
    pub subscribers_path: String,
}

fn bool_true() -> bool { true }
fn default_interval() -> u64 { 300 }
fn default_adapter_timeout() -> u64 { 30 }

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval(),
            adapter_timeout_secs: default_adapter_timeout(),
            subscribers_path: String::new(),
        }
    }
}

impl MonitoringConfig {
    pub fn subscribers_file(&self) -> Option<PathBuf> {
        if self.subscribers_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(shellexpand::tilde(&self.subscribers_path).to_string()))
        }
    }
}

/// Golem provider (`golemsp`) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GolemConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Explicit binary path; empty searches PATH and common install dirs.
    #[serde(default)]
    pub binary_path: String,
}

impl Default for GolemConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary_path: String::new(),
        }
    }
}

/// Render Network worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_render_pattern")]
    pub process_pattern: String,
    /// Optional JSON endpoint with job/earnings counters.
    #[serde(default)]
    pub status_url: String,
}

fn default_render_pattern() -> String { "render".into() }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            process_pattern: default_render_pattern(),
            status_url: String::new(),
        }
    }
}

/// AI-training providers configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTrainingConfig {
    #[serde(default)]
    pub together_ai_enabled: bool,
    #[serde(default)]
    pub akash_enabled: bool,
    #[serde(default = "default_ai_search_terms")]
    pub process_search_terms: Vec<String>,
    #[serde(default)]
    pub status_url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_ai_search_terms() -> Vec<String> {
    vec!["together", "akash", "ai-training", "inference"]
        .into_iter().map(String::from).collect()
}

impl Default for AiTrainingConfig {
    fn default() -> Self {
        Self {
            together_ai_enabled: false,
            akash_enabled: false,
            process_search_terms: default_ai_search_terms(),
            status_url: String::new(),
            api_key: String::new(),
        }
    }
}

impl AiTrainingConfig {
    pub fn enabled(&self) -> bool {
        self.together_ai_enabled || self.akash_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_config() {
        let config = GridWatchConfig::default();
        assert!(config.monitoring.enabled);
        assert_eq!(config.monitoring.interval_secs, 300);
        assert_eq!(config.monitoring.adapter_timeout_secs, 30);
        assert_eq!(config.enabled_platforms(), vec![PlatformId::Golem]);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [telegram]
            bot_token = "123:abc"
            allowed_chat_ids = [42]

            [monitoring]
            interval_secs = 60

            [render]
            enabled = true
            status_url = "http://127.0.0.1:9000/status"
        "#;

        let config: GridWatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.allowed_chat_ids, vec![42]);
        assert_eq!(config.monitoring.interval_secs, 60);
        assert!(config.render.enabled);
        assert_eq!(config.render.process_pattern, "render");
        assert!(config.golem.enabled);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: GridWatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.telegram.poll_interval, 1);
        assert!(!config.ai_training.enabled());
        assert_eq!(config.ai_training.process_search_terms.len(), 4);
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("BOT_TOKEN", "999:xyz"),
            ("MONITORING_ENABLED", "false"),
            ("MONITORING_INTERVAL", "120"),
            ("TOGETHER_AI_ENABLED", "TRUE"),
            ("ALLOWED_CHAT_IDS", "1, 2,3"),
            ("RENDER_STATUS_URL", "  "),
        ]);
        let mut config = GridWatchConfig::default();
        config.apply_env_with(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.telegram.bot_token, "999:xyz");
        assert!(!config.monitoring.enabled);
        assert_eq!(config.monitoring.interval_secs, 120);
        assert!(config.is_platform_enabled(PlatformId::AiTraining));
        assert_eq!(config.telegram.allowed_chat_ids, vec![1, 2, 3]);
        assert!(config.render.status_url.is_empty());
    }

    #[test]
    fn test_env_invalid_values_rejected() {
        let vars = env(&[("MONITORING_INTERVAL", "five minutes")]);
        let mut config = GridWatchConfig::default();
        assert!(config.apply_env_with(|k| vars.get(k).cloned()).is_err());

        let vars = env(&[("RENDER_ENABLED", "maybe")]);
        assert!(config.apply_env_with(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_missing_bot_token_is_fatal() {
        let config = GridWatchConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = GridWatchConfig::default();
        config.telegram.bot_token = "123:secret".into();
        let shown = config.redacted();
        assert_eq!(shown.telegram.bot_token, "***");
        assert!(shown.ai_training.api_key.is_empty());
    }

    #[test]
    fn test_home_dir() {
        let home = GridWatchConfig::home_dir();
        assert!(home.to_string_lossy().contains("gridwatch"));
    }
}
