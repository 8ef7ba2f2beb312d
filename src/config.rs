use crate::error::AldinResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables that override the stored endpoint settings
pub const ENV_API_BASE: &str = "ALDIN_API_BASE";
pub const ENV_API_KEY: &str = "ALDIN_API_KEY";
pub const ENV_MODEL: &str = "ALDIN_MODEL";

/// Sampling parameters sent with every chat-completions request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub n_predict: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            top_p: 1.0,
            n_predict: 256,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Endpoint
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub generation: GenerationParams,

    // Conversation
    pub system_prompt: String,

    // Speech
    pub wake_word: String,
    pub locale: String,
    pub voice_output: bool,
    pub wake_on_start: bool,
    pub overlay_enabled: bool,
    pub no_speech_timeout_secs: u64,
    pub max_consecutive_recognition_errors: u32,

    // Timing
    pub settle_delay_ms: u64,
    pub greeting_ms: u64,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            api_key: "aldin-local-key".to_string(),
            model: "aldin-mini".to_string(),
            request_timeout_secs: 60,
            generation: GenerationParams::default(),
            system_prompt: "You are Aldin-Mini, a helpful, concise home AI assistant.".to_string(),
            wake_word: "aldin".to_string(),
            locale: "en-US".to_string(),
            voice_output: true,
            wake_on_start: false,
            overlay_enabled: true,
            no_speech_timeout_secs: 8,
            max_consecutive_recognition_errors: 5,
            settle_delay_ms: 400,
            greeting_ms: 2500,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, then apply env overrides
    pub fn load() -> AldinResult<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from a file, or fall back to defaults
    pub fn load_from(path: &Path) -> AldinResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                // Keep the broken file around for inspection
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> AldinResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `ALDIN_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_API_BASE) {
            self.api_base = v;
        }
        if let Some(v) = non_empty(ENV_API_KEY) {
            self.api_key = v;
        }
        if let Some(v) = non_empty(ENV_MODEL) {
            self.model = v;
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aldin")
        .join("config.json")
}
