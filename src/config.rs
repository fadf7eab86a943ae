use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::model::ConfigError;
use crate::utils::truthy;

pub const DEFAULT_PARSEXTRACT_URL: &str = "https://api.parseextract.com/v1/data-extract";

const DEFAULT_PROMPT: &str = "Extract all dart game scores, player names, and round \
information from this image. Format as JSON with fields: rounds, scores, players.";

/// Settings for the outbound ParseExtract call, persisted as config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub parsextract_url: String,
    pub api_key: Option<String>,
    pub prompt: String,
    pub extra_params: HashMap<String, String>,
    pub stub: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            parsextract_url: DEFAULT_PARSEXTRACT_URL.to_string(),
            api_key: None,
            prompt: DEFAULT_PROMPT.to_string(),
            extra_params: HashMap::new(),
            stub: false,
        }
    }
}

/// File-backed configuration store. Reads merge the file over the defaults;
/// writes persist the merged result.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted config merged over the defaults. A missing or
    /// unreadable file yields the defaults.
    pub fn load(&self) -> ExtractorConfig {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => ExtractorConfig::default(),
        }
    }

    pub fn save(&self, config: &ExtractorConfig) -> Result<(), ConfigError> {
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    /// Applies the fields present in `incoming` over the current config,
    /// persists and returns the result. Unknown keys are ignored.
    pub fn merge(&self, incoming: &Value) -> Result<ExtractorConfig, ConfigError> {
        let mut config = self.load();

        if let Some(url) = incoming.get("parsextract_url") {
            config.parsextract_url = serde_json::from_value(url.clone())?;
        }
        if let Some(key) = incoming.get("api_key") {
            config.api_key = serde_json::from_value(key.clone())?;
        }
        if let Some(prompt) = incoming.get("prompt") {
            config.prompt = serde_json::from_value(prompt.clone())?;
        }
        if let Some(extra) = incoming.get("extra_params") {
            config.extra_params = serde_json::from_value(extra.clone())?;
        }
        if let Some(stub) = incoming.get("stub") {
            config.stub = serde_json::from_value(stub.clone())?;
        }

        self.save(&config)?;
        Ok(config)
    }

    /// Loads the config with environment fallbacks filled in for fields the
    /// file leaves unset: PARSEXTRACT_URL, PARSEXTRACT_API_KEY,
    /// PARSEXTRACT_EXTRA_PARAMS (JSON) and PARSEXTRACT_STUB.
    pub fn resolved(&self) -> ExtractorConfig {
        let mut config = self.load();

        if config.parsextract_url.trim().is_empty() {
            if let Ok(url) = std::env::var("PARSEXTRACT_URL") {
                config.parsextract_url = url;
            }
        }
        if config.api_key.is_none() {
            config.api_key = std::env::var("PARSEXTRACT_API_KEY").ok();
        }
        if config.extra_params.is_empty() {
            if let Ok(raw) = std::env::var("PARSEXTRACT_EXTRA_PARAMS") {
                if let Ok(params) = serde_json::from_str(&raw) {
                    config.extra_params = params;
                }
            }
        }
        if !config.stub {
            config.stub = std::env::var("PARSEXTRACT_STUB")
                .map(|v| truthy(&v))
                .unwrap_or(false);
        }

        config
    }
}
