use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHANNELS_ENV: &str = "SFDCTRUST_CHANNELS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Read(String),
    #[error("parse config failed: {0}")]
    Parse(String),
    #[error("schema load failed: {0}")]
    SchemaLoad(String),
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: Server,
    #[serde(default)]
    pub trust: Trust,
    #[serde(default)]
    pub bot: Bot,
    #[serde(default)]
    pub announce: Announce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trust {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_status_site_url")]
    pub status_site_url: String,
    #[serde(default = "default_healthy_image_url")]
    pub healthy_image_url: String,
    /// Unset means the HTTP client's own defaults apply.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for Trust {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            status_site_url: default_status_site_url(),
            healthy_image_url: default_healthy_image_url(),
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    #[serde(default = "default_bot_name")]
    pub name: String,
}

impl Default for Bot {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
        }
    }
}

/// Channels meant for proactive incident announcements. Nothing polls for
/// incidents yet; the list is only surfaced through the contracts endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Announce {
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_api_base_url() -> String {
    "https://api.status.salesforce.com/v1".to_string()
}

fn default_status_site_url() -> String {
    "https://status.salesforce.com/status".to_string()
}

fn default_healthy_image_url() -> String {
    "https://status.salesforce.com/images/status-available.png".to_string()
}

fn default_bot_name() -> String {
    "trustbot".to_string()
}

pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config_text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&config_text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let instance = serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_against_schema(&instance)?;

    let cfg: Config =
        serde_json::from_value(instance).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let cfg = apply_env_overrides(cfg, |key| std::env::var(key).ok());
    validate_runtime_support(&cfg)?;
    Ok(cfg)
}

/// Applies environment overrides through `lookup` so callers can supply
/// something other than the process environment.
pub fn apply_env_overrides<F>(mut cfg: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(CHANNELS_ENV) {
        cfg.announce.channels = parse_channel_list(&raw);
    }
    cfg
}

pub fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_against_schema(instance: &serde_json::Value) -> Result<(), ConfigError> {
    let schema_path = [
        std::path::PathBuf::from("config/config.schema.json"),
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join("config/config.schema.json"),
    ]
    .into_iter()
    .find(|p| p.exists())
    .ok_or_else(|| {
        ConfigError::SchemaLoad(
            "config schema not found at config/config.schema.json or workspace config path"
                .to_string(),
        )
    })?;

    let schema_text =
        std::fs::read_to_string(schema_path).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    let schema: serde_json::Value =
        serde_json::from_str(&schema_text).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    if let Err(first) = validator.validate(instance) {
        return Err(ConfigError::SchemaValidation(first.to_string()));
    }
    Ok(())
}

fn validate_runtime_support(cfg: &Config) -> Result<(), ConfigError> {
    for (name, url) in [
        ("trust.api_base_url", &cfg.trust.api_base_url),
        ("trust.status_site_url", &cfg.trust.status_site_url),
        ("trust.healthy_image_url", &cfg.trust.healthy_image_url),
    ] {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ConfigError::UnsupportedConfig(format!(
                "{name}={url} is not supported; expected an http:// or https:// URL"
            )));
        }
    }
    if cfg.trust.timeout_ms == Some(0) {
        return Err(ConfigError::UnsupportedConfig(
            "trust.timeout_ms must be >= 1 when set".to_string(),
        ));
    }
    if cfg.bot.name.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "bot.name must not be blank".to_string(),
        ));
    }
    if cfg.announce.channels.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::UnsupportedConfig(
            "announce.channels must not contain blank names".to_string(),
        ));
    }
    Ok(())
}
