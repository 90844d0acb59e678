//! Configuration management
//!
//! Credentials come from the environment; everything else from an optional
//! YAML settings file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::domain::entities::{Action, Listener};

pub const ROOM_ID_VAR: &str = "HUBOT_GROUPME_ROOM_ID";
pub const BOT_ID_VAR: &str = "HUBOT_GROUPME_BOT_ID";
pub const TOKEN_VAR: &str = "HUBOT_GROUPME_TOKEN";

/// Prefix the short variable names (`GROUPME_ROOM_ID`, ...) lack
const HUBOT_PREFIX: &str = "HUBOT_";

pub const DEFAULT_API_BASE: &str = "https://api.groupme.com";

/// Required GroupMe credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub room_id: String,
    pub bot_id: String,
    pub token: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Each variable may also be given
    /// without its `HUBOT_` prefix. Empty values count as missing, and the
    /// error names every missing variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut read = |key: &str| match present(key).or_else(|| {
            key.strip_prefix(HUBOT_PREFIX).and_then(|short| present(short))
        }) {
            Some(value) => value,
            None => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let room_id = read(ROOM_ID_VAR);
        let bot_id = read(BOT_ID_VAR);
        let token = read(TOKEN_VAR);

        if !missing.is_empty() {
            return Err(ConfigError::MissingField(missing));
        }

        tracing::debug!("GroupMe token length: {} characters", token.len());
        Ok(Self {
            room_id,
            bot_id,
            token,
        })
    }
}

/// Settings file contents
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub api_base: String,
    pub poll_interval_secs: u64,
    pub brain: BrainConfig,
    pub responders: Vec<ResponderConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrainBackend {
    Memory,
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrainConfig {
    pub backend: BrainBackend,
    pub path: PathBuf,
}

/// A canned response triggered by a pattern
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResponderConfig {
    pub name: String,
    pub pattern: String,
    pub text: String,
    /// Posted as an image attachment when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ResponderConfig {
    fn reply(name: &str, pattern: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            text: text.to_string(),
            image_url: None,
        }
    }

    fn image(name: &str, pattern: &str, text: &str, url: &str) -> Self {
        Self {
            image_url: Some(url.to_string()),
            ..Self::reply(name, pattern, text)
        }
    }

    /// Listener for this responder; the pattern is a case-insensitive regex
    pub fn to_listener(&self) -> Result<Listener, ConfigError> {
        let (action, description) = match &self.image_url {
            Some(url) => (
                Action::Image {
                    text: self.text.clone(),
                    url: url.clone(),
                },
                format!("Post \"{}\" with an image", self.text),
            ),
            None => (Action::Reply(self.text.clone()), format!("Reply \"{}\"", self.text)),
        };
        Listener::new(&self.name, &self.pattern, action)
            .map(|listener| listener.with_description(description))
            .map_err(|e| ConfigError::InvalidValue(format!("responder {}: {}", self.name, e)))
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            backend: BrainBackend::Json,
            path: PathBuf::from("allbot-brain.json"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval_secs: 2,
            brain: BrainConfig::default(),
            responders: default_responders(),
        }
    }
}

fn default_responders() -> Vec<ResponderConfig> {
    vec![
        ResponderConfig::image(
            "puppies",
            "gentle puppies",
            "PUPPIES!!!!",
            "https://i.groupme.com/360x265.gif.c6efe48e69d0485fbc3da95538f12f77.large",
        ),
        ResponderConfig::image(
            "bobby",
            "hey bobby",
            "Bobby Loves You",
            "https://i.groupme.com/360x640.gif.fe1835f6219645ce9f47fd443d2dcd06.large",
        ),
        ResponderConfig::image(
            "louise",
            "hey louise",
            "Louise Loves You",
            "https://i.groupme.com/720x1280.jpeg.9284728bcd8f4d298aee19c863ad842b.large",
        ),
        ResponderConfig::image(
            "winston",
            "hey winston",
            "Winston Loves You",
            "https://i.groupme.com/1536x2048.jpeg.a739d3a617d44c8d8719722ce699110e.large",
        ),
        ResponderConfig::reply(
            "fyruss",
            "fuck you russ",
            "Russ is a fine fellow. Do not use his name in vain.",
        ),
        ResponderConfig::reply(
            "dorkdrive",
            "!dorkdrive",
            "Dork Drive: https://drive.google.com/drive/folders/11l-ZTZ0is9L6yNUyEB623TA8oEYMNupd",
        ),
    ]
}

impl Settings {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the settings file, falling back to defaults when it is absent or broken
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            tracing::info!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings: {}, using defaults", e);
            Self::default()
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("poll-interval-secs must be at least 1".to_string()));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue(format!("api-base is not an http(s) URL: {}", self.api_base)));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
