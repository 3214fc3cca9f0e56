//! Configuration for Drawsy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body, in megabytes
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Model settings
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Gemini API key. Usually supplied through `GEMINI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model name passed to `generateContent`
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            body_limit_mb: default_body_limit_mb(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            name: default_model_name(),
            api_base: default_api_base(),
        }
    }
}

impl ModelConfig {
    /// The model credential. Its absence is fatal for anything that talks to the model
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))
    }
}

impl Config {
    /// Load config from an explicit file, the default file if present, or
    /// defaults, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Default config location: `<config_dir>/drawsy/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("drawsy").join("config.toml"))
    }

    /// Override fields from environment variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {port}")))?;
        }

        if let Some(key) = lookup("GEMINI_API_KEY") {
            let key = key.trim();
            if !key.is_empty() {
                self.model.api_key = Some(key.to_string());
            }
        }

        if let Some(name) = lookup("GEMINI_MODEL") {
            self.model.name = name.trim().to_string();
        }

        if let Some(base) = lookup("GEMINI_API_BASE") {
            self.model.api_base = base.trim().trim_end_matches('/').to_string();
        }

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(limit) = lookup("BODY_LIMIT_MB") {
            let mb: usize = limit.trim().parse().map_err(|_| {
                Error::Config(format!("BODY_LIMIT_MB is not a number: {limit}"))
            })?;
            if mb.checked_mul(BYTES_PER_MB).is_none() {
                return Err(Error::Config(format!("BODY_LIMIT_MB is too large: {limit}")));
            }
            self.body_limit_mb = mb;
        }

        Ok(())
    }

    /// Request body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(BYTES_PER_MB)
    }
}

// Default value functions

fn default_port() -> u16 {
    3000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "https://drawsy-1.onrender.com".to_string(),
    ]
}

fn default_body_limit_mb() -> usize {
    50
}

fn default_model_name() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
