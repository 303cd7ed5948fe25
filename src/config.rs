//! Runtime configuration for the language-model provider and live databases.

use crate::error::{GeniusError, Result};
use crate::models::DbType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PROVIDER: &str = "SQL_GENIUS_AI_PROVIDER";
pub const ENV_MODEL: &str = "SQL_GENIUS_AI_MODEL";
pub const ENV_ENDPOINT: &str = "SQL_GENIUS_AI_ENDPOINT";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    #[default]
    Ollama,
    Groq,
}

impl AiProviderKind {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            AiProviderKind::Ollama => "http://localhost:11434",
            AiProviderKind::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProviderKind::Ollama => "llama3.2",
            AiProviderKind::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Local models get more time than the hosted API.
    pub fn timeout(&self) -> Duration {
        match self {
            AiProviderKind::Ollama => Duration::from_secs(120),
            AiProviderKind::Groq => Duration::from_secs(60),
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProviderKind::Ollama => f.write_str("ollama"),
            AiProviderKind::Groq => f.write_str("groq"),
        }
    }
}

impl FromStr for AiProviderKind {
    type Err = GeniusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(AiProviderKind::Ollama),
            "groq" => Ok(AiProviderKind::Groq),
            other => Err(GeniusError::Config(format!("unknown AI provider: {}", other))),
        }
    }
}

/// Language-model settings. Empty `model`/`endpoint` fall back to the
/// provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub provider: AiProviderKind,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
}

impl AiConfig {
    /// Read `SQL_GENIUS_AI_*` and `GROQ_API_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var(ENV_PROVIDER) {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => AiProviderKind::default(),
        };
        Ok(Self {
            provider,
            model: std::env::var(ENV_MODEL).unwrap_or_default(),
            endpoint: std::env::var(ENV_ENDPOINT).unwrap_or_default(),
            api_key: std::env::var(ENV_GROQ_API_KEY).unwrap_or_default(),
        })
    }

    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn endpoint(&self) -> &str {
        let endpoint = if self.endpoint.is_empty() {
            self.provider.default_endpoint()
        } else {
            &self.endpoint
        };
        endpoint.trim_end_matches('/')
    }

    /// Check provider-specific requirements.
    pub fn validate(&self) -> Result<()> {
        if self.provider == AiProviderKind::Groq && self.api_key.trim().is_empty() {
            return Err(GeniusError::Config(format!(
                "Groq requires an API key (set {} or pass --api-key)",
                ENV_GROQ_API_KEY
            )));
        }
        Ok(())
    }
}

/// Live database connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "type", alias = "db_type")]
    pub db_type: DbType,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub database: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl DbConfig {
    pub fn new(db_type: DbType, database: &str) -> Self {
        Self {
            db_type,
            host: default_host(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: database.to_string(),
        }
    }

    /// Explicit port, else the dialect's default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.db_type.default_port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.provider, AiProviderKind::Ollama);
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.endpoint(), "http://localhost:11434");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_groq_requires_api_key() {
        let config = AiConfig {
            provider: AiProviderKind::Groq,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GeniusError::Config(_))));
        assert_eq!(config.endpoint(), "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_db_config_default_port() {
        let mut config = DbConfig::new(DbType::PostgreSql, "shop");
        assert_eq!(config.port(), 5432);
        config.port = Some(6543);
        assert_eq!(config.port(), 6543);
    }

    #[test]
    fn test_db_config_from_json() {
        let config: DbConfig =
            serde_json::from_str(r#"{"type":"mysql","user":"root","database":"shop"}"#).unwrap();
        assert_eq!(config.db_type, DbType::MySql);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port(), 3306);
    }
}
