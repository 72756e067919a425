//! Application configuration

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Name reported by the status endpoint
    pub app_name: String,

    /// Address the HTTP surface binds to
    pub bind_addr: String,

    /// Path of the sqlite database file
    pub database_path: PathBuf,

    /// OpenAI-compatible base URL of the local Ollama endpoint
    pub ollama_base_url: String,

    /// API key for the hosted OpenAI provider
    pub openai_api_key: Option<String>,

    /// API key for the OpenRouter aggregator
    pub openrouter_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "parlor".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            database_path: PathBuf::from("./data/parlor.db"),
            ollama_base_url: "http://localhost:11434/v1".to_string(),
            openai_api_key: None,
            openrouter_api_key: None,
        }
    }
}

impl Config {
    /// Build configuration from defaults and environment variables.
    pub fn init() -> Result<Self> {
        debug!("initializing configuration");

        let mut config = Self::default();
        config.load_from_env();
        config.validate()?;

        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(config)
    }

    pub fn load_from_env(&mut self) {
        if let Ok(app_name) = std::env::var("PARLOR_APP_NAME") {
            self.app_name = app_name;
        }

        if let Ok(bind_addr) = std::env::var("PARLOR_BIND") {
            self.bind_addr = bind_addr;
        }

        if let Ok(database_path) = std::env::var("PARLOR_DATABASE") {
            self.database_path = PathBuf::from(database_path);
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.ollama_base_url = url;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            self.openrouter_api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ollama_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("ollama_base_url must not be empty"));
        }

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "invalid bind address: {}",
                self.bind_addr
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().expect("defaults should be valid");
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let config = Config {
            bind_addr: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
