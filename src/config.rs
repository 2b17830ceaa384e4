//! # Configuration Management
//!
//! Loads application configuration from layered sources:
//! - built-in defaults,
//! - an optional `config.toml`,
//! - environment variables with the `APP_` prefix (plus bare `HOST`/`PORT`
//!   overrides used by deployment platforms).
//!
//! API credentials deliberately do not pass through this layering: they are
//! read exactly once from their conventional environment variable names
//! (`OPENAI_API_KEY`, `LOCAL_API_KEY`) during startup and are immutable for
//! the lifetime of the process.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Default model selections for the two transcription backends.
///
/// `default_local_model` is a Whisper size variant (tiny/base/small/medium/
/// large); it is also what the compatibility endpoint substitutes when a
/// client asks for the placeholder name "whisper-1".
///
/// `default_cloud_model` is the OpenAI model name pre-selected on the form;
/// it can be changed at runtime through the form's settings action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub default_local_model: String,
    pub default_cloud_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            models: ModelsConfig {
                // "base" is a good compromise between accuracy and speed.
                default_local_model: "base".to_string(),
                default_cloud_model: "whisper-1".to_string(),
            },
            limits: LimitsConfig {
                max_upload_bytes: 50 * 1024 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration in priority order: defaults, then `config.toml`,
    /// then `APP_*` environment variables, then bare `HOST`/`PORT`.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.models.default_local_model.parse::<crate::transcription::ModelSize>().is_err() {
            return Err(anyhow::anyhow!(
                "Unknown local model variant: {}",
                self.models.default_local_model
            ));
        }

        Ok(())
    }
}

/// Shared secrets read from the environment at startup.
///
/// `openai_api_key` gates *outbound* use of the cloud backend: when absent
/// the cloud backend is never constructed. `local_api_key` gates *inbound*
/// use of the compatibility endpoint: when absent that endpoint is open.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub local_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            local_api_key: non_empty_env("LOCAL_API_KEY"),
        }
    }

    pub fn cloud_available(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.models.default_local_model, "base");
        assert_eq!(config.models.default_cloud_model, "whisper-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.models.default_local_model = "gigantic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_absent_by_default() {
        let creds = Credentials::default();
        assert!(!creds.cloud_available());
        assert!(creds.local_api_key.is_none());
    }
}
