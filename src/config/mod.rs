//! Configuration loading for the blueprint client.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `AREA_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Application configuration derived from `AREA_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// First counter value handed out to freshly dropped nodes.
    #[serde(default = "default_node_id_seed")]
    pub node_id_seed: u64,
    #[serde(default = "default_gmail_topic_name")]
    pub gmail_topic_name: String,
    #[serde(default)]
    pub github_webhook_url: String,
    #[serde(default = "default_microsoft_resource")]
    pub microsoft_resource: String,
    #[serde(default = "default_microsoft_change_type")]
    pub microsoft_change_type: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_base_url: default_api_base_url(),
            api_token: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            request_timeout_ms: default_request_timeout_ms(),
            node_id_seed: default_node_id_seed(),
            gmail_topic_name: default_gmail_topic_name(),
            github_webhook_url: String::new(),
            microsoft_resource: default_microsoft_resource(),
            microsoft_change_type: default_microsoft_change_type(),
        }
    }
}

impl AppConfig {
    /// Returns the configured backend base URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.api_base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.api_token.is_some() {
            config.api_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.base_url() {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::UnsupportedScheme {
                    scheme: url.scheme().to_string(),
                });
            }
            Err(source) => {
                return Err(ConfigError::InvalidBaseUrl {
                    value: self.api_base_url.clone(),
                    source,
                });
            }
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidRequestTimeout {
                value: self.request_timeout_ms,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        // Outside local/test the backend always sits behind bearer auth
        if !matches!(self.profile.as_str(), "local" | "test") && self.api_token.is_none() {
            return Err(ConfigError::MissingApiToken);
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_node_id_seed() -> u64 {
    1000
}

fn default_gmail_topic_name() -> String {
    "projects/area/topics/area".to_string()
}

fn default_microsoft_resource() -> String {
    "me/messages".to_string()
}

fn default_microsoft_change_type() -> String {
    "created".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api base url '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("api base url must use http or https, got '{scheme}'")]
    UnsupportedScheme { scheme: String },
    #[error("request timeout must be positive, got {value}")]
    InvalidRequestTimeout { value: u64 },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("api token is missing; set AREA_API_TOKEN environment variable")]
    MissingApiToken,
}

/// Loads configuration using layered `.env` files and `AREA_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("AREA_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let non_empty = |layered: &mut BTreeMap<String, String>, key: &str| {
            layered
                .remove(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let profile = non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_base_url =
            non_empty(&mut layered, "API_BASE_URL").unwrap_or_else(default_api_base_url);
        let api_token = non_empty(&mut layered, "API_TOKEN");
        let log_level = non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let request_timeout_ms = non_empty(&mut layered, "REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_request_timeout_ms);
        let node_id_seed = non_empty(&mut layered, "NODE_ID_SEED")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_node_id_seed);
        let gmail_topic_name =
            non_empty(&mut layered, "GMAIL_TOPIC_NAME").unwrap_or_else(default_gmail_topic_name);
        let github_webhook_url = non_empty(&mut layered, "GITHUB_WEBHOOK_URL").unwrap_or_default();
        let microsoft_resource = non_empty(&mut layered, "MICROSOFT_RESOURCE")
            .unwrap_or_else(default_microsoft_resource);
        let microsoft_change_type = non_empty(&mut layered, "MICROSOFT_CHANGE_TYPE")
            .unwrap_or_else(default_microsoft_change_type);

        let config = AppConfig {
            profile,
            api_base_url,
            api_token,
            log_level,
            log_format,
            request_timeout_ms,
            node_id_seed,
            gmail_topic_name,
            github_webhook_url,
            microsoft_resource,
            microsoft_change_type,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("AREA_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("AREA_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn redacts_api_token() {
        let config = AppConfig {
            api_token: Some("super-secret".to_string()),
            ..AppConfig::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let config = AppConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn production_profile_requires_token() {
        let config = AppConfig {
            profile: "production".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiToken)));

        let config = AppConfig {
            profile: "production".to_string(),
            api_token: Some("token".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let config = AppConfig {
            log_format: "xml".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
    }
}
