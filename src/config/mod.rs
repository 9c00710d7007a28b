//! Configuration Management
//!
//! Loads and validates the settings file before any model or database call.
//!
//! # Settings Location
//! - Explicit: `--config <path>`
//! - Default: `~/.config/tabletalk/config.json`
//!
//! # Secret Indirection
//! `api_key` and `connection.password` can instead be given as
//! `api_key_env` / `password_env`, naming an environment variable that
//! holds the secret. This keeps the settings file committable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabletalkError};

/// Validated application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Completion-service API key
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default)]
    pub api_key: String,

    /// Environment variable name for the API key (if not storing it directly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Model identifier passed to the completion service
    pub model: String,

    /// Database connection parameters
    pub connection: ConnectionSettings,
}

/// Database connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Hostname
    pub host: String,

    /// Port number
    pub port: u16,

    /// Database name
    pub database: String,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default)]
    pub password: String,

    /// Environment variable name for the password (if not storing it directly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl Settings {
    /// Parse settings from JSON, resolve secret indirection, and validate
    pub fn from_json(contents: &str) -> Result<Self> {
        let mut settings: Self = serde_json::from_str(contents)
            .map_err(|e| TabletalkError::config_error(format!("Invalid settings file: {e}")))?;

        settings.resolve_secrets()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fill `api_key` and `password` from their `*_env` indirections
    fn resolve_secrets(&mut self) -> Result<()> {
        if let Some(env_var) = &self.api_key_env {
            self.api_key = std::env::var(env_var).map_err(|_| {
                TabletalkError::config_error(format!(
                    "Environment variable {env_var} not found for api_key"
                ))
            })?;
        }

        if let Some(env_var) = &self.connection.password_env {
            self.connection.password = std::env::var(env_var).map_err(|_| {
                TabletalkError::config_error(format!(
                    "Environment variable {env_var} not found for password"
                ))
            })?;
        }

        Ok(())
    }

    /// Reject empty required fields before anything talks to the network
    fn validate(&self) -> Result<()> {
        fn require(value: &str, field: &str) -> Result<()> {
            if value.trim().is_empty() {
                return Err(TabletalkError::config_error(format!(
                    "Missing required setting '{field}'"
                )));
            }
            Ok(())
        }

        require(&self.api_key, "api_key")?;
        require(&self.model, "model")?;
        require(&self.connection.host, "connection.host")?;
        require(&self.connection.database, "connection.database")?;
        require(&self.connection.user, "connection.user")?;
        require(&self.connection.password, "connection.password")?;

        if self.connection.port == 0 {
            return Err(TabletalkError::config_error(
                "Setting 'connection.port' must be non-zero",
            ));
        }

        Ok(())
    }
}

/// Load settings from a file
pub fn load_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path).map_err(|e| {
        TabletalkError::config_error(format!(
            "Could not read settings file {}: {e}",
            path.display()
        ))
    })?;

    Settings::from_json(&contents)
}

/// Default settings path (`~/.config/tabletalk/config.json`)
pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| TabletalkError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("tabletalk").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        r#"{
            "api_key": "sk-test",
            "model": "gpt-4",
            "connection": {
                "host": "localhost",
                "port": 5432,
                "database": "imdb",
                "user": "imdb",
                "password": "1234"
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_minimal_settings() {
        let settings = Settings::from_json(&minimal_json()).unwrap();
        assert_eq!(settings.model, "gpt-4");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.connection.port, 5432);
        assert_eq!(settings.connection.database, "imdb");
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let contents = r#"{
            "api_key": "sk-test",
            "connection": {
                "host": "localhost", "port": 5432,
                "database": "imdb", "user": "imdb", "password": "1234"
            }
        }"#;

        let result = Settings::from_json(contents);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("Invalid settings file"));
    }

    #[test]
    fn test_empty_api_key_fails_validation() {
        let contents = minimal_json().replace("sk-test", "");
        let result = Settings::from_json(&contents);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("api_key"));
    }

    #[test]
    fn test_zero_port_fails_validation() {
        let contents = minimal_json().replace("5432", "0");
        let result = Settings::from_json(&contents);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("port"));
    }

    #[test]
    fn test_api_key_env_resolution() {
        std::env::set_var("TABLETALK_TEST_KEY", "sk-from-env");

        let contents = r#"{
            "api_key_env": "TABLETALK_TEST_KEY",
            "model": "gpt-4",
            "connection": {
                "host": "localhost", "port": 5432,
                "database": "imdb", "user": "imdb", "password": "1234"
            }
        }"#;

        let settings = Settings::from_json(contents).unwrap();
        assert_eq!(settings.api_key, "sk-from-env");
    }

    #[test]
    fn test_unset_password_env_is_an_error() {
        let contents = r#"{
            "api_key": "sk-test",
            "model": "gpt-4",
            "connection": {
                "host": "localhost", "port": 5432,
                "database": "imdb", "user": "imdb",
                "password_env": "TABLETALK_TEST_UNSET_PASSWORD"
            }
        }"#;

        let result = Settings::from_json(contents);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .message()
            .contains("TABLETALK_TEST_UNSET_PASSWORD"));
    }
}
