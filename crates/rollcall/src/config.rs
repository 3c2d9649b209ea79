//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::DecodeErrorPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default record book file name.
const DATA_FILE_NAME: &str = "students.json";

/// Default daemon socket file name.
const SOCKET_FILE_NAME: &str = "rollcall.sock";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Server configuration.
    pub server: ServerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the record book file.
    /// Defaults to `~/.local/share/rollcall/students.json`
    pub data_path: Option<PathBuf>,
    /// What to do when the record book cannot be decoded.
    pub on_decode_error: DecodeErrorSetting,
}

/// Server-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path to the Unix socket the daemon listens on.
    /// Defaults to `~/.local/share/rollcall/rollcall.sock`
    pub socket_path: Option<PathBuf>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Configurable decode-error policy, as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorSetting {
    /// Read a corrupt record book as an empty collection.
    #[default]
    DegradeToEmpty,
    /// Fail loudly when the record book cannot be decoded.
    Surface,
}

impl From<DecodeErrorSetting> for DecodeErrorPolicy {
    fn from(setting: DecodeErrorSetting) -> Self {
        match setting {
            DecodeErrorSetting::DegradeToEmpty => Self::DegradeToEmpty,
            DecodeErrorSetting::Surface => Self::Surface,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: None, // Will be resolved to default at runtime
            on_decode_error: DecodeErrorSetting::DegradeToEmpty,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            request_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ROLLCALL_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the record book path, resolving defaults if not set.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.storage
            .data_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATA_FILE_NAME))
    }

    /// Get the socket path, resolving defaults if not set.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.server
            .socket_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SOCKET_FILE_NAME))
    }

    /// Get the decode-error policy for the record store.
    #[must_use]
    pub fn decode_policy(&self) -> DecodeErrorPolicy {
        self.storage.on_decode_error.into()
    }

    /// Get the per-request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Tests that set ROLLCALL_ env vars (or assert pure defaults) must not
    // interleave, since the environment is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    struct TestDir(PathBuf);

    impl TestDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "rollcall_config_{name}_{}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn write_config(&self, contents: &str) -> PathBuf {
            let path = self.0.join("config.toml");
            std::fs::write(&path, contents).unwrap();
            path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.data_path.is_none());
        assert!(config.server.socket_path.is_none());
        assert_eq!(
            config.storage.on_decode_error,
            DecodeErrorSetting::DegradeToEmpty
        );
        assert_eq!(config.server.request_timeout_ms, 5000);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_request_timeout() {
        let mut config = Config::default();
        config.server.request_timeout_ms = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("request_timeout_ms"));
    }

    #[test]
    fn test_data_path_default() {
        let config = Config::default();
        let path = config.data_path();

        assert!(path.to_string_lossy().contains("students.json"));
        assert!(path.to_string_lossy().contains("rollcall"));
    }

    #[test]
    fn test_data_path_custom() {
        let mut config = Config::default();
        config.storage.data_path = Some(PathBuf::from("/custom/path/data.json"));

        assert_eq!(config.data_path(), PathBuf::from("/custom/path/data.json"));
    }

    #[test]
    fn test_socket_path_default() {
        let config = Config::default();
        let path = config.socket_path();

        assert!(path.to_string_lossy().contains("rollcall.sock"));
    }

    #[test]
    fn test_decode_policy_mapping() {
        let mut config = Config::default();
        assert_eq!(config.decode_policy(), DecodeErrorPolicy::DegradeToEmpty);

        config.storage.on_decode_error = DecodeErrorSetting::Surface;
        assert_eq!(config.decode_policy(), DecodeErrorPolicy::Surface);
    }

    #[test]
    fn test_request_timeout() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("rollcall"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let _guard = env_guard();

        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_toml_file_sections() {
        let _guard = env_guard();
        let dir = TestDir::new("toml");

        let path = dir.write_config(
            r#"
            [storage]
            data_path = "/srv/rollcall/students.json"
            on_decode_error = "surface"

            [server]
            request_timeout_ms = 250
            "#,
        );

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(
            config.storage.data_path,
            Some(PathBuf::from("/srv/rollcall/students.json"))
        );
        assert_eq!(config.storage.on_decode_error, DecodeErrorSetting::Surface);
        assert_eq!(config.server.request_timeout_ms, 250);
        // Unset keys still come from defaults.
        assert!(config.server.socket_path.is_none());
    }

    #[test]
    fn test_load_partial_toml_keeps_defaults() {
        let _guard = env_guard();
        let dir = TestDir::new("partial");

        let path = dir.write_config("[server]\nrequest_timeout_ms = 250\n");

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.request_timeout_ms, 250);
        assert_eq!(
            config.storage.on_decode_error,
            DecodeErrorSetting::DegradeToEmpty
        );
    }

    #[test]
    fn test_env_overrides_toml_file() {
        let _guard = env_guard();
        let dir = TestDir::new("env");

        let path = dir.write_config("[server]\nrequest_timeout_ms = 250\n");

        std::env::set_var("ROLLCALL_SERVER__REQUEST_TIMEOUT_MS", "750");
        let result = Config::load_from(Some(path));
        std::env::remove_var("ROLLCALL_SERVER__REQUEST_TIMEOUT_MS");

        let config = result.unwrap();
        assert_eq!(config.server.request_timeout_ms, 750);
    }

    #[test]
    fn test_invalid_toml_value_surfaces_config_error() {
        let _guard = env_guard();
        let dir = TestDir::new("invalid");

        let path = dir.write_config("[server]\nrequest_timeout_ms = \"soon\"\n");

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_decode_error_setting_deserialize() {
        let setting: DecodeErrorSetting = serde_json::from_str("\"surface\"").unwrap();
        assert_eq!(setting, DecodeErrorSetting::Surface);

        let setting: DecodeErrorSetting = serde_json::from_str("\"degrade_to_empty\"").unwrap();
        assert_eq!(setting, DecodeErrorSetting::DegradeToEmpty);
    }

    #[test]
    fn test_storage_config_serialize() {
        let storage = StorageConfig::default();
        let json = serde_json::to_string(&storage).unwrap();
        assert!(json.contains("on_decode_error"));
    }

    #[test]
    fn test_server_config_serialize() {
        let server = ServerConfig::default();
        let json = serde_json::to_string(&server).unwrap();
        assert!(json.contains("request_timeout_ms"));
    }

    #[test]
    fn test_server_config_deserialize() {
        let json = r#"{"request_timeout_ms": 250}"#;
        let server: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.request_timeout_ms, 250);
        assert!(server.socket_path.is_none());
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
