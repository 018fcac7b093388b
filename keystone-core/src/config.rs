// Dispatcher configuration

use crate::logging::{LogConfig, LogFormat, LogLevel};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Prefix of the environment variables read by [`DispatcherConfig::with_env`].
pub const ENV_PREFIX: &str = "KEYSTONE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Settings a dispatcher can be built from.
///
/// ```toml
/// base_path = "/api"
/// default_produces = ["application/json"]
///
/// [logging]
/// level = "debug"
/// format = "compact"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Path every handled request starts with
    pub base_path: String,
    /// Consumed media types for operations and resources declaring none
    pub default_consumes: Option<Vec<String>>,
    /// Produced media types for operations and resources declaring none
    pub default_produces: Option<Vec<String>>,
    pub logging: LogConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            default_consumes: None,
            default_produces: None,
            logging: LogConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        let content = fs::read_to_string(path)?;
        match format {
            FileFormat::Json => Self::from_json_str(&content),
            FileFormat::Toml => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
    }

    /// Overlay `KEYSTONE_*` environment variables.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(ENV_PREFIX, env::vars())
    }

    /// Overlay `<PREFIX>_*` variables from an explicit source.
    ///
    /// Recognised keys: `BASE_PATH`, `DEFAULT_CONSUMES`, `DEFAULT_PRODUCES`
    /// (comma separated), `LOG_LEVEL`, `LOG_FORMAT` and `LOG_FILTER`.
    pub fn with_vars<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = format!("{}_", prefix.trim_end_matches('_'));

        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(&prefix) else {
                continue;
            };
            let value = value.as_ref().trim();

            match key {
                "BASE_PATH" => self.base_path = value.to_string(),
                "DEFAULT_CONSUMES" => self.default_consumes = Some(split_list(value)),
                "DEFAULT_PRODUCES" => self.default_produces = Some(split_list(value)),
                "LOG_LEVEL" => {
                    self.logging.level = LogLevel::from_str(value).ok_or_else(|| {
                        ConfigError::ParseError(format!("invalid log level '{}'", value))
                    })?;
                }
                "LOG_FORMAT" => {
                    self.logging.format = LogFormat::from_str(value).ok_or_else(|| {
                        ConfigError::ParseError(format!("invalid log format '{}'", value))
                    })?;
                }
                "LOG_FILTER" => self.logging.env_filter = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(self)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.base_path, "/");
        assert!(config.default_consumes.is_none());
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_from_toml() {
        let config = DispatcherConfig::from_toml_str(
            r#"
            base_path = "/api"
            default_produces = ["application/json"]

            [logging]
            level = "debug"
            format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_path, "/api");
        assert_eq!(config.default_produces, Some(vec!["application/json".to_string()]));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_from_json() {
        let config =
            DispatcherConfig::from_json_str(r#"{"default_consumes": ["application/xml"]}"#).unwrap();
        assert_eq!(config.base_path, "/");
        assert_eq!(config.default_consumes, Some(vec!["application/xml".to_string()]));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DispatcherConfig::from_toml_str("base_path = "),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("keystone-config-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "base_path = \"/svc\"").unwrap();

        let config = DispatcherConfig::from_file(&path).unwrap();
        assert_eq!(config.base_path, "/svc");
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            DispatcherConfig::from_file("settings.yaml"),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_env_overlay() {
        let vars = [
            ("KEYSTONE_BASE_PATH", "/v2"),
            ("KEYSTONE_DEFAULT_PRODUCES", "application/json, application/xml"),
            ("KEYSTONE_LOG_LEVEL", "trace"),
            ("OTHER_BASE_PATH", "/ignored"),
        ];
        let config = DispatcherConfig::default().with_vars("KEYSTONE", vars).unwrap();

        assert_eq!(config.base_path, "/v2");
        assert_eq!(
            config.default_produces,
            Some(vec!["application/json".to_string(), "application/xml".to_string()])
        );
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_env_overlay_rejects_bad_level() {
        let result = DispatcherConfig::default().with_vars("KEYSTONE", [("KEYSTONE_LOG_LEVEL", "loud")]);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
