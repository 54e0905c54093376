//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Declarative defaults for new compositors.
    #[serde(default)]
    pub teaser: TeaserDefaults,

    /// Credentials attached to upload requests.
    #[serde(default)]
    pub upload: UploadConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default compositor settings, in their textual (attribute) form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeaserDefaults {
    /// Grid shape, e.g. "2,2" or "3x2".
    pub dimensions: String,

    /// Output format key (jpg, jpeg, png, webp).
    pub output_format: String,

    /// Output quality in [0, 1].
    pub output_quality: String,

    /// Surface width in pixels.
    pub width: u32,

    /// Surface height in pixels.
    pub height: u32,

    /// Background / placeholder colour as RGBA.
    pub background: [u8; 4],
}

/// HTTP settings for uploads and remote sources. Credentials are sent
/// with every PUT when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Value for the `Authorization` header.
    pub authorization: Option<String>,

    /// Value for the `Cookie` header.
    pub cookie: Option<String>,

    /// Limit for a whole request, connect through last body byte.
    pub timeout_secs: u64,

    /// Largest response body accepted from a remote source.
    pub max_body_bytes: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "teaser=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for TeaserDefaults {
    fn default() -> Self {
        Self {
            dimensions: "2,2".to_string(),
            output_format: "jpeg".to_string(),
            output_quality: "1.0".to_string(),
            width: 800,
            height: 600,
            background: [0, 0, 0, 255],
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            authorization: None,
            cookie: None,
            timeout_secs: 30,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse a config document. Missing sections take their defaults.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("teaser").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_attribute_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.teaser.dimensions, "2,2");
        assert_eq!(config.teaser.output_format, "jpeg");
        assert_eq!(config.teaser.output_quality, "1.0");
        assert!(config.upload.authorization.is_none());
        assert_eq!(config.upload.timeout_secs, 30);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config =
            AppConfig::from_json(r#"{ "teaser": { "dimensions": "3x1" }, "upload": { "cookie": "sid=1" } }"#)
                .unwrap();
        assert_eq!(config.teaser.dimensions, "3x1");
        assert_eq!(config.teaser.output_format, "jpeg");
        assert_eq!(config.teaser.width, 800);
        assert_eq!(config.upload.cookie.as_deref(), Some("sid=1"));
        assert_eq!(config.upload.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }
}
