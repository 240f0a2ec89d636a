use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tool paths and defaults, loaded from the config file and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// FFmpeg binary to invoke.
    pub ffmpeg_path: String,
    /// Whisper CLI binary to invoke.
    pub whisper_path: String,
    /// Model used when the CLI does not name one.
    pub default_model: String,
    /// Comma-separated language codes used when the CLI does not name any.
    pub default_langs: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            whisper_path: "whisper".to_string(),
            default_model: "base".to_string(),
            default_langs: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: built-in defaults, overridden by the config file
    /// if present, overridden by environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        if let Ok(path) = std::env::var("SUBMUX_FFMPEG") {
            config.ffmpeg_path = path;
        }
        if let Ok(path) = std::env::var("SUBMUX_WHISPER") {
            config.whisper_path = path;
        }

        Ok(config)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("submux").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.whisper_path, "whisper");
        assert_eq!(config.default_model, "base");
        assert_eq!(config.default_langs, "en");
    }

    #[test]
    fn test_partial_file_config_keeps_defaults() {
        let config: Config = toml::from_str("whisper_path = \"/opt/whisper/bin/whisper\"").unwrap();
        assert_eq!(config.whisper_path, "/opt/whisper/bin/whisper");
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.default_model, "base");
    }
}
