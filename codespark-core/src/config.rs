//! # Configuration management for CodeSpark
//!
//! Configuration is stored as TOML in the platform's config directory
//! (`~/.config/codespark/config.toml` on Linux). Every section has sensible
//! defaults, so a partial file is accepted and missing keys fall back to
//! [`Default`].
//!
//! # Example
//!
//! ```rust
//! use codespark_core::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.editor.default_language, "javascript");
//! assert_eq!(config.ai.context_files, 5);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure for CodeSpark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process-wide settings
    pub app: AppConfig,
    /// Buffer and merge settings
    pub editor: EditorConfig,
    /// AI request settings
    pub ai: AiConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Directory for project files and session state; `None` uses the platform data dir
    pub data_directory: Option<PathBuf>,
    /// Entries kept in the recently selected projects list
    pub max_recent_projects: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_directory: None,
            max_recent_projects: 10,
        }
    }
}

/// Settings for editor buffers and AI merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Text inserted between a file's content and generated code
    pub generation_separator: String,
    /// Flush the target buffer right after merging generated code
    pub flush_after_generation: bool,
    /// Language of new projects and of generation with no target file
    pub default_language: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            generation_separator: "\n\n".to_string(),
            flush_after_generation: true,
            default_language: "javascript".to_string(),
        }
    }
}

/// Settings for requests sent to the AI backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Other project files included in chat context
    pub context_files: usize,
    /// Characters of each context file included in chat context
    pub context_chars: usize,
    /// Sessions returned by history queries
    pub history_limit: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            context_files: 5,
            context_chars: 500,
            history_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    ///
    /// A missing or unreadable file yields [`Config::default`], which is then
    /// written back on a best-effort basis.
    pub fn load_or_default() -> Result<Self> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                let config = Self::default();
                if let Err(e) = config.save() {
                    tracing::warn!("Could not write default configuration: {}", e);
                }
                Ok(config)
            }
        }
    }

    /// Load configuration from the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use codespark_core::Config;
    ///
    /// let config = Config::load()?;
    /// # Ok::<(), codespark_core::Error>(())
    /// ```
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to_file(&config_path)
    }

    /// Save configuration to a specific file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the file cannot be
    /// written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.ai.history_limit = 0;
    /// assert!(config.validate().unwrap_err().is_validation());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.app.log_level.as_str()) {
            return Err(Error::validation(
                "app.log_level",
                "Log level must be one of: error, warn, info, debug, trace",
            ));
        }

        if self.app.max_recent_projects > 50 {
            return Err(Error::validation(
                "app.max_recent_projects",
                "Maximum recent projects cannot exceed 50",
            ));
        }

        if self.editor.default_language.trim().is_empty() {
            return Err(Error::validation(
                "editor.default_language",
                "Default language cannot be empty",
            ));
        }

        if self.ai.context_files > 50 {
            return Err(Error::validation(
                "ai.context_files",
                "At most 50 context files can be sent",
            ));
        }

        if self.ai.context_chars == 0 {
            return Err(Error::validation(
                "ai.context_chars",
                "Context excerpt length must be positive",
            ));
        }

        if self.ai.history_limit == 0 {
            return Err(Error::validation(
                "ai.history_limit",
                "History limit must be positive",
            ));
        }

        Ok(())
    }

    /// Directory where project files live when none is configured.
    pub fn data_directory(&self) -> Result<PathBuf> {
        match &self.app.data_directory {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("codespark"))
                .ok_or_else(|| Error::config("Could not determine data directory")),
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("codespark"))
            .ok_or_else(|| Error::config("Could not determine config directory"))
    }

    /// Reset configuration to defaults.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.editor.generation_separator, "\n\n");
        assert!(config.editor.flush_after_generation);
        assert_eq!(config.ai.context_chars, 500);
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = Config::default();
        config.app.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.ai.context_chars = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.editor.default_language = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[ai]\ncontext_files = 2\n").unwrap();
        assert_eq!(config.ai.context_files, 2);
        assert_eq!(config.ai.history_limit, 50);
        assert_eq!(config.editor, EditorConfig::default());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.editor.flush_after_generation = false;
        config.app.data_directory = Some(temp_dir.path().join("projects"));

        config.save_to_file(&config_path).unwrap();
        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.data_directory().unwrap(), temp_dir.path().join("projects"));
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut config = Config::default();
        config.ai.history_limit = 3;
        config.reset_to_defaults();
        assert_eq!(config, Config::default());
    }
}
