//! Editor configuration, read from `config.toml`.
//!
//! ## Learning: Partial Files With `#[serde(default)]`
//!
//! Every section carries `#[serde(default)]`, so a file only names what it
//! changes: an empty file is a valid config, and a file written by an
//! older version still loads after new fields are added.
//!
//! The `[options]` table is free-form: feature plugins read their own
//! entries through [`Config::option`], which deserializes on demand.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Main editor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine behavior settings
    pub editor: EditorConfig,

    /// Which plugins to activate
    pub plugins: PluginsConfig,

    /// Keyboard settings
    pub keyboard: KeyboardConfig,

    /// Plugin-specific options (read-only for plugins)
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Config {
    /// Loads config from the default location.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to the default configuration");
            Self::default()
        })
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("vellum").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reads one entry of the `[options]` table.
    ///
    /// Returns `None` when the option is absent or has the wrong shape.
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.options.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(option = key, %err, "ignoring malformed option");
                None
            }
        }
    }

    /// Sets one entry of the `[options]` table.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Serialize) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.options.insert(key.into(), value);
            }
            Err(err) => tracing::warn!(%err, "option value is not serializable"),
        }
    }
}

/// Engine behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history limit (0 = unbounded)
    pub history_limit: usize,

    /// Run the normalization pipeline over freshly loaded content
    pub normalize_on_load: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            normalize_on_load: true,
        }
    }
}

/// Plugin selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Named preset used when `enabled` is empty
    pub preset: String,

    /// Explicit plugin list, in activation preference order
    pub enabled: Vec<String>,

    /// Plugins removed from the preset or list
    pub disabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            preset: "default".to_string(),
            enabled: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

/// Keyboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Honor plugin-contributed shortcuts
    pub shortcuts: bool,

    /// Custom key bindings (hotkey to command id)
    pub bindings: HashMap<String, String>,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            shortcuts: true,
            bindings: HashMap::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor.history_limit, 1000);
        assert_eq!(config.plugins.preset, "default");
        assert!(config.keyboard.shortcuts);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.editor.history_limit = 50;
        config.set_option("placeholder", "Type here");
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.editor.history_limit, 50);
        assert_eq!(parsed.option::<String>("placeholder").as_deref(), Some("Type here"));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [plugins]
            enabled = ["align", "emoji"]

            [keyboard.bindings]
            "ctrl+e" = "align_center"

            [options]
            font_families = ["Arial", "Georgia"]
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.plugins.enabled, vec!["align", "emoji"]);
        assert_eq!(config.editor.history_limit, 1000);
        assert_eq!(
            config.keyboard.bindings.get("ctrl+e").map(String::as_str),
            Some("align_center")
        );
        assert_eq!(
            config.option::<Vec<String>>("font_families"),
            Some(vec!["Arial".to_string(), "Georgia".to_string()])
        );
        assert_eq!(config.option::<u32>("font_families"), None);
    }

    #[test]
    fn test_save_to_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::default().save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.plugins.preset, "default");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[editor\nhistory_limit = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
