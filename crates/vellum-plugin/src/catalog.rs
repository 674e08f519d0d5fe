//! Known plugins and presets.
//!
//! The catalog maps the names used in `[plugins]` configuration to
//! descriptors. Order matters only as a preference: the resolver still puts
//! every dependency first.

use vellum_core::config::PluginsConfig;
use vellum_core::{HistoryPlugin, PluginDescriptor, SelectionPlugin};

use crate::{
    AlignPlugin, EmojiPlugin, FontFamilyPlugin, HintPlugin, MarkerPlugin, PowerboxPlugin,
    ReplacePlugin, ToolbarPlugin,
};

/// Catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

type Factory = fn() -> PluginDescriptor;

const PLUGINS: &[(&str, Factory)] = &[
    (SelectionPlugin::ID, SelectionPlugin::descriptor),
    (HistoryPlugin::ID, HistoryPlugin::descriptor),
    (MarkerPlugin::ID, MarkerPlugin::descriptor),
    (HintPlugin::ID, HintPlugin::descriptor),
    (AlignPlugin::ID, AlignPlugin::descriptor),
    (FontFamilyPlugin::ID, FontFamilyPlugin::descriptor),
    (EmojiPlugin::ID, EmojiPlugin::descriptor),
    (ReplacePlugin::ID, ReplacePlugin::descriptor),
    (PowerboxPlugin::ID, PowerboxPlugin::descriptor),
    (ToolbarPlugin::ID, ToolbarPlugin::descriptor),
];

const PRESETS: &[(&str, &[&str])] = &[
    ("core", &["selection", "history"]),
    (
        "default",
        &[
            "selection",
            "history",
            "marker",
            "hint",
            "align",
            "font_family",
            "emoji",
            "replace",
            "powerbox",
            "toolbar",
        ],
    ),
];

/// Name-based access to the bundled plugins.
pub struct Catalog;

impl Catalog {
    /// Names of every known plugin.
    pub fn names() -> impl Iterator<Item = &'static str> {
        PLUGINS.iter().map(|(name, _)| *name)
    }

    /// Names of every preset.
    pub fn presets() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, _)| *name)
    }

    /// The descriptor of plugin `name`.
    pub fn descriptor(name: &str) -> Result<PluginDescriptor, CatalogError> {
        PLUGINS
            .iter()
            .find(|(id, _)| *id == name)
            .map(|(_, factory)| factory())
            .ok_or_else(|| CatalogError::UnknownPlugin(name.to_string()))
    }

    /// The plugin names of preset `name`.
    pub fn preset(name: &str) -> Result<&'static [&'static str], CatalogError> {
        PRESETS
            .iter()
            .find(|(id, _)| *id == name)
            .map(|(_, names)| *names)
            .ok_or_else(|| CatalogError::UnknownPreset(name.to_string()))
    }

    /// Descriptors for a `[plugins]` section.
    ///
    /// `enabled` replaces the preset when it is not empty; `disabled` is
    /// removed from the result. Disabling a plugin others depend on is
    /// reported by the resolver when the editor boots.
    pub fn from_config(config: &PluginsConfig) -> Result<Vec<PluginDescriptor>, CatalogError> {
        let names: Vec<&str> = if config.enabled.is_empty() {
            Self::preset(&config.preset)?.to_vec()
        } else {
            config.enabled.iter().map(String::as_str).collect()
        };

        let mut descriptors = Vec::with_capacity(names.len());
        for name in names {
            if config.disabled.iter().any(|d| d == name) {
                tracing::debug!(plugin = name, "plugin disabled by configuration");
                continue;
            }
            if descriptors.iter().any(|d: &PluginDescriptor| d.id == name) {
                continue;
            }
            descriptors.push(Self::descriptor(name)?);
        }
        Ok(descriptors)
    }
}
