//! # Vellum Core
//!
//! The editing engine: plugins, the resources they contribute, and the
//! selection and history machinery every feature plugin builds on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Editor                            │
//! │  ┌────────────┐  ┌────────────┐  ┌──────────────────────┐ │
//! │  │ PluginHost │  │   Config   │  │       EventBus       │ │
//! │  └─────┬──────┘  └────────────┘  └──────────────────────┘ │
//! │        │ activation order                                 │
//! │  ┌─────┴──────────────────────────────────────────────┐   │
//! │  │                    EditorState                     │   │
//! │  │  ┌──────────┐ ┌──────────────────┐ ┌────────────┐  │   │
//! │  │  │ Document │ │ ResourceRegistry │ │ Selection  │  │   │
//! │  │  └──────────┘ └──────────────────┘ └────────────┘  │   │
//! │  └────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod command;
pub mod config;
pub mod editor;
pub mod event;
pub mod history;
pub mod keymap;
pub mod normalize;
pub mod plugin;
pub mod registry;
pub mod resources;
pub mod selection;
pub mod state;

pub use command::{exec_command, find_command, params};
pub use config::{Config, ConfigError};
pub use editor::{Editor, EditorId};
pub use event::{EditorEvent, EventBus, EventHandler};
pub use history::{History, HistoryApi, HistoryPhase, HistoryPlugin};
pub use keymap::{Binding, Key, KeyPress, Keymap, Modifiers};
pub use normalize::{export_copy, normalize, save_copy};
pub use plugin::{
    Capabilities, Capability, Dependencies, Plugin, PluginContext, PluginDescriptor, PluginError,
    PluginHost, PluginResult, resolve_order,
};
pub use registry::{DEFAULT_SEQUENCE, ResourceKey, ResourceRegistry, Resources, dispatch, isolate};
pub use selection::{
    Cursors, EditableSelection, SelectionApi, SelectionData, SelectionPlugin, SelectionTracker,
    preserving_selection,
};
pub use state::EditorState;

use vellum_dom::DomError;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command not available in the current state: {0}")]
    CommandUnavailable(String),

    #[error("No active plugin provides the {0} capability")]
    MissingCapability(&'static str),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Editor has been destroyed")]
    Destroyed,
}
