//! Main editor orchestration.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` acts as a facade over the plugin host, the state and the
//! capabilities of the core plugins. Hosts only need `Editor`; plugins only
//! ever see `EditorState`.
//!
//! ## Learning: Drop for Cleanup
//!
//! Plugins must be destroyed in reverse activation order exactly once.
//! `destroy` is idempotent and `Drop` calls it, so an editor that simply
//! goes out of scope is still torn down properly.

use std::rc::Rc;

use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;
use vellum_dom::{Document, NodeId, Selection, StepId};

use crate::command;
use crate::config::Config;
use crate::event::{EditorEvent, EventBus};
use crate::history::HistoryApi;
use crate::keymap::{KeyPress, Keymap};
use crate::normalize::{export_copy, normalize, save_copy};
use crate::plugin::{Capability, PluginDescriptor, PluginHost};
use crate::selection::{SelectionApi, SelectionData};
use crate::state::EditorState;
use crate::{CoreError, CoreResult};

/// Unique identifier for an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorId(Uuid);

impl EditorId {
    /// Creates a new unique editor ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EditorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EditorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// An editing session over one editable root.
///
/// ## Thread Safety
///
/// `Editor` is owned by a single thread. Plugin state lives in `Rc`s and
/// `RefCell`s, so the type is neither `Send` nor `Sync`; hosts on other
/// threads observe it through the event bus.
pub struct Editor {
    /// Document, registry and selection
    state: EditorState,

    /// Live plugins in activation order
    host: PluginHost,

    /// Shortcuts resolved at boot
    keymap: Keymap,

    destroyed: bool,
}

impl Editor {
    /// Boots an editor on an HTML fragment.
    pub fn new(descriptors: &[PluginDescriptor], config: Config, html: &str) -> CoreResult<Self> {
        Self::with_events(descriptors, config, html, EventBus::new())
    }

    /// Boots an editor publishing on `events`.
    ///
    /// Subscribe before calling this to observe `PluginsActivated`.
    pub fn with_events(
        descriptors: &[PluginDescriptor],
        config: Config,
        html: &str,
        events: EventBus,
    ) -> CoreResult<Self> {
        let document = Document::from_html(html)?;
        let mut state = EditorState::with_events(document, Rc::new(config), events);
        let host = PluginHost::activate(descriptors, &mut state)?;

        if state.config().editor.normalize_on_load {
            let root = state.document.root();
            normalize(&mut state, root);
        }
        // Boot-time repairs are the starting point, not a step
        let discarded = state.document.take_records().len();

        let keymap = Keymap::from_state(&state);
        let ids: Vec<String> = host.ids().into_iter().map(String::from).collect();
        tracing::debug!(editor = %state.editor_id(), plugins = ?ids, discarded, "editor ready");
        state.emit(EditorEvent::PluginsActivated(ids));

        Ok(Self {
            state,
            host,
            keymap,
            destroyed: false,
        })
    }

    fn ensure_alive(&self) -> CoreResult<()> {
        if self.destroyed {
            Err(CoreError::Destroyed)
        } else {
            Ok(())
        }
    }

    // ==================== Plugins ====================

    /// Finds capability `C` on any live plugin.
    pub fn capability<C: Capability + ?Sized>(&self) -> CoreResult<Rc<C>> {
        self.ensure_alive()?;
        self.host
            .capability::<C>()
            .ok_or(CoreError::MissingCapability(C::NAME))
    }

    /// The selection capability.
    pub fn selection(&self) -> CoreResult<Rc<dyn SelectionApi>> {
        self.capability::<dyn SelectionApi>()
    }

    /// The history capability.
    pub fn history(&self) -> CoreResult<Rc<dyn HistoryApi>> {
        self.capability::<dyn HistoryApi>()
    }

    /// Ids of the live plugins, in activation order.
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.host.ids()
    }

    // ==================== Selection ====================

    /// Sets the selection, as if the user had made it.
    pub fn set_selection(&mut self, selection: Selection) -> CoreResult<SelectionData> {
        let api = self.selection()?;
        Ok(api.set_selection(&mut self.state, selection)?)
    }

    /// Collapses the selection at `(node, offset)`.
    pub fn set_cursor(&mut self, node: NodeId, offset: usize) -> CoreResult<SelectionData> {
        let api = self.selection()?;
        Ok(api.set_cursor(&mut self.state, node, offset)?)
    }

    /// The current selection snapshot.
    pub fn selection_data(&self) -> CoreResult<SelectionData> {
        Ok(self.selection()?.get_selection_data(&self.state))
    }

    // ==================== Commands ====================

    /// Runs a user command.
    pub fn exec_command(&mut self, id: &str, params: &Value) -> CoreResult<()> {
        self.ensure_alive()?;
        command::exec_command(&mut self.state, id, params)
    }

    /// Runs the command bound to `press`.
    ///
    /// Returns false when nothing is bound to it.
    pub fn handle_key(&mut self, press: &KeyPress) -> CoreResult<bool> {
        self.ensure_alive()?;
        let Some(binding) = self.keymap.lookup(press).cloned() else {
            tracing::trace!(key = %press, "unbound key");
            return Ok(false);
        };
        command::exec_command(&mut self.state, &binding.command_id, &binding.params)?;
        Ok(true)
    }

    /// The shortcuts resolved at boot.
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    // ==================== History ====================

    /// Commits pending mutations as one step.
    pub fn add_step(&mut self) -> CoreResult<Option<StepId>> {
        let history = self.history()?;
        Ok(history.add_step(&mut self.state))
    }

    pub fn undo(&mut self) -> CoreResult<Option<StepId>> {
        let history = self.history()?;
        Ok(history.undo(&mut self.state))
    }

    pub fn redo(&mut self) -> CoreResult<Option<StepId>> {
        let history = self.history()?;
        Ok(history.redo(&mut self.state))
    }

    // ==================== Content ====================

    /// The live content, editor-only markup included.
    pub fn content(&self) -> String {
        self.state.document.inner_html()
    }

    /// The content after the clean handlers ran on a copy.
    pub fn export_content(&self) -> CoreResult<String> {
        self.ensure_alive()?;
        Ok(export_copy(&self.state).inner_html())
    }

    /// The content ready to be persisted.
    pub fn content_for_save(&self) -> CoreResult<String> {
        self.ensure_alive()?;
        Ok(save_copy(&self.state).inner_html())
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> EditorId {
        self.state.editor_id()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    pub fn document(&self) -> &Document {
        &self.state.document
    }

    /// Subscribes to editor events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.state.events().subscribe()
    }

    pub fn config(&self) -> &Config {
        self.state.config()
    }

    // ==================== Lifecycle ====================

    /// Tears every plugin down in reverse activation order.
    ///
    /// Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.host.teardown(&mut self.state);
        tracing::debug!(editor = %self.state.editor_id(), "editor destroyed");
        self.state.emit(EditorEvent::Destroyed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.destroy();
    }
}
