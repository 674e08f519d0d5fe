//! Shared editor state handed to plugins and handlers.

use std::rc::Rc;

use vellum_dom::{Document, Selection};

use crate::config::Config;
use crate::editor::EditorId;
use crate::event::{EditorEvent, EventBus};
use crate::registry::{ResourceKey, ResourceRegistry};

/// Everything a plugin may touch while it runs.
///
/// The document is public: plugins mutate it directly and the history
/// plugin picks the changes up from its journal. The native selection is
/// raw storage; plugins go through the selection capability, which clamps
/// points and notifies handlers.
pub struct EditorState {
    /// The editable document
    pub document: Document,
    native_selection: Option<Selection>,
    resources: ResourceRegistry,
    config: Rc<Config>,
    events: EventBus,
    editor_id: EditorId,
}

impl EditorState {
    /// Creates state around `document` with an empty registry.
    pub fn new(document: Document, config: Rc<Config>) -> Self {
        Self::with_events(document, config, EventBus::new())
    }

    /// Like [`Self::new`], publishing on an existing bus.
    pub fn with_events(document: Document, config: Rc<Config>, events: EventBus) -> Self {
        Self {
            document,
            native_selection: None,
            resources: ResourceRegistry::new(),
            config,
            events,
            editor_id: EditorId::new(),
        }
    }

    /// The selection as the host last set or reported it.
    pub fn native_selection(&self) -> Option<Selection> {
        self.native_selection
    }

    /// Overwrites the native selection without any notification.
    pub fn set_native_selection(&mut self, selection: Option<Selection>) {
        self.native_selection = selection;
    }

    /// Shorthand for reading a resource key.
    pub fn resource<T: Clone + 'static>(&self, key: ResourceKey<T>) -> Vec<T> {
        self.resources.get(key, self)
    }

    /// The resource registry.
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    /// The configuration the editor was started with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A shared handle on the configuration.
    pub fn config_handle(&self) -> Rc<Config> {
        Rc::clone(&self.config)
    }

    /// The editor's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Publishes an event on the bus.
    pub fn emit(&self, event: EditorEvent) {
        self.events.emit(event);
    }

    /// Identifier of the owning editor.
    pub fn editor_id(&self) -> EditorId {
        self.editor_id
    }

    #[cfg(test)]
    pub(crate) fn for_tests(html: &str) -> Self {
        let document = Document::from_html(html).unwrap_or_default();
        Self::new(document, Rc::new(Config::default()))
    }
}
