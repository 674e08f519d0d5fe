//! The resource keys every plugin can contribute to, and their value types.
//!
//! Keys are typed: contributing a [`UserCommand`] under [`SHORTCUTS`] does
//! not compile. Handler contributions are reference-counted closures so the
//! registry can hand out clones without copying plugin state.

use std::rc::Rc;

use serde_json::Value;
use vellum_dom::{Document, MutationRecord, NodeId, Step};

use crate::plugin::PluginResult;
use crate::registry::ResourceKey;
use crate::selection::SelectionData;
use crate::state::EditorState;

/// A handler that only needs the state.
pub type Handler = Rc<dyn Fn(&mut EditorState) -> PluginResult<()>>;

/// Repairs the subtree below the given node of the live document.
pub type NormalizeHandler = Rc<dyn Fn(&mut EditorState, NodeId) -> PluginResult<()>>;

/// Cleans the subtree below the given node of an export copy.
pub type CleanHandler = Rc<dyn Fn(&mut Document, NodeId) -> PluginResult<()>>;

/// Reacts to a history step.
pub type StepHandler = Rc<dyn Fn(&mut EditorState, &Step) -> PluginResult<()>>;

/// Reacts to a selection change.
pub type SelectionChangeHandler = Rc<dyn Fn(&mut EditorState, &SelectionData) -> PluginResult<()>>;

/// Decides whether a mutation record belongs in history.
pub type SavablePredicate = Rc<dyn Fn(&MutationRecord) -> bool>;

/// Runs a command with its JSON parameters.
pub type CommandFn = Rc<dyn Fn(&mut EditorState, &Value) -> PluginResult<()>>;

/// A state predicate used for availability and toolbar highlighting.
pub type StatePredicate = Rc<dyn Fn(&EditorState) -> bool>;

pub const USER_COMMANDS: ResourceKey<UserCommand> = ResourceKey::new("user_commands");
pub const SHORTCUTS: ResourceKey<Shortcut> = ResourceKey::new("shortcuts");
pub const TOOLBAR_GROUPS: ResourceKey<ToolbarGroup> = ResourceKey::new("toolbar_groups");
pub const TOOLBAR_ITEMS: ResourceKey<ToolbarItem> = ResourceKey::new("toolbar_items");
pub const POWERBOX_ITEMS: ResourceKey<PowerboxItem> = ResourceKey::new("powerbox_items");
pub const HINTS: ResourceKey<Hint> = ResourceKey::new("hints");

pub const NORMALIZE_HANDLERS: ResourceKey<NormalizeHandler> =
    ResourceKey::new("normalize_handlers");
pub const CLEAN_HANDLERS: ResourceKey<CleanHandler> = ResourceKey::new("clean_handlers");
pub const CLEAN_FOR_SAVE_HANDLERS: ResourceKey<CleanHandler> =
    ResourceKey::new("clean_for_save_handlers");

pub const SELECTION_CHANGE_HANDLERS: ResourceKey<SelectionChangeHandler> =
    ResourceKey::new("selection_change_handlers");

pub const STEP_ADDED_HANDLERS: ResourceKey<StepHandler> = ResourceKey::new("step_added_handlers");
pub const POST_UNDO_HANDLERS: ResourceKey<StepHandler> = ResourceKey::new("post_undo_handlers");
pub const POST_REDO_HANDLERS: ResourceKey<StepHandler> = ResourceKey::new("post_redo_handlers");
pub const EXTERNAL_HISTORY_STEP_HANDLERS: ResourceKey<StepHandler> =
    ResourceKey::new("external_history_step_handlers");
pub const HISTORY_RESET_HANDLERS: ResourceKey<Handler> =
    ResourceKey::new("history_reset_handlers");
pub const SAVABLE_MUTATION_RECORD_PREDICATES: ResourceKey<SavablePredicate> =
    ResourceKey::new("savable_mutation_record_predicates");

/// A named action a user can invoke.
#[derive(Clone)]
pub struct UserCommand {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    run: CommandFn,
    is_available: Option<StatePredicate>,
}

impl UserCommand {
    /// Creates a command that is always available.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        run: impl Fn(&mut EditorState, &Value) -> PluginResult<()> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            icon: None,
            run: Rc::new(run),
            is_available: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Restricts the command to states where `predicate` holds.
    pub fn available_when(mut self, predicate: impl Fn(&EditorState) -> bool + 'static) -> Self {
        self.is_available = Some(Rc::new(predicate));
        self
    }

    /// Returns true if the command may run now.
    pub fn is_available(&self, state: &EditorState) -> bool {
        self.is_available.as_ref().is_none_or(|p| p(state))
    }

    /// Runs the command.
    pub fn run(&self, state: &mut EditorState, params: &Value) -> PluginResult<()> {
        (self.run)(state, params)
    }
}

impl std::fmt::Debug for UserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCommand")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Binds a hotkey such as `ctrl+shift+z` to a command.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub hotkey: String,
    pub command_id: String,
    pub params: Value,
}

impl Shortcut {
    pub fn new(hotkey: impl Into<String>, command_id: impl Into<String>) -> Self {
        Self {
            hotkey: hotkey.into(),
            command_id: command_id.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// A toolbar section.
#[derive(Debug, Clone)]
pub struct ToolbarGroup {
    pub id: String,
    pub title: String,
}

impl ToolbarGroup {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A toolbar button bound to a command.
#[derive(Clone)]
pub struct ToolbarItem {
    pub id: String,
    pub group_id: String,
    pub command_id: String,
    pub title: String,
    pub icon: Option<String>,
    pub params: Value,
    is_active: Option<StatePredicate>,
}

impl ToolbarItem {
    pub fn new(
        id: impl Into<String>,
        group_id: impl Into<String>,
        command_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            command_id: command_id.into(),
            title: title.into(),
            icon: None,
            params: Value::Null,
            is_active: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Highlights the button in states where `predicate` holds.
    pub fn active_when(mut self, predicate: impl Fn(&EditorState) -> bool + 'static) -> Self {
        self.is_active = Some(Rc::new(predicate));
        self
    }

    /// Returns true if the button should be highlighted.
    pub fn is_active(&self, state: &EditorState) -> bool {
        self.is_active.as_ref().is_some_and(|p| p(state))
    }
}

impl std::fmt::Debug for ToolbarItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolbarItem")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("command_id", &self.command_id)
            .finish_non_exhaustive()
    }
}

/// An entry of the `/` command palette.
#[derive(Debug, Clone)]
pub struct PowerboxItem {
    pub command_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub params: Value,
}

impl PowerboxItem {
    pub fn new(
        command_id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            keywords: Vec::new(),
            params: Value::Null,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Placeholder text shown in an empty block with the given tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub tag: String,
    pub text: String,
}

impl Hint {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }
}
