//! Block alignment.
//!
//! Alignment lives in the `text-align` declaration of block elements. The
//! plugin keeps the alignment of the current selection cached so toolbar
//! buttons can be highlighted without walking the document on every read;
//! the cache is refreshed on selection change and after history moves,
//! since undo changes styles without changing the selection.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use vellum_core::resources::{
    EXTERNAL_HISTORY_STEP_HANDLERS, POST_REDO_HANDLERS, POST_UNDO_HANDLERS,
    SELECTION_CHANGE_HANDLERS, SHORTCUTS, SelectionChangeHandler, Shortcut, StepHandler,
    TOOLBAR_GROUPS, TOOLBAR_ITEMS, ToolbarGroup, ToolbarItem, USER_COMMANDS, UserCommand,
};
use vellum_core::{
    EditorState, HistoryApi, HistoryPlugin, Plugin, PluginDescriptor, PluginResult, Resources,
    SelectionApi, SelectionData, SelectionPlugin, params,
};
use vellum_dom::{Document, NodeId, Step};

/// A `text-align` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub const ALL: [Alignment; 4] = [
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
        Alignment::Justify,
    ];

    /// The CSS value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    /// Parses a CSS value; logical values map to their left-to-right side.
    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }

    /// Id of the command applying this alignment.
    pub fn command_id(&self) -> &'static str {
        match self {
            Alignment::Left => "align_left",
            Alignment::Center => "align_center",
            Alignment::Right => "align_right",
            Alignment::Justify => "align_justify",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Alignment::Left => "Align left",
            Alignment::Center => "Align center",
            Alignment::Right => "Align right",
            Alignment::Justify => "Justify",
        }
    }

    fn hotkey(&self) -> &'static str {
        match self {
            Alignment::Left => "ctrl+shift+l",
            Alignment::Center => "ctrl+shift+e",
            Alignment::Right => "ctrl+shift+r",
            Alignment::Justify => "ctrl+shift+j",
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The alignment `block` renders with, inherited from its ancestors.
pub fn block_alignment(doc: &Document, block: NodeId) -> Alignment {
    doc.ancestors_inclusive(block)
        .find_map(|node| doc.style(node, "text-align").and_then(|v| Alignment::from_css(&v)))
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct SetAlignment {
    mode: Alignment,
}

#[derive(Clone)]
struct Aligner {
    selection: Rc<dyn SelectionApi>,
    history: Rc<dyn HistoryApi>,
    /// Shared alignment of the targeted blocks, `None` when mixed
    current: Rc<Cell<Option<Alignment>>>,
}

impl Aligner {
    fn refresh(&self, state: &EditorState) {
        let doc = &state.document;
        let mut alignments = self
            .selection
            .targeted_blocks(state)
            .into_iter()
            .map(|block| block_alignment(doc, block));
        let first = alignments.next();
        self.current.set(first.filter(|&a| alignments.all(|b| a == b)));
    }

    fn apply(&self, state: &mut EditorState, alignment: Alignment) -> PluginResult<()> {
        let root = state.document.root();
        let blocks: Vec<NodeId> = self
            .selection
            .targeted_blocks(state)
            .into_iter()
            .filter(|&block| block != root && state.document.is_editable(block))
            .collect();
        if blocks.is_empty() {
            tracing::debug!(%alignment, "no block to align");
            return Ok(());
        }

        for block in blocks {
            if block_alignment(&state.document, block) != alignment {
                state
                    .document
                    .set_style(block, "text-align", Some(alignment.as_str()))?;
            }
        }
        self.history.add_step(state);
        self.refresh(state);
        Ok(())
    }

    fn command(&self, alignment: Alignment) -> UserCommand {
        let aligner = self.clone();
        UserCommand::new(alignment.command_id(), alignment.title(), move |state, _| {
            aligner.apply(state, alignment)
        })
        .with_icon(format!("fa-align-{}", alignment.as_str()))
    }
}

/// Plugin for the `align_*` commands.
pub struct AlignPlugin {
    aligner: Aligner,
}

impl AlignPlugin {
    pub const ID: &'static str = "align";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            Ok(Box::new(AlignPlugin {
                aligner: Aligner {
                    selection: ctx.dependency::<dyn SelectionApi>()?,
                    history: ctx.dependency::<dyn HistoryApi>()?,
                    current: Rc::new(Cell::new(None)),
                },
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
        .depends_on(HistoryPlugin::ID)
    }

    /// The cached alignment of the selection.
    pub fn current(&self) -> Option<Alignment> {
        self.aligner.current.get()
    }
}

impl Plugin for AlignPlugin {
    fn resources(&self) -> Resources {
        let on_select = self.aligner.clone();
        let on_selection_change: SelectionChangeHandler =
            Rc::new(move |state: &mut EditorState, _: &SelectionData| -> PluginResult<()> {
                on_select.refresh(state);
                Ok(())
            });
        let on_history = self.aligner.clone();
        let after_history: StepHandler =
            Rc::new(move |state: &mut EditorState, _: &Step| -> PluginResult<()> {
                on_history.refresh(state);
                Ok(())
            });

        let generic = self.aligner.clone();
        let set_alignment = UserCommand::new("set_alignment", "Set alignment", move |state, value| {
            let SetAlignment { mode } = params(value)?;
            generic.apply(state, mode)
        })
        .with_description("Align the selected blocks");

        let items = self.aligner.clone();
        let toolbar = move |state: &EditorState| -> Vec<ToolbarItem> {
            if !items.selection.get_selection_data(state).is_in_editable {
                return Vec::new();
            }
            Alignment::ALL
                .into_iter()
                .map(|alignment| {
                    let current = Rc::clone(&items.current);
                    ToolbarItem::new(
                        alignment.command_id(),
                        "alignment",
                        alignment.command_id(),
                        alignment.title(),
                    )
                    .with_icon(format!("fa-align-{}", alignment.as_str()))
                    .active_when(move |_| current.get() == Some(alignment))
                })
                .collect()
        };

        Resources::new()
            .extend(
                USER_COMMANDS,
                Alignment::ALL.map(|alignment| self.aligner.command(alignment)),
            )
            .add(USER_COMMANDS, set_alignment)
            .extend(
                SHORTCUTS,
                Alignment::ALL.map(|a| Shortcut::new(a.hotkey(), a.command_id())),
            )
            .add_with_sequence(TOOLBAR_GROUPS, 30, ToolbarGroup::new("alignment", "Alignment"))
            .add_dynamic(TOOLBAR_ITEMS, toolbar)
            .add(SELECTION_CHANGE_HANDLERS, on_selection_change)
            .add(POST_UNDO_HANDLERS, after_history.clone())
            .add(POST_REDO_HANDLERS, after_history.clone())
            .add(EXTERNAL_HISTORY_STEP_HANDLERS, after_history)
    }

    fn setup(&mut self, state: &mut EditorState) -> PluginResult<()> {
        self.aligner.refresh(state);
        Ok(())
    }

    fn destroy(&mut self, _state: &mut EditorState) {
        self.aligner.current.set(None);
    }
}
