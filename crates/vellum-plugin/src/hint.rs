//! Placeholder hints on empty blocks.
//!
//! The block holding a collapsed cursor gets a `placeholder` attribute when
//! it is empty and some plugin contributed a [`Hint`] for its tag. When the
//! `placeholder` option is set, an empty document shows it on its first
//! block even without a cursor.
//!
//! Hints are presentation only. They are written with the journal
//! suspended so they never become history, and they are removed from every
//! exported copy.

use std::cell::RefCell;
use std::rc::Rc;

use vellum_core::resources::{
    CLEAN_HANDLERS, CleanHandler, EXTERNAL_HISTORY_STEP_HANDLERS, HINTS, HISTORY_RESET_HANDLERS,
    Handler, Hint, POST_REDO_HANDLERS, POST_UNDO_HANDLERS, SAVABLE_MUTATION_RECORD_PREDICATES,
    SELECTION_CHANGE_HANDLERS, STEP_ADDED_HANDLERS, SavablePredicate, SelectionChangeHandler,
    StepHandler,
};
use vellum_core::{
    EditorState, Plugin, PluginDescriptor, PluginResult, Resources, SelectionApi, SelectionData,
    SelectionPlugin,
};
use vellum_dom::{Document, MARKER_CHAR, MutationRecord, NodeId, Step, VOID_TAGS};

/// Attribute carrying the hint text.
pub const HINT_ATTRIBUTE: &str = "placeholder";

/// Returns true if `block` shows nothing: no visible text, no media.
fn is_empty_block(doc: &Document, block: NodeId) -> bool {
    doc.descendants(block).into_iter().all(|node| match doc.text(node) {
        Some(text) => text.chars().all(|c| c == MARKER_CHAR),
        None => doc
            .tag(node)
            .is_none_or(|tag| tag == "br" || !VOID_TAGS.contains(&tag)),
    })
}

#[derive(Clone)]
struct Hinter {
    selection: Rc<dyn SelectionApi>,
    placeholder: Option<String>,
    /// Blocks currently carrying a hint
    hinted: Rc<RefCell<Vec<NodeId>>>,
}

impl Hinter {
    fn target(&self, state: &EditorState) -> Option<(NodeId, String)> {
        let doc = &state.document;
        let root = doc.root();
        let data = self.selection.get_selection_data(state);

        if data.is_in_editable && data.editable_selection.is_collapsed {
            let block = doc.closest_block(data.editable_selection.focus.node);
            if block != root && is_empty_block(doc, block) {
                let tag = doc.tag(block).unwrap_or_default();
                if let Some(hint) = state.resource(HINTS).into_iter().find(|h| h.tag == tag) {
                    return Some((block, hint.text));
                }
            }
        }

        let placeholder = self.placeholder.as_ref()?;
        let first = doc.first_child(root)?;
        let only_block = doc.children(root).len() == 1 && doc.is_block(first);
        (only_block && is_empty_block(doc, first)).then(|| (first, placeholder.clone()))
    }

    fn refresh(&self, state: &mut EditorState) {
        let target = self.target(state);
        let mut hinted = self.hinted.borrow_mut();
        if let Some((block, _)) = &target {
            if hinted.as_slice() == [*block] {
                return;
            }
        }

        let mut doc = state.document.unobserved();
        for node in hinted.drain(..) {
            if doc.contains(node) {
                if let Err(err) = doc.set_attribute(node, HINT_ATTRIBUTE, None) {
                    tracing::debug!(%node, %err, "could not remove hint");
                }
            }
        }
        if let Some((block, text)) = target {
            if doc.attribute(block, HINT_ATTRIBUTE).is_some() {
                // Authored placeholder, leave it
                return;
            }
            match doc.set_attribute(block, HINT_ATTRIBUTE, Some(&text)) {
                Ok(()) => hinted.push(block),
                Err(err) => tracing::debug!(%block, %err, "could not set hint"),
            }
        }
    }

    fn is_hinted(&self, node: NodeId) -> bool {
        self.hinted.borrow().contains(&node)
    }
}

/// Plugin showing hints on empty blocks.
pub struct HintPlugin {
    hinter: Hinter,
}

impl HintPlugin {
    pub const ID: &'static str = "hint";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            Ok(Box::new(HintPlugin {
                hinter: Hinter {
                    selection: ctx.dependency::<dyn SelectionApi>()?,
                    placeholder: ctx.option::<String>("placeholder").filter(|p| !p.is_empty()),
                    hinted: Rc::new(RefCell::new(Vec::new())),
                },
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
    }
}

impl Plugin for HintPlugin {
    fn resources(&self) -> Resources {
        let on_select = self.hinter.clone();
        let on_selection_change: SelectionChangeHandler =
            Rc::new(move |state: &mut EditorState, _: &SelectionData| -> PluginResult<()> {
                on_select.refresh(state);
                Ok(())
            });
        let on_step = self.hinter.clone();
        let after_step: StepHandler =
            Rc::new(move |state: &mut EditorState, _: &Step| -> PluginResult<()> {
                on_step.refresh(state);
                Ok(())
            });
        let on_reset = self.hinter.clone();
        let after_reset: Handler = Rc::new(move |state: &mut EditorState| -> PluginResult<()> {
            on_reset.refresh(state);
            Ok(())
        });

        let hinted = self.hinter.clone();
        let savable: SavablePredicate = Rc::new(move |record: &MutationRecord| match record {
            MutationRecord::Attribute { node, name, .. } => {
                !(name == HINT_ATTRIBUTE && hinted.is_hinted(*node))
            }
            _ => true,
        });
        let cleaner = self.hinter.clone();
        let clean: CleanHandler =
            Rc::new(move |doc: &mut Document, _: NodeId| -> PluginResult<()> {
                for node in cleaner.hinted.borrow().iter().copied() {
                    if doc.contains(node) {
                        doc.set_attribute(node, HINT_ATTRIBUTE, None)?;
                    }
                }
                Ok(())
            });

        Resources::new()
            .extend(
                HINTS,
                [
                    Hint::new("h1", "Heading 1"),
                    Hint::new("h2", "Heading 2"),
                    Hint::new("h3", "Heading 3"),
                    Hint::new("h4", "Heading 4"),
                    Hint::new("h5", "Heading 5"),
                    Hint::new("h6", "Heading 6"),
                    Hint::new("blockquote", "Quote"),
                    Hint::new("pre", "Code"),
                    Hint::new("li", "List"),
                ],
            )
            .add(SELECTION_CHANGE_HANDLERS, on_selection_change)
            .add(STEP_ADDED_HANDLERS, after_step.clone())
            .add(POST_UNDO_HANDLERS, after_step.clone())
            .add(POST_REDO_HANDLERS, after_step.clone())
            .add(EXTERNAL_HISTORY_STEP_HANDLERS, after_step)
            .add(HISTORY_RESET_HANDLERS, after_reset)
            .add(SAVABLE_MUTATION_RECORD_PREDICATES, savable)
            .add(CLEAN_HANDLERS, clean)
    }

    fn setup(&mut self, state: &mut EditorState) -> PluginResult<()> {
        self.hinter.refresh(state);
        Ok(())
    }

    fn destroy(&mut self, state: &mut EditorState) {
        let mut doc = state.document.unobserved();
        for node in self.hinter.hinted.borrow_mut().drain(..) {
            if doc.contains(node) {
                if let Err(err) = doc.set_attribute(node, HINT_ATTRIBUTE, None) {
                    tracing::debug!(%node, %err, "could not remove hint");
                }
            }
        }
    }
}
