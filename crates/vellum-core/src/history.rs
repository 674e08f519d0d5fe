//! The history plugin: steps, undo and redo.
//!
//! ## Learning: Phases Instead of Locks
//!
//! Undo reverts records through the regular mutation API, and hooks run
//! while that happens. A phase flag keeps those paths from feeding back
//! into history: `add_step` is ignored unless the phase is `Idle`, the
//! selection is only staged while idle, and reverts run with the document
//! journal suspended. Everything is single-threaded, so a `Cell`-like
//! phase stored next to the stacks is enough.
//!
//! ```text
//!            add_step                undo                 redo
//!   Idle ──────────────▶ Committing  Idle ──▶ Undoing     Idle ──▶ Redoing
//!     ▲   normalize, push    │         ▲   revert, hooks    ▲   replay, hooks
//!     └──────────────────────┘         └──────┘             └──────┘
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use vellum_dom::{NodeId, Selection, Step, StepId, StepStack};

use crate::event::EditorEvent;
use crate::normalize::normalize;
use crate::plugin::{
    Capabilities, Capability, Plugin, PluginDescriptor, PluginError, PluginResult,
};
use crate::registry::{Resources, dispatch};
use crate::resources::{
    EXTERNAL_HISTORY_STEP_HANDLERS, HISTORY_RESET_HANDLERS, POST_REDO_HANDLERS,
    POST_UNDO_HANDLERS, SAVABLE_MUTATION_RECORD_PREDICATES, SELECTION_CHANGE_HANDLERS,
    SHORTCUTS, STEP_ADDED_HANDLERS, SelectionChangeHandler, Shortcut, USER_COMMANDS, UserCommand,
};
use crate::selection::{SelectionApi, SelectionData, SelectionPlugin};
use crate::state::EditorState;

/// What the history engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPhase {
    Idle,
    Committing,
    Undoing,
    Redoing,
}

/// History operations offered to dependent plugins.
pub trait HistoryApi {
    /// Commits pending mutations as one step.
    ///
    /// Returns `None` when nothing was committed: the engine is busy, no
    /// mutation is pending, or every pending record was filtered out.
    fn add_step(&self, state: &mut EditorState) -> Option<StepId>;

    /// Reverts the last step. Pending mutations are committed first.
    fn undo(&self, state: &mut EditorState) -> Option<StepId>;

    /// Re-applies the last undone step.
    fn redo(&self, state: &mut EditorState) -> Option<StepId>;

    /// Applies a step produced elsewhere and records it.
    fn apply_external_step(&self, state: &mut EditorState, step: Step) -> PluginResult<StepId>;

    /// Drops every step and pending mutation.
    fn reset(&self, state: &mut EditorState);

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    fn undo_count(&self) -> usize;

    fn redo_count(&self) -> usize;

    fn phase(&self) -> HistoryPhase;
}

impl Capability for dyn HistoryApi {
    const NAME: &'static str = "history";
}

struct HistoryInner {
    stack: StepStack,
    phase: HistoryPhase,
    /// Selection to store as the next step's `selection_before`
    staged: Option<Selection>,
}

/// The [`HistoryApi`] implementation.
#[derive(Clone)]
pub struct History {
    inner: Rc<RefCell<HistoryInner>>,
    selection: Rc<dyn SelectionApi>,
}

impl History {
    /// Creates an empty history keeping at most `limit` steps (0 = unbounded).
    pub fn new(selection: Rc<dyn SelectionApi>, limit: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HistoryInner {
                stack: StepStack::new(limit),
                phase: HistoryPhase::Idle,
                staged: None,
            })),
            selection,
        }
    }

    fn set_phase(&self, phase: HistoryPhase) {
        self.inner.borrow_mut().phase = phase;
    }

    /// The selection the next step will restore on undo.
    pub fn staged_selection(&self) -> Option<Selection> {
        self.inner.borrow().staged
    }

    fn stage(&self, state: &EditorState, data: &SelectionData) {
        if self.phase() != HistoryPhase::Idle || state.document.has_pending_records() {
            return;
        }
        if data.is_in_editable {
            self.inner.borrow_mut().staged = data.document_selection;
        }
    }

    fn current_selection(&self, state: &EditorState) -> Option<Selection> {
        self.selection.get_selection_data(state).document_selection
    }

    fn restore_selection(&self, state: &mut EditorState, selection: Option<Selection>) {
        let Some(selection) = selection else {
            return;
        };
        if let Err(err) = self.selection.set_selection(state, selection) {
            tracing::debug!(%err, "step selection no longer applies");
        }
    }

    fn discard_stray_records(state: &mut EditorState, during: &str) {
        let stray = state.document.take_records();
        if !stray.is_empty() {
            tracing::debug!(count = stray.len(), during, "discarding mutations made by history hooks");
        }
    }

    /// The node normalization runs on for a set of mutated nodes.
    fn normalization_scope(state: &EditorState, targets: &[NodeId]) -> NodeId {
        let doc = &state.document;
        let attached = targets.iter().copied().filter(|&n| doc.is_attached(n));
        match doc.common_ancestor(attached) {
            Some(node) if doc.is_text(node) => doc.parent(node).unwrap_or(doc.root()),
            Some(node) => node,
            None => doc.root(),
        }
    }
}

impl HistoryApi for History {
    fn add_step(&self, state: &mut EditorState) -> Option<StepId> {
        let phase = self.phase();
        if phase != HistoryPhase::Idle {
            tracing::trace!(?phase, "add_step ignored");
            return None;
        }
        if !state.document.has_pending_records() {
            return None;
        }

        self.set_phase(HistoryPhase::Committing);
        let mut records = state.document.take_records();
        let targets: Vec<NodeId> = records.iter().map(|r| r.target()).collect();
        let scope = Self::normalization_scope(state, &targets);
        normalize(state, scope);
        records.extend(state.document.take_records());

        let predicates = state.resource(SAVABLE_MUTATION_RECORD_PREDICATES);
        let mut step = Step::new(self.staged_selection());
        for record in records {
            if predicates.iter().all(|savable| savable(&record)) {
                step.push(record);
            }
        }

        if step.is_empty() {
            tracing::trace!("no savable mutation, nothing committed");
            self.set_phase(HistoryPhase::Idle);
            return None;
        }

        step.selection_after = self.current_selection(state);
        let id = step.id;
        {
            let mut inner = self.inner.borrow_mut();
            inner.stack.push(step.clone());
            inner.staged = step.selection_after;
            inner.phase = HistoryPhase::Idle;
        }
        tracing::debug!(step = %id, records = step.records.len(), "step added");

        dispatch(state, STEP_ADDED_HANDLERS, |handler, state| handler(state, &step));
        state.emit(EditorEvent::StepAdded(id));
        Some(id)
    }

    fn undo(&self, state: &mut EditorState) -> Option<StepId> {
        if self.phase() != HistoryPhase::Idle {
            return None;
        }
        self.add_step(state);
        let step = self.inner.borrow_mut().stack.pop_undo()?;

        self.set_phase(HistoryPhase::Undoing);
        if let Err(err) = step.revert(&mut state.document.unobserved()) {
            tracing::warn!(step = %step.id, %err, "undo could not revert every record");
        }
        self.restore_selection(state, step.selection_before);
        self.inner.borrow_mut().stack.push_redo(step.clone());

        dispatch(state, POST_UNDO_HANDLERS, |handler, state| handler(state, &step));
        Self::discard_stray_records(state, "undo");
        {
            let mut inner = self.inner.borrow_mut();
            inner.staged = step.selection_before;
            inner.phase = HistoryPhase::Idle;
        }
        tracing::debug!(step = %step.id, "step undone");
        state.emit(EditorEvent::Undo(step.id));
        Some(step.id)
    }

    fn redo(&self, state: &mut EditorState) -> Option<StepId> {
        if self.phase() != HistoryPhase::Idle {
            return None;
        }
        self.add_step(state);
        let step = self.inner.borrow_mut().stack.pop_redo()?;

        self.set_phase(HistoryPhase::Redoing);
        if let Err(err) = step.replay(&mut state.document.unobserved()) {
            tracing::warn!(step = %step.id, %err, "redo could not replay every record");
        }
        self.restore_selection(state, step.selection_after);
        self.inner.borrow_mut().stack.push_undo(step.clone());

        dispatch(state, POST_REDO_HANDLERS, |handler, state| handler(state, &step));
        Self::discard_stray_records(state, "redo");
        {
            let mut inner = self.inner.borrow_mut();
            inner.staged = step.selection_after;
            inner.phase = HistoryPhase::Idle;
        }
        tracing::debug!(step = %step.id, "step redone");
        state.emit(EditorEvent::Redo(step.id));
        Some(step.id)
    }

    fn apply_external_step(&self, state: &mut EditorState, step: Step) -> PluginResult<StepId> {
        if self.phase() != HistoryPhase::Idle {
            return Err(PluginError::Failed(
                "history is busy, external step rejected".to_string(),
            ));
        }
        self.add_step(state);
        step.replay(&mut state.document.unobserved())?;

        let id = step.id;
        self.inner.borrow_mut().stack.push(step.clone());
        dispatch(state, EXTERNAL_HISTORY_STEP_HANDLERS, |handler, state| {
            handler(state, &step)
        });
        Self::discard_stray_records(state, "external step");
        tracing::debug!(step = %id, "external step applied");
        state.emit(EditorEvent::ExternalStep(id));
        Ok(id)
    }

    fn reset(&self, state: &mut EditorState) {
        let dropped = state.document.take_records().len();
        let staged = self.current_selection(state);
        {
            let mut inner = self.inner.borrow_mut();
            inner.stack.clear();
            inner.staged = staged;
            inner.phase = HistoryPhase::Idle;
        }
        tracing::debug!(dropped, "history reset");
        dispatch(state, HISTORY_RESET_HANDLERS, |handler, state| handler(state));
        state.emit(EditorEvent::HistoryReset);
    }

    fn can_undo(&self) -> bool {
        self.inner.borrow().stack.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.inner.borrow().stack.can_redo()
    }

    fn undo_count(&self) -> usize {
        self.inner.borrow().stack.undo_count()
    }

    fn redo_count(&self) -> usize {
        self.inner.borrow().stack.redo_count()
    }

    fn phase(&self) -> HistoryPhase {
        self.inner.borrow().phase
    }
}

/// Plugin exposing a [`History`] as `dyn HistoryApi`.
pub struct HistoryPlugin {
    history: History,
}

impl HistoryPlugin {
    pub const ID: &'static str = "history";

    /// Descriptor for the `history` plugin.
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            let selection = ctx.dependency::<dyn SelectionApi>()?;
            let limit = ctx.config().editor.history_limit;
            Ok(Box::new(HistoryPlugin {
                history: History::new(selection, limit),
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
        .shares::<dyn HistoryApi>()
    }
}

impl Plugin for HistoryPlugin {
    fn resources(&self) -> Resources {
        let stager = self.history.clone();
        let stage: SelectionChangeHandler = Rc::new(
            move |state: &mut EditorState, data: &SelectionData| -> PluginResult<()> {
                stager.stage(state, data);
                Ok(())
            },
        );
        let undo = self.history.clone();
        let redo = self.history.clone();
        let undoable = self.history.clone();
        let redoable = self.history.clone();

        Resources::new()
            .add(SELECTION_CHANGE_HANDLERS, stage)
            .add(
                USER_COMMANDS,
                UserCommand::new("undo", "Undo", move |state, _| {
                    undo.undo(state);
                    Ok(())
                })
                .with_icon("fa-undo")
                .available_when(move |_| undoable.can_undo()),
            )
            .add(
                USER_COMMANDS,
                UserCommand::new("redo", "Redo", move |state, _| {
                    redo.redo(state);
                    Ok(())
                })
                .with_icon("fa-repeat")
                .available_when(move |_| redoable.can_redo()),
            )
            .extend(
                SHORTCUTS,
                [
                    Shortcut::new("ctrl+z", "undo"),
                    Shortcut::new("ctrl+y", "redo"),
                    Shortcut::new("ctrl+shift+z", "redo"),
                ],
            )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new().provide::<dyn HistoryApi>(Rc::new(self.history.clone()))
    }

    fn setup(&mut self, state: &mut EditorState) -> PluginResult<()> {
        let staged = self.history.current_selection(state);
        self.history.inner.borrow_mut().staged = staged;
        Ok(())
    }

    fn destroy(&mut self, _state: &mut EditorState) {
        let mut inner = self.history.inner.borrow_mut();
        inner.stack.clear();
        inner.staged = None;
    }
}
