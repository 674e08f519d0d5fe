//! The selection tracker plugin.
//!
//! ## Raw vs Editable Selections
//!
//! The native selection is whatever the host last reported; it may sit on
//! an element boundary, inside a `contenteditable="false"` island, or on a
//! node some plugin has since removed. Plugins almost always want the
//! *editable* selection instead: both points pushed down into leaf
//! positions, moved out of non-editable islands, and falling back to the
//! last good selection when the native one is unusable.
//!
//! ## Learning: Scoped Handles
//!
//! [`Cursors`] is a snapshot a plugin takes before it rewrites part of the
//! tree. The plugin tells the snapshot how its mutation moves positions
//! (`shift_offset`, `remap_node`...) and then calls [`Cursors::restore`].
//! [`preserving_selection`] wraps that protocol around a closure so the
//! restore happens even when the closure fails.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use vellum_dom::{Direction, Document, DomError, NodeId, Point, Selection};

use crate::event::EditorEvent;
use crate::plugin::{Capabilities, Capability, Plugin, PluginDescriptor, PluginResult};
use crate::registry::dispatch;
use crate::resources::SELECTION_CHANGE_HANDLERS;
use crate::state::EditorState;

/// The selection as plugins should reason about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditableSelection {
    pub anchor: Point,
    pub focus: Point,
    pub start: Point,
    pub end: Point,
    pub direction: Direction,
    pub is_collapsed: bool,
    pub common_ancestor: NodeId,
}

impl EditableSelection {
    fn new(doc: &Document, anchor: Point, focus: Point) -> Self {
        let selection = Selection::new(anchor, focus);
        Self {
            anchor,
            focus,
            start: selection.start(doc),
            end: selection.end(doc),
            direction: selection.direction(doc),
            is_collapsed: selection.is_collapsed(),
            common_ancestor: doc
                .common_ancestor([anchor.node, focus.node])
                .unwrap_or(doc.root()),
        }
    }

    /// The anchor/focus pair.
    pub fn selection(&self) -> Selection {
        Selection::new(self.anchor, self.focus)
    }
}

/// Raw and editable views of the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionData {
    /// The native selection, if it points into the document
    pub document_selection: Option<Selection>,
    /// Normalized selection, never absent
    pub editable_selection: EditableSelection,
    /// True if the native selection lies inside the editable root
    pub is_in_editable: bool,
}

/// Selection operations offered to dependent plugins.
pub trait SelectionApi {
    /// Returns the raw and editable selections.
    fn get_selection_data(&self, state: &EditorState) -> SelectionData;

    /// Sets the native selection, clamping offsets, and notifies handlers.
    fn set_selection(&self, state: &mut EditorState, selection: Selection)
    -> PluginResult<SelectionData>;

    /// Collapses the selection at `(node, offset)`.
    fn set_cursor(
        &self,
        state: &mut EditorState,
        node: NodeId,
        offset: usize,
    ) -> PluginResult<SelectionData> {
        self.set_selection(state, Selection::collapsed(Point::new(node, offset)))
    }

    /// Notifies handlers after the host changed the native selection.
    fn handle_selection_change(&self, state: &mut EditorState) -> SelectionData;

    /// Snapshots the selection ahead of a mutation.
    fn preserve_selection(&self, state: &EditorState) -> Cursors;

    /// Nodes the editable selection touches, in document order.
    fn targeted_nodes(&self, state: &EditorState) -> Vec<NodeId>;

    /// Distinct closest blocks of the targeted leaves, in document order.
    fn targeted_blocks(&self, state: &EditorState) -> Vec<NodeId>;
}

impl Capability for dyn SelectionApi {
    const NAME: &'static str = "selection";
}

#[derive(Default)]
struct TrackerInner {
    last_editable: Option<Selection>,
}

/// The [`SelectionApi`] implementation.
#[derive(Clone, Default)]
pub struct SelectionTracker {
    inner: Rc<RefCell<TrackerInner>>,
}

impl SelectionTracker {
    /// Creates a tracker with no remembered selection.
    pub fn new() -> Self {
        Self::default()
    }

    fn fallback(&self, doc: &Document) -> (Point, Point) {
        if let Some(last) = self.inner.borrow().last_editable {
            if last.is_attached(doc) {
                return (
                    editable_point(doc, last.anchor),
                    editable_point(doc, last.focus),
                );
            }
        }
        let start = doc.deepest_point(Point::new(doc.root(), 0));
        (start, start)
    }
}

/// Moves a point to a leaf position outside any non-editable island.
fn editable_point(doc: &Document, point: Point) -> Point {
    let deep = doc.deepest_point(point);
    if doc.is_editable(deep.node) {
        return deep;
    }
    doc.ancestors_inclusive(deep.node)
        .take_while(|&n| !doc.is_editable(n))
        .last()
        .and_then(|island| doc.point_after(island))
        .unwrap_or(deep)
}

impl SelectionApi for SelectionTracker {
    fn get_selection_data(&self, state: &EditorState) -> SelectionData {
        let doc = &state.document;
        let document_selection = state.native_selection().filter(|s| s.is_attached(doc));
        let is_in_editable = document_selection.is_some();

        let (anchor, focus) = match document_selection {
            Some(selection) => {
                self.inner.borrow_mut().last_editable = Some(selection);
                (
                    editable_point(doc, selection.anchor),
                    editable_point(doc, selection.focus),
                )
            }
            None => self.fallback(doc),
        };

        SelectionData {
            document_selection,
            editable_selection: EditableSelection::new(doc, anchor, focus),
            is_in_editable,
        }
    }

    fn set_selection(
        &self,
        state: &mut EditorState,
        selection: Selection,
    ) -> PluginResult<SelectionData> {
        let doc = &state.document;
        for point in [selection.anchor, selection.focus] {
            if !doc.is_attached(point.node) {
                return Err(DomError::Detached(point.node).into());
            }
        }
        let clamped = Selection::new(
            doc.clamp_point(selection.anchor),
            doc.clamp_point(selection.focus),
        );
        tracing::trace!(anchor = %clamped.anchor, focus = %clamped.focus, "selection set");
        state.set_native_selection(Some(clamped));
        Ok(self.handle_selection_change(state))
    }

    fn handle_selection_change(&self, state: &mut EditorState) -> SelectionData {
        let data = self.get_selection_data(state);
        dispatch(state, SELECTION_CHANGE_HANDLERS, |handler, state| {
            handler(state, &data)
        });
        state.emit(EditorEvent::SelectionChanged);
        data
    }

    fn preserve_selection(&self, state: &EditorState) -> Cursors {
        let data = self.get_selection_data(state);
        let selection = data
            .document_selection
            .unwrap_or_else(|| data.editable_selection.selection());
        Cursors {
            tracker: self.clone(),
            anchor: selection.anchor,
            focus: selection.focus,
            updated: false,
        }
    }

    fn targeted_nodes(&self, state: &EditorState) -> Vec<NodeId> {
        let doc = &state.document;
        let editable = self.get_selection_data(state).editable_selection;
        if editable.is_collapsed {
            return vec![editable.focus.node];
        }
        let nodes = doc.nodes_in_range(editable.start, editable.end);
        if nodes.is_empty() {
            vec![editable.focus.node]
        } else {
            nodes
        }
    }

    fn targeted_blocks(&self, state: &EditorState) -> Vec<NodeId> {
        let doc = &state.document;
        let mut blocks = Vec::new();
        for node in self.targeted_nodes(state) {
            if !doc.children(node).is_empty() {
                continue;
            }
            let block = doc.closest_block(node);
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
        if blocks.is_empty() {
            let focus = self.get_selection_data(state).editable_selection.focus;
            blocks.push(doc.closest_block(focus.node));
        }
        blocks
    }
}

/// A selection snapshot that survives a mutation.
///
/// Without any call to one of the remapping methods, [`Cursors::restore`]
/// leaves the current selection alone.
pub struct Cursors {
    tracker: SelectionTracker,
    anchor: Point,
    focus: Point,
    updated: bool,
}

impl Cursors {
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn focus(&self) -> Point {
        self.focus
    }

    /// Applies `remap` to both points.
    pub fn update(&mut self, remap: impl Fn(&mut Point)) -> &mut Self {
        remap(&mut self.anchor);
        remap(&mut self.focus);
        self.updated = true;
        self
    }

    /// Points on `from` move to the same offset on `to`.
    pub fn remap_node(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.update(|point| {
            if point.node == from {
                point.node = to;
            }
        })
    }

    /// Points on `node` move to `offset`.
    pub fn set_offset(&mut self, node: NodeId, offset: usize) -> &mut Self {
        self.update(|point| {
            if point.node == node {
                point.offset = offset;
            }
        })
    }

    /// Points on `node` at or after `from` move by `delta`.
    ///
    /// A negative delta never carries a point below `from + delta`.
    pub fn shift_offset(&mut self, node: NodeId, from: usize, delta: isize) -> &mut Self {
        self.update(|point| {
            if point.node == node && point.offset >= from {
                let floor = from.saturating_add_signed(delta);
                point.offset = point.offset.saturating_add_signed(delta).max(floor);
            }
        })
    }

    /// Sets the native selection to the remapped points.
    ///
    /// Returns false when nothing was restored: either no remapping was
    /// registered, or the selection could not be set. Points on detached
    /// nodes collapse to the start of the editable root.
    pub fn restore(self, state: &mut EditorState) -> bool {
        if !self.updated {
            tracing::trace!("restore without update leaves the selection untouched");
            return false;
        }
        let doc = &state.document;
        let selection = if doc.is_attached(self.anchor.node) && doc.is_attached(self.focus.node) {
            Selection::new(self.anchor, self.focus)
        } else {
            tracing::debug!(
                anchor = %self.anchor,
                focus = %self.focus,
                "cursor node detached, falling back to the start of the editable root"
            );
            Selection::collapsed(doc.deepest_point(Point::new(doc.root(), 0)))
        };
        match self.tracker.set_selection(state, selection) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(%err, "failed to restore selection");
                false
            }
        }
    }
}

/// Runs `f` with a selection snapshot and restores it afterwards.
///
/// The restore happens whether `f` succeeds, fails or panics. A panic is
/// resumed after the restore.
pub fn preserving_selection<R>(
    selection: &dyn SelectionApi,
    state: &mut EditorState,
    f: impl FnOnce(&mut EditorState, &mut Cursors) -> PluginResult<R>,
) -> PluginResult<R> {
    let mut cursors = selection.preserve_selection(state);
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(state, &mut cursors)));
    cursors.restore(state);
    match result {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Plugin exposing a [`SelectionTracker`] as `dyn SelectionApi`.
pub struct SelectionPlugin {
    tracker: SelectionTracker,
}

impl SelectionPlugin {
    pub const ID: &'static str = "selection";

    /// Descriptor for the `selection` plugin.
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |_| {
            Ok(Box::new(SelectionPlugin {
                tracker: SelectionTracker::new(),
            }) as Box<dyn Plugin>)
        })
        .shares::<dyn SelectionApi>()
    }
}

impl Plugin for SelectionPlugin {
    fn capabilities(&self) -> Capabilities {
        Capabilities::new().provide::<dyn SelectionApi>(Rc::new(self.tracker.clone()))
    }

    fn destroy(&mut self, _state: &mut EditorState) {
        self.tracker.inner.borrow_mut().last_editable = None;
    }
}
