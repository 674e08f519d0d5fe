//! Marker characters.
//!
//! An empty inline element such as `<b></b>` has no position a cursor can
//! sit in. Normalization puts a U+FEFF marker in it, and takes markers back
//! out of any text node that has visible content again. Markers never reach
//! saved content.
//!
//! Removing a character moves every later offset in its node, so the
//! removal goes through [`Cursors`](vellum_core::Cursors): a cursor right
//! after a marker stays right before the next visible character.

use std::iter;
use std::rc::Rc;

use vellum_core::resources::{
    CLEAN_FOR_SAVE_HANDLERS, CleanHandler, NORMALIZE_HANDLERS, NormalizeHandler,
};
use vellum_core::{
    EditorState, Plugin, PluginDescriptor, PluginResult, Resources, SelectionApi,
    SelectionPlugin, preserving_selection,
};
use vellum_dom::{Document, MARKER_CHAR, NodeId, Point, VOID_TAGS};

/// Returns true if `text` has a character other than the marker.
fn has_visible(text: &str) -> bool {
    text.chars().any(|c| c != MARKER_CHAR)
}

/// An editable inline element a cursor cannot reach.
fn needs_marker(doc: &Document, node: NodeId) -> bool {
    node != doc.root()
        && doc
            .tag(node)
            .is_some_and(|tag| !VOID_TAGS.contains(&tag))
        && !doc.is_block(node)
        && doc.children(node).is_empty()
        && doc.is_editable(node)
}

/// A text node whose markers are no longer needed.
fn has_stale_marker(doc: &Document, node: NodeId) -> bool {
    doc.text(node)
        .is_some_and(|text| text.contains(MARKER_CHAR) && has_visible(text))
        && doc.is_editable(node)
}

fn strip_markers(text: &str) -> String {
    text.chars().filter(|&c| c != MARKER_CHAR).collect()
}

/// Plugin maintaining marker characters.
pub struct MarkerPlugin {
    selection: Rc<dyn SelectionApi>,
}

impl MarkerPlugin {
    pub const ID: &'static str = "marker";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            Ok(Box::new(MarkerPlugin {
                selection: ctx.dependency::<dyn SelectionApi>()?,
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
    }
}

fn normalize_markers(
    selection: &dyn SelectionApi,
    state: &mut EditorState,
    root: NodeId,
) -> PluginResult<()> {
    let doc = &state.document;
    let scope: Vec<NodeId> = iter::once(root).chain(doc.descendants(root)).collect();
    let empty: Vec<NodeId> = scope.iter().copied().filter(|&n| needs_marker(doc, n)).collect();
    let stale: Vec<NodeId> = scope
        .iter()
        .copied()
        .filter(|&n| has_stale_marker(doc, n))
        .collect();
    if empty.is_empty() && stale.is_empty() {
        return Ok(());
    }
    tracing::trace!(filled = empty.len(), cleaned = stale.len(), "normalizing markers");

    preserving_selection(selection, state, |state, cursors| {
        for element in empty {
            let marker = state.document.create_text(&MARKER_CHAR.to_string());
            state.document.append_child(element, marker)?;
            cursors.update(|point| {
                if point.node == element {
                    *point = Point::new(marker, 1);
                }
            });
        }

        for node in stale {
            let text = state.document.text(node).unwrap_or_default().to_string();
            let markers: Vec<usize> = text
                .chars()
                .enumerate()
                .filter(|&(_, c)| c == MARKER_CHAR)
                .map(|(i, _)| i)
                .collect();
            state.document.set_text(node, &strip_markers(&text))?;
            for &index in markers.iter().rev() {
                cursors.shift_offset(node, index + 1, -1);
            }
        }
        Ok(())
    })
}

fn clean_markers(doc: &mut Document, root: NodeId) -> PluginResult<()> {
    for node in doc.descendants(root) {
        let Some(text) = doc.text(node) else {
            continue;
        };
        if text.contains(MARKER_CHAR) {
            let cleaned = strip_markers(text);
            doc.set_text(node, &cleaned)?;
        }
    }
    Ok(())
}

impl Plugin for MarkerPlugin {
    fn resources(&self) -> Resources {
        let selection = Rc::clone(&self.selection);
        let normalize: NormalizeHandler =
            Rc::new(move |state: &mut EditorState, root: NodeId| -> PluginResult<()> {
                normalize_markers(&*selection, state, root)
            });
        let clean: CleanHandler = Rc::new(clean_markers);

        Resources::new()
            .add(NORMALIZE_HANDLERS, normalize)
            .add(CLEAN_FOR_SAVE_HANDLERS, clean)
    }
}
