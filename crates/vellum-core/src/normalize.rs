//! Normalization of the live document and cleaning of export copies.
//!
//! Normalizing repairs the live document and its records end up in the
//! current step. Cleaning never touches the live document: it runs on a
//! detached copy, so export output can drop editor-only markup while the
//! editor keeps it.

use vellum_dom::{Document, NodeId};

use crate::registry::{ResourceKey, dispatch, isolate};
use crate::resources::{CLEAN_FOR_SAVE_HANDLERS, CLEAN_HANDLERS, CleanHandler, NORMALIZE_HANDLERS};
use crate::state::EditorState;

/// Runs every normalize handler on the subtree below `root`.
pub fn normalize(state: &mut EditorState, root: NodeId) {
    if !state.document.is_attached(root) {
        tracing::trace!(%root, "skipping normalization of a detached node");
        return;
    }
    dispatch(state, NORMALIZE_HANDLERS, |handler, state| handler(state, root));
}

/// A copy of the document with the clean handlers applied.
pub fn export_copy(state: &EditorState) -> Document {
    let mut copy = state.document.detached_copy();
    clean(state, &mut copy, CLEAN_HANDLERS);
    copy
}

/// A copy of the document prepared for persistence: the clean handlers run
/// first, then the save-only ones.
pub fn save_copy(state: &EditorState) -> Document {
    let mut copy = export_copy(state);
    clean(state, &mut copy, CLEAN_FOR_SAVE_HANDLERS);
    copy
}

fn clean(state: &EditorState, copy: &mut Document, key: ResourceKey<CleanHandler>) {
    let root = copy.root();
    for contribution in state.resources().contributions(key, state) {
        let handler = contribution.value;
        isolate(key.name(), &contribution.plugin, || handler(copy, root));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginResult;
    use crate::registry::Resources;
    use crate::resources::NormalizeHandler;
    use std::rc::Rc;

    fn ensure_paragraph() -> NormalizeHandler {
        Rc::new(|state: &mut EditorState, root: NodeId| -> PluginResult<()> {
            let doc = &mut state.document;
            if doc.children(root).is_empty() && doc.is_element(root) {
                let p = doc.create_element("p");
                let br = doc.create_element("br");
                doc.append_child(p, br)?;
                doc.append_child(root, p)?;
            }
            Ok(())
        })
    }

    fn strip(attribute: &'static str) -> CleanHandler {
        Rc::new(move |doc: &mut Document, root: NodeId| -> PluginResult<()> {
            for node in doc.descendants(root) {
                if doc.attribute(node, attribute).is_some() {
                    doc.remove_attribute(node, attribute)?;
                }
            }
            Ok(())
        })
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut state = EditorState::for_tests("");
        state
            .resources_mut()
            .register("base", Resources::new().add(NORMALIZE_HANDLERS, ensure_paragraph()));

        let root = state.document.root();
        normalize(&mut state, root);
        assert_eq!(state.document.inner_html(), "<p><br></p>");
        state.document.take_records();

        normalize(&mut state, root);
        assert!(!state.document.has_pending_records());
    }

    #[test]
    fn test_export_leaves_live_document_alone() {
        let mut state = EditorState::for_tests(r#"<p data-ui="1" data-draft="1">a</p>"#);
        state.resources_mut().register(
            "base",
            Resources::new()
                .add(CLEAN_HANDLERS, strip("data-ui"))
                .add(CLEAN_FOR_SAVE_HANDLERS, strip("data-draft")),
        );

        let exported = export_copy(&state);
        assert_eq!(exported.inner_html(), r#"<p data-draft="1">a</p>"#);

        let saved = save_copy(&state);
        assert_eq!(saved.inner_html(), "<p>a</p>");

        assert_eq!(
            state.document.inner_html(),
            r#"<p data-ui="1" data-draft="1">a</p>"#
        );
        assert!(!state.document.has_pending_records());
    }

    #[test]
    fn test_failing_clean_handler_does_not_stop_others() {
        let failing: CleanHandler = Rc::new(|_: &mut Document, _: NodeId| -> PluginResult<()> {
            Err(crate::plugin::PluginError::Failed("nope".into()))
        });
        let mut state = EditorState::for_tests(r#"<p data-ui="1">a</p>"#);
        state.resources_mut().register(
            "base",
            Resources::new()
                .add(CLEAN_HANDLERS, failing)
                .add(CLEAN_HANDLERS, strip("data-ui")),
        );
        assert_eq!(export_copy(&state).inner_html(), "<p>a</p>");
    }
}
