//! # Vellum DOM
//!
//! The document model the editing engine works on: an arena of element and
//! text nodes below a single editable root.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Ownership & Borrowing
//! - `Document` owns every node; callers only ever hold `NodeId` indices
//! - Queries take `&self`, mutations take `&mut self` and are journaled
//! - `Document::unobserved()` returns a guard that borrows the document
//!   mutably and restores journaling when it goes out of scope
//!
//! ### Memory Safety
//! - Removed nodes stay in the arena, so stale ids never dangle; they are
//!   simply detached, which `Document::is_attached` reports

mod document;
mod history;
mod html;
mod selection;

pub use document::{BLOCK_TAGS, Document, NodeId, NodeKind, Unobserved, VOID_TAGS, parse_style};
pub use history::{MutationRecord, Step, StepId, StepStack};
pub use html::{inner_html, outer_html, parse_into};
pub use selection::{Direction, Point, Selection};

/// The zero-width no-break space used as a cursor anchor.
pub const MARKER_CHAR: char = '\u{feff}';

/// Result type for document operations
pub type DomResult<T> = Result<T, DomError>;

/// Errors that can occur during document operations
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("Node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotAText(NodeId),

    #[error("Offset {offset} is out of bounds for node {node}")]
    InvalidOffset { node: NodeId, offset: usize },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Cannot insert {child} into its own descendant {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {0} is detached")]
    Detached(NodeId),

    #[error("The editable root cannot be removed")]
    RootRemoval,

    #[error("HTML parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.root()), Some("div"));
        assert!(doc.children(doc.root()).is_empty());
        assert!(doc.is_editable(doc.root()));
    }

    #[test]
    fn test_document_from_html() {
        let doc = Document::from_html("<p>Hello, World!</p>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "Hello, World!");
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_undo_redo_through_step() {
        let mut doc = Document::from_html("<p>Hello</p>").unwrap();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        doc.insert_text(text, 5, " World").unwrap();

        let mut step = Step::new(None);
        for record in doc.take_records() {
            step.push(record);
        }

        step.revert(&mut doc.unobserved()).unwrap();
        assert_eq!(doc.inner_html(), "<p>Hello</p>");

        step.replay(&mut doc.unobserved()).unwrap();
        assert_eq!(doc.inner_html(), "<p>Hello World</p>");
    }

    #[test]
    fn test_detached_copy_is_not_journaled() {
        let doc = Document::from_html("<p>a</p>").unwrap();
        let mut copy = doc.detached_copy();
        let p = copy.first_child(copy.root()).unwrap();
        copy.set_attribute(p, "class", Some("x")).unwrap();
        assert!(!copy.has_pending_records());
        assert_eq!(doc.attribute(p, "class"), None);
    }
}
