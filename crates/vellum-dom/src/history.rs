//! Mutation records and the undo/redo step stack.
//!
//! ## Learning: The Command Pattern
//!
//! Each journaled change is stored as a record that can be:
//! - Applied (replayed on the document)
//! - Inverted (swapped into the change that undoes it)
//!
//! A [`Step`] groups the records of one semantically complete action, and
//! [`StepStack`] keeps the committed steps plus the undone ones.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::document::{Document, NodeId};
use crate::selection::Selection;
use crate::{DomError, DomResult};

/// One observed change to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationRecord {
    /// Text node data changed
    Characters {
        node: NodeId,
        old_value: String,
        value: String,
    },
    /// An attribute was added, changed or removed (`None` = absent)
    Attribute {
        node: NodeId,
        name: String,
        old_value: Option<String>,
        value: Option<String>,
    },
    /// `node` was inserted at `index` of `parent`
    Insert {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
    /// `node` was removed from `index` of `parent`
    Remove {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },
}

impl MutationRecord {
    /// The node whose subtree the change is visible in.
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::Characters { node, .. } | MutationRecord::Attribute { node, .. } => {
                *node
            }
            MutationRecord::Insert { parent, .. } | MutationRecord::Remove { parent, .. } => {
                *parent
            }
        }
    }

    /// Returns the record that reverses this one.
    pub fn inverse(&self) -> Self {
        match self.clone() {
            MutationRecord::Characters {
                node,
                old_value,
                value,
            } => MutationRecord::Characters {
                node,
                old_value: value,
                value: old_value,
            },
            MutationRecord::Attribute {
                node,
                name,
                old_value,
                value,
            } => MutationRecord::Attribute {
                node,
                name,
                old_value: value,
                value: old_value,
            },
            MutationRecord::Insert {
                parent,
                index,
                node,
            } => MutationRecord::Remove {
                parent,
                index,
                node,
            },
            MutationRecord::Remove {
                parent,
                index,
                node,
            } => MutationRecord::Insert {
                parent,
                index,
                node,
            },
        }
    }

    /// Replays this record on `doc`.
    ///
    /// Goes through the regular mutation API, so callers that must not be
    /// journaled wrap the document in [`Document::unobserved`] first.
    pub fn apply(&self, doc: &mut Document) -> DomResult<()> {
        match self {
            MutationRecord::Characters { node, value, .. } => doc.set_text(*node, value),
            MutationRecord::Attribute {
                node, name, value, ..
            } => doc.set_attribute(*node, name, value.as_deref()),
            MutationRecord::Insert {
                parent,
                index,
                node,
            } => doc.insert_child(*parent, *index, *node),
            MutationRecord::Remove { parent, node, .. } => {
                if doc.parent(*node) != Some(*parent) {
                    return Err(DomError::NotAChild {
                        parent: *parent,
                        child: *node,
                    });
                }
                doc.remove(*node)
            }
        }
    }

    /// Returns true if `other` can be folded into this record.
    ///
    /// Consecutive changes to the same text node or the same attribute
    /// collapse into one record spanning both.
    pub fn can_coalesce(&self, other: &MutationRecord) -> bool {
        match (self, other) {
            (
                MutationRecord::Characters { node: a, value, .. },
                MutationRecord::Characters {
                    node: b, old_value, ..
                },
            ) => a == b && value == old_value,
            (
                MutationRecord::Attribute {
                    node: a,
                    name: n1,
                    value,
                    ..
                },
                MutationRecord::Attribute {
                    node: b,
                    name: n2,
                    old_value,
                    ..
                },
            ) => a == b && n1 == n2 && value == old_value,
            _ => false,
        }
    }

    /// Folds `other` into this record (see [`Self::can_coalesce`]).
    pub fn coalesce(&mut self, other: MutationRecord) {
        match (self, other) {
            (
                MutationRecord::Characters { value, .. },
                MutationRecord::Characters { value: next, .. },
            ) => *value = next,
            (
                MutationRecord::Attribute { value, .. },
                MutationRecord::Attribute { value: next, .. },
            ) => *value = next,
            _ => {}
        }
    }

    /// Returns true if applying the record changes nothing.
    pub fn is_noop(&self) -> bool {
        match self {
            MutationRecord::Characters {
                old_value, value, ..
            } => old_value == value,
            MutationRecord::Attribute {
                old_value, value, ..
            } => old_value == value,
            _ => false,
        }
    }
}

/// Identifier of a history step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(uuid::Uuid);

impl StepId {
    /// Creates a new unique step id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One undoable unit: records plus the selections around them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier
    pub id: StepId,
    /// Records in application order
    pub records: Vec<MutationRecord>,
    /// Selection before the first record (restored by undo)
    pub selection_before: Option<Selection>,
    /// Selection when the step was committed (restored by redo)
    pub selection_after: Option<Selection>,
}

impl Step {
    /// Creates an empty step.
    pub fn new(selection_before: Option<Selection>) -> Self {
        Self {
            id: StepId::new(),
            records: Vec::new(),
            selection_before,
            selection_after: None,
        }
    }

    /// Adds a record, coalescing with the previous one when possible.
    pub fn push(&mut self, record: MutationRecord) {
        if let Some(last) = self.records.last_mut() {
            if last.can_coalesce(&record) {
                last.coalesce(record);
                // A change that was immediately reverted leaves nothing behind
                if last.is_noop() {
                    self.records.pop();
                }
                return;
            }
        }
        if !record.is_noop() {
            self.records.push(record);
        }
    }

    /// Returns true if the step carries no change.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reverts the records on `doc`, last first.
    ///
    /// All or nothing: on failure the reverted suffix is replayed again.
    pub fn revert(&self, doc: &mut Document) -> DomResult<()> {
        apply_all(self.records.iter().rev().map(MutationRecord::inverse), doc)
    }

    /// Replays the records on `doc`, first first.
    ///
    /// All or nothing: on failure the replayed prefix is reverted.
    pub fn replay(&self, doc: &mut Document) -> DomResult<()> {
        apply_all(self.records.iter().cloned(), doc)
    }
}

/// Applies `records` in order, undoing the applied ones if one fails.
fn apply_all(
    records: impl Iterator<Item = MutationRecord>,
    doc: &mut Document,
) -> DomResult<()> {
    let mut applied: Vec<MutationRecord> = Vec::new();
    for record in records {
        if let Err(err) = record.apply(doc) {
            tracing::debug!(?record, %err, rolled_back = applied.len(), "step application failed");
            for done in applied.iter().rev() {
                if let Err(rollback) = done.inverse().apply(doc) {
                    tracing::warn!(record = ?done, %rollback, "could not roll back record");
                }
            }
            return Err(err);
        }
        applied.push(record);
    }
    Ok(())
}

/// Committed and undone steps.
///
/// ## Learning: VecDeque
///
/// The undo side is a `VecDeque` because it grows at the back and, once it
/// exceeds its capacity, drops its oldest entry from the front. The redo
/// side only ever grows and shrinks at the back, so a `Vec` is enough.
#[derive(Debug, Clone)]
pub struct StepStack {
    /// Committed steps, oldest first
    undo_stack: VecDeque<Step>,
    /// Undone steps, most recently undone last
    redo_stack: Vec<Step>,
    /// Maximum number of committed steps kept (0 = unbounded)
    max_size: usize,
}

impl StepStack {
    /// Creates a stack keeping at most `max_size` committed steps.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Commits a new step. Clears the redo stack.
    pub fn push(&mut self, step: Step) {
        // Branching history is not supported
        self.redo_stack.clear();
        self.push_undo(step);
    }

    /// Puts a redone step back without touching the redo stack.
    pub fn push_undo(&mut self, step: Step) {
        self.undo_stack.push_back(step);
        while self.max_size > 0 && self.undo_stack.len() > self.max_size {
            if let Some(evicted) = self.undo_stack.pop_front() {
                tracing::trace!(step = %evicted.id, "evicted oldest history step");
            }
        }
    }

    /// Takes the most recent committed step.
    pub fn pop_undo(&mut self) -> Option<Step> {
        self.undo_stack.pop_back()
    }

    /// Records an undone step.
    pub fn push_redo(&mut self, step: Step) {
        self.redo_stack.push(step);
    }

    /// Takes the most recently undone step.
    pub fn pop_redo(&mut self) -> Option<Step> {
        self.redo_stack.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drops all steps.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_record_inverse() {
        let id = Document::new().root();
        let insert = MutationRecord::Insert {
            parent: id,
            index: 0,
            node: id,
        };
        assert!(matches!(insert.inverse(), MutationRecord::Remove { index: 0, .. }));
    }

    #[test]
    fn test_step_revert_and_replay() {
        let mut doc = Document::from_html("<p>Hello</p>").unwrap();
        let p = doc.first_child(doc.root()).unwrap();
        let text = doc.first_child(p).unwrap();

        doc.insert_text(text, 5, "!").unwrap();
        let extra = doc.create_element("p");
        doc.append_child(doc.root(), extra).unwrap();
        doc.set_attribute(p, "class", Some("lead")).unwrap();

        let mut step = Step::new(None);
        for record in doc.take_records() {
            step.push(record);
        }
        let after = doc.inner_html();

        step.revert(&mut doc.unobserved()).unwrap();
        assert_eq!(doc.inner_html(), "<p>Hello</p>");
        step.replay(&mut doc.unobserved()).unwrap();
        assert_eq!(doc.inner_html(), after);
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_failed_replay_leaves_document_untouched() {
        let mut doc = Document::from_html("<p>Hello</p>").unwrap();
        let p = doc.first_child(doc.root()).unwrap();
        let text = doc.first_child(p).unwrap();

        let mut step = Step::new(None);
        step.push(MutationRecord::Characters {
            node: text,
            old_value: "Hello".into(),
            value: "Changed".into(),
        });
        // A text node cannot be a parent
        step.push(MutationRecord::Remove {
            parent: text,
            index: 0,
            node: p,
        });

        assert!(step.replay(&mut doc).is_err());
        assert_eq!(doc.inner_html(), "<p>Hello</p>");

        // Reverting runs the other way round: the text is restored first
        let mut reversed = Step::new(None);
        for record in step.records.iter().rev() {
            reversed.push(record.clone());
        }
        doc.set_text(text, "Changed").unwrap();
        assert!(reversed.revert(&mut doc).is_err());
        assert_eq!(doc.text(text), Some("Changed"));
    }

    #[test]
    fn test_coalescing_typing() {
        let mut doc = Document::from_html("<p>a</p>").unwrap();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        doc.insert_text(text, 1, "b").unwrap();
        doc.insert_text(text, 2, "c").unwrap();

        let mut step = Step::new(None);
        for record in doc.take_records() {
            step.push(record);
        }
        assert_eq!(step.records.len(), 1);
        assert!(matches!(
            &step.records[0],
            MutationRecord::Characters { old_value, value, .. } if old_value == "a" && value == "abc"
        ));
    }

    #[test]
    fn test_reverted_change_leaves_empty_step() {
        let mut doc = Document::from_html("<p>a</p>").unwrap();
        let p = doc.first_child(doc.root()).unwrap();
        doc.set_attribute(p, "class", Some("x")).unwrap();
        doc.set_attribute(p, "class", None).unwrap();

        let mut step = Step::new(None);
        for record in doc.take_records() {
            step.push(record);
        }
        assert!(step.is_empty());
    }

    #[test]
    fn test_stack_bounds_and_redo_invalidation() {
        let mut stack = StepStack::new(2);
        for _ in 0..3 {
            stack.push(Step::new(None));
        }
        assert_eq!(stack.undo_count(), 2);

        let step = stack.pop_undo().unwrap();
        stack.push_redo(step);
        assert!(stack.can_redo());

        stack.push(Step::new(None));
        assert!(!stack.can_redo());
    }

    proptest! {
        #[test]
        fn prop_revert_restores_html(ops in proptest::collection::vec((0usize..4, 0usize..8, "[a-z]{0,3}"), 1..12)) {
            let mut doc = Document::from_html("<p>one</p><p>two</p>").unwrap();
            let before = doc.inner_html();

            for (kind, at, text) in ops {
                let blocks = doc.children(doc.root()).to_vec();
                let block = blocks[at % blocks.len()];
                match kind {
                    0 => {
                        if let Some(t) = doc.first_child(block).filter(|&n| doc.is_text(n)) {
                            let len = doc.node_length(t);
                            doc.insert_text(t, at.min(len), &text).unwrap();
                        }
                    }
                    1 => {
                        let p = doc.create_element("p");
                        let t = doc.create_text(&text);
                        doc.append_child(p, t).unwrap();
                        doc.insert_child(doc.root(), at % (blocks.len() + 1), p).unwrap();
                    }
                    2 if blocks.len() > 1 => doc.remove(block).unwrap(),
                    _ => doc.set_style(block, "text-align", Some("center")).unwrap(),
                }
            }

            let mut step = Step::new(None);
            for record in doc.take_records() {
                step.push(record);
            }
            step.revert(&mut doc.unobserved()).unwrap();
            prop_assert_eq!(doc.inner_html(), before);
        }
    }
}
