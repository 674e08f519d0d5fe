//! Arena-backed document tree.
//!
//! ## Why an Arena?
//!
//! Editor plugins hold on to node references across mutations: a selection
//! points at a text node, a history step remembers which element it removed.
//! Storing every node in a `Vec` and handing out `NodeId` indices means:
//! - **Stable identity**: a removed node keeps its id and can be re-inserted
//!   by undo, so selections captured before the removal stay meaningful
//! - **No reference cycles**: parent/child links are plain indices
//! - **Cheap copies**: cloning the arena clones the whole tree for export
//!
//! ## Learning: The Mutation Journal
//!
//! Every structural or content change goes through a `&mut self` method that
//! appends a [`MutationRecord`] to an internal journal, the same way a
//! browser's `MutationObserver` queues records. The history engine drains
//! the journal with [`Document::take_records`]. Code that must not be
//! captured wraps its changes in [`Document::unobserved`], an RAII guard
//! that suspends recording until it is dropped.

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut, Range};

use crate::history::MutationRecord;
use crate::{DomError, DomResult};

/// Tags treated as block-level containers.
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul",
];

/// Tags that never have children or a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Identifier of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// An element with a lowercase tag name and ordered attributes
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    /// A text node; offsets into it count characters
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
struct Journal {
    records: Vec<MutationRecord>,
    suspended: usize,
}

/// The editable document: one root element and everything below it.
///
/// Nodes created with [`Document::create_element`] or
/// [`Document::create_text`] start detached; only attached descendants of
/// the root are part of the editable content.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    journal: Journal,
}

impl Document {
    /// Creates a document with an empty editable root.
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Element {
                tag: "div".to_string(),
                attributes: vec![("contenteditable".to_string(), "true".to_string())],
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            journal: Journal::default(),
        }
    }

    /// Creates a document whose root holds the parsed `html` fragment.
    ///
    /// Parsing is not journaled: the loaded content is the baseline.
    pub fn from_html(html: &str) -> DomResult<Self> {
        let mut doc = Self::new();
        let root = doc.root;
        crate::html::parse_into(&mut doc.unobserved(), root, html)?;
        Ok(doc)
    }

    /// Returns a copy with an empty, permanently suspended journal.
    ///
    /// Used for export: cleaning the copy must never reach the live history.
    pub fn detached_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.journal = Journal {
            records: Vec::new(),
            suspended: 1,
        };
        copy
    }

    /// Returns the editable root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns true if `id` names a node of this arena.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes.get(id.index()).ok_or(DomError::NodeNotFound(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NodeNotFound(id))
    }

    // ==================== Node Creation ====================

    /// Allocates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Allocates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // ==================== Queries ====================

    /// Returns the node kind.
    pub fn kind(&self, id: NodeId) -> DomResult<&NodeKind> {
        Ok(&self.data(id)?.kind)
    }

    /// Returns the tag of an element, `None` for text or unknown nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Ok(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    /// Returns true if `id` is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    /// Returns true if `id` is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Ok(NodeKind::Text(_)))
    }

    /// Returns the data of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Ok(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns true for block-level elements.
    pub fn is_block(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|tag| BLOCK_TAGS.contains(&tag))
    }

    /// Returns the parent, if attached to one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).ok().and_then(|d| d.parent)
    }

    /// Returns the children (empty for text nodes and unknown ids).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// Returns the index of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// DOM "length": characters for text, child count for elements.
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Ok(NodeKind::Text(text)) => text.chars().count(),
            Ok(NodeKind::Element { .. }) => self.children(id).len(),
            Err(_) => 0,
        }
    }

    /// Returns true if `id` is the root or a descendant of it.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.ancestors_inclusive(id).any(|n| n == self.root)
    }

    /// Iterates `id` and then each of its ancestors.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.contains(id).then_some(id);
        std::iter::successors(start, move |&n| self.parent(n))
    }

    /// Returns true if `ancestor` contains `node` (or is it).
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_inclusive(node).any(|n| n == ancestor)
    }

    /// Returns the closest inclusive ancestor matching `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        self.ancestors_inclusive(id).find(|&n| predicate(self, n))
    }

    /// Returns the closest block ancestor, falling back to the root.
    pub fn closest_block(&self, id: NodeId) -> NodeId {
        self.closest(id, |doc, n| doc.is_block(n) || n == doc.root)
            .unwrap_or(self.root)
    }

    /// Returns true if the node sits in editable content.
    ///
    /// The nearest `contenteditable` attribute decides; the root is always
    /// editable and detached nodes never are.
    pub fn is_editable(&self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        for node in self.ancestors_inclusive(id) {
            if node == self.root {
                return true;
            }
            match self.attribute(node, "contenteditable") {
                Some("false") => return false,
                Some("true") | Some("") => return true,
                _ => {}
            }
        }
        true
    }

    /// Returns all descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Returns the deepest common inclusive ancestor of `nodes`.
    pub fn common_ancestor(&self, nodes: impl IntoIterator<Item = NodeId>) -> Option<NodeId> {
        let mut common: Option<Vec<NodeId>> = None;
        for node in nodes {
            let mut chain: Vec<NodeId> = self.ancestors_inclusive(node).collect();
            chain.reverse();
            common = Some(match common {
                None => chain,
                Some(prev) => prev
                    .into_iter()
                    .zip(chain)
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| a)
                    .collect(),
            });
        }
        common.and_then(|chain| chain.last().copied())
    }

    // ==================== Attributes ====================

    /// Returns an attribute value.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            Ok(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Returns all attributes of an element.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            Ok(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Returns one inline style property of an element.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        parse_style(self.attribute(id, "style")?)
            .into_iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v)
    }

    /// Sets (or with `None`, removes) an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> DomResult<()> {
        let data = self.data_mut(id)?;
        let NodeKind::Element { attributes, .. } = &mut data.kind else {
            return Err(DomError::NotAnElement(id));
        };
        let position = attributes.iter().position(|(n, _)| n == name);
        let old_value = position.map(|i| attributes[i].1.clone());
        if old_value.as_deref() == value {
            return Ok(());
        }
        match (position, value) {
            (Some(i), Some(v)) => attributes[i].1 = v.to_string(),
            (Some(i), None) => {
                attributes.remove(i);
            }
            (None, Some(v)) => attributes.push((name.to_string(), v.to_string())),
            (None, None) => {}
        }
        self.record(MutationRecord::Attribute {
            node: id,
            name: name.to_string(),
            old_value,
            value: value.map(str::to_string),
        });
        Ok(())
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        self.set_attribute(id, name, None)
    }

    /// Sets (or with `None`, removes) one inline style property.
    ///
    /// An emptied `style` attribute is removed entirely.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: Option<&str>) -> DomResult<()> {
        let mut declarations = self
            .attribute(id, "style")
            .map(parse_style)
            .unwrap_or_default();
        match (declarations.iter().position(|(p, _)| p == property), value) {
            (Some(i), Some(v)) => declarations[i].1 = v.to_string(),
            (Some(i), None) => {
                declarations.remove(i);
            }
            (None, Some(v)) => declarations.push((property.to_string(), v.to_string())),
            (None, None) => return Ok(()),
        }
        if declarations.is_empty() {
            self.set_attribute(id, "style", None)
        } else {
            let serialized = serialize_style(&declarations);
            self.set_attribute(id, "style", Some(&serialized))
        }
    }

    // ==================== Text ====================

    /// Replaces the data of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let data = self.data_mut(id)?;
        let NodeKind::Text(current) = &mut data.kind else {
            return Err(DomError::NotAText(id));
        };
        if current == text {
            return Ok(());
        }
        let old_value = std::mem::replace(current, text.to_string());
        self.record(MutationRecord::Characters {
            node: id,
            old_value,
            value: text.to_string(),
        });
        Ok(())
    }

    /// Inserts `text` at character `offset` of a text node.
    pub fn insert_text(&mut self, id: NodeId, offset: usize, text: &str) -> DomResult<()> {
        let current = self.text(id).ok_or(DomError::NotAText(id))?;
        let at = byte_index(current, offset).ok_or(DomError::InvalidOffset { node: id, offset })?;
        let mut updated = current.to_string();
        updated.insert_str(at, text);
        self.set_text(id, &updated)
    }

    /// Deletes the character range `range` of a text node.
    pub fn delete_text(&mut self, id: NodeId, range: Range<usize>) -> DomResult<()> {
        let current = self.text(id).ok_or(DomError::NotAText(id))?;
        let start = byte_index(current, range.start).ok_or(DomError::InvalidOffset {
            node: id,
            offset: range.start,
        })?;
        let end = byte_index(current, range.end.max(range.start)).ok_or(DomError::InvalidOffset {
            node: id,
            offset: range.end,
        })?;
        let mut updated = current.to_string();
        updated.replace_range(start..end, "");
        self.set_text(id, &updated)
    }

    // ==================== Structure ====================

    /// Inserts `child` at `index` of `parent`, moving it if already attached.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DomResult<()> {
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        self.data(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        let old_parent = self.parent(child);
        let mut target = index;
        let mut len = self.children(parent).len();
        if old_parent == Some(parent) {
            // Moving within the same parent shifts the target index
            len -= 1;
            if self.index_in_parent(child).is_some_and(|i| i < target) {
                target -= 1;
            }
        }
        // Validate before detaching so a failed move leaves the tree intact
        if target > len {
            return Err(DomError::InvalidOffset {
                node: parent,
                offset: index,
            });
        }
        if old_parent.is_some() {
            self.remove(child)?;
        }
        self.data_mut(parent)?.children.insert(target, child);
        self.data_mut(child)?.parent = Some(parent);
        self.record(MutationRecord::Insert {
            parent,
            index: target,
            node: child,
        });
        Ok(())
    }

    /// Appends `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Inserts `child` before `reference` (or last when `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let index = match reference {
            Some(reference) => {
                if self.parent(reference) != Some(parent) {
                    return Err(DomError::NotAChild { parent, child: reference });
                }
                self.index_in_parent(reference).unwrap_or(0)
            }
            None => self.children(parent).len(),
        };
        self.insert_child(parent, index, child)
    }

    /// Detaches `id` from its parent. The node keeps its subtree and id.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if id == self.root {
            return Err(DomError::RootRemoval);
        }
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        let index = self
            .index_in_parent(id)
            .ok_or(DomError::NotAChild { parent, child: id })?;
        self.data_mut(parent)?.children.remove(index);
        self.data_mut(id)?.parent = None;
        self.record(MutationRecord::Remove {
            parent,
            index,
            node: id,
        });
        Ok(())
    }

    // ==================== Journal ====================

    fn record(&mut self, record: MutationRecord) {
        if self.journal.suspended == 0 {
            tracing::trace!(?record, "mutation recorded");
            self.journal.records.push(record);
        }
    }

    /// Returns true while mutations are being journaled.
    pub fn is_observing(&self) -> bool {
        self.journal.suspended == 0
    }

    /// Returns true if records are waiting to be drained.
    pub fn has_pending_records(&self) -> bool {
        !self.journal.records.is_empty()
    }

    /// Drains the journal.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal.records)
    }

    /// Suspends journaling until the returned guard is dropped.
    ///
    /// Guards nest; recording resumes when the outermost one drops, even
    /// while unwinding.
    pub fn unobserved(&mut self) -> Unobserved<'_> {
        self.journal.suspended += 1;
        Unobserved { document: self }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`Document::unobserved`].
///
/// Derefs to the document so mutations can be made through it.
pub struct Unobserved<'a> {
    document: &'a mut Document,
}

impl Deref for Unobserved<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for Unobserved<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for Unobserved<'_> {
    fn drop(&mut self) {
        self.document.journal.suspended = self.document.journal.suspended.saturating_sub(1);
    }
}

/// Converts a character offset to a byte index (`len` maps to the end).
pub(crate) fn byte_index(text: &str, offset: usize) -> Option<usize> {
    if offset == text.chars().count() {
        return Some(text.len());
    }
    text.char_indices().nth(offset).map(|(i, _)| i)
}

/// Parses `a: b; c: d` into ordered declarations.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            let value = value.trim();
            (!property.is_empty() && !value.is_empty())
                .then(|| (property.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

fn serialize_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(p, v)| format!("{p}: {v};"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_building() {
        let mut doc = Document::new();
        let p = doc.create_element("P");
        let text = doc.create_text("Hello");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_child(p, text).unwrap();

        assert_eq!(doc.tag(p), Some("p"));
        assert_eq!(doc.parent(text), Some(p));
        assert!(doc.is_attached(text));
        assert_eq!(doc.text_content(doc.root()), "Hello");
        assert_eq!(doc.closest_block(text), p);
    }

    #[test]
    fn test_mutations_are_journaled() {
        let mut doc = Document::from_html("<p>Hello</p>").unwrap();
        assert!(!doc.has_pending_records());

        let p = doc.first_child(doc.root()).unwrap();
        let text = doc.first_child(p).unwrap();
        doc.insert_text(text, 5, " World").unwrap();
        doc.set_style(p, "text-align", Some("center")).unwrap();

        let records = doc.take_records();
        assert_eq!(records.len(), 2);
        assert!(!doc.has_pending_records());
        assert_eq!(doc.attribute(p, "style"), Some("text-align: center;"));
    }

    #[test]
    fn test_unobserved_guard_nests() {
        let mut doc = Document::from_html("<p>a</p>").unwrap();
        let p = doc.first_child(doc.root()).unwrap();
        {
            let mut outer = doc.unobserved();
            {
                let mut inner = outer.unobserved();
                inner.set_attribute(p, "class", Some("x")).unwrap();
            }
            assert!(!outer.is_observing());
            outer.set_attribute(p, "id", Some("y")).unwrap();
        }
        assert!(doc.is_observing());
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_remove_keeps_identity() {
        let mut doc = Document::from_html("<p>a</p><p>b</p>").unwrap();
        let second = doc.children(doc.root())[1];
        doc.remove(second).unwrap();
        assert!(!doc.is_attached(second));
        assert_eq!(doc.text_content(second), "b");

        doc.insert_child(doc.root(), 0, second).unwrap();
        assert_eq!(doc.index_in_parent(second), Some(0));
    }

    #[test]
    fn test_hierarchy_request_rejected() {
        let mut doc = Document::from_html("<div><p>a</p></div>").unwrap();
        let div = doc.first_child(doc.root()).unwrap();
        let p = doc.first_child(div).unwrap();
        assert!(matches!(
            doc.append_child(p, div),
            Err(DomError::HierarchyRequest { .. })
        ));
        assert!(matches!(doc.remove(doc.root()), Err(DomError::RootRemoval)));
    }

    #[test]
    fn test_move_to_invalid_index_keeps_node_attached() {
        let mut doc = Document::from_html("<p>a</p><p>b</p>").unwrap();
        doc.take_records();
        let root = doc.root();
        let first = doc.first_child(root).unwrap();

        assert!(matches!(
            doc.insert_child(root, 5, first),
            Err(DomError::InvalidOffset { offset: 5, .. })
        ));
        assert_eq!(doc.parent(first), Some(root));
        assert_eq!(doc.children(root).len(), 2);
        assert_eq!(doc.inner_html(), "<p>a</p><p>b</p>");
        assert!(!doc.has_pending_records());

        let mut other = Document::from_html("<p>a</p><div></div>").unwrap();
        let root = other.root();
        let p = other.first_child(root).unwrap();
        let div = other.children(root)[1];
        assert!(other.insert_child(div, 1, p).is_err());
        assert_eq!(other.inner_html(), "<p>a</p><div></div>");
    }

    #[test]
    fn test_style_removal_drops_attribute() {
        let mut doc = Document::from_html(r#"<p style="color: red">a</p>"#).unwrap();
        let p = doc.first_child(doc.root()).unwrap();
        assert_eq!(doc.style(p, "color").as_deref(), Some("red"));
        doc.set_style(p, "color", None).unwrap();
        assert_eq!(doc.attribute(p, "style"), None);
    }

    #[test]
    fn test_editable_islands() {
        let doc =
            Document::from_html(r#"<p>a</p><div contenteditable="false"><span>x</span></div>"#)
                .unwrap();
        let island = doc.children(doc.root())[1];
        let span = doc.first_child(island).unwrap();
        assert!(!doc.is_editable(span));
        assert!(doc.is_editable(doc.children(doc.root())[0]));
    }

    #[test]
    fn test_common_ancestor() {
        let doc = Document::from_html("<div><p>a</p><p>b</p></div>").unwrap();
        let div = doc.first_child(doc.root()).unwrap();
        let a = doc.first_child(doc.children(div)[0]).unwrap();
        let b = doc.first_child(doc.children(div)[1]).unwrap();
        assert_eq!(doc.common_ancestor([a, b]), Some(div));
        assert_eq!(doc.common_ancestor([a]), Some(a));
    }

    #[test]
    fn test_char_offsets() {
        let mut doc = Document::from_html("<p>héllo</p>").unwrap();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        doc.delete_text(text, 1..2).unwrap();
        assert_eq!(doc.text(text), Some("hllo"));
        assert!(doc.insert_text(text, 9, "x").is_err());
    }
}
