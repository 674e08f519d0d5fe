//! Boundary points and selections.
//!
//! ## Learning: DOM Boundary Points
//!
//! A position in a tree is a `(node, offset)` pair. In a text node the
//! offset counts characters; in an element it counts children, so
//! `(p, 1)` means "between the first and second child of `p`". Ordering
//! two points requires walking the tree, which is why comparisons live on
//! [`Document`] rather than on `Point` itself.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::document::{Document, NodeId};

/// A boundary point in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub node: NodeId,
    pub offset: usize,
}

impl Point {
    /// Creates a new point.
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.offset)
    }
}

/// Whether the focus comes after the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Focus at or after the anchor
    Forward,
    /// Focus before the anchor
    Backward,
}

/// An anchor/focus pair, like the browser's native selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started
    pub anchor: Point,
    /// Where the selection currently ends (the caret)
    pub focus: Point,
}

impl Selection {
    /// Creates a selection from two points.
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Creates a collapsed selection (a caret).
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    /// Returns true if anchor and focus coincide.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Returns the direction of the selection.
    pub fn direction(&self, doc: &Document) -> Direction {
        match doc.compare_points(self.anchor, self.focus) {
            Some(Ordering::Greater) => Direction::Backward,
            _ => Direction::Forward,
        }
    }

    /// Returns the earlier point.
    pub fn start(&self, doc: &Document) -> Point {
        match self.direction(doc) {
            Direction::Forward => self.anchor,
            Direction::Backward => self.focus,
        }
    }

    /// Returns the later point.
    pub fn end(&self, doc: &Document) -> Point {
        match self.direction(doc) {
            Direction::Forward => self.focus,
            Direction::Backward => self.anchor,
        }
    }

    /// Returns true if both points reference attached nodes.
    pub fn is_attached(&self, doc: &Document) -> bool {
        doc.is_attached(self.anchor.node) && doc.is_attached(self.focus.node)
    }
}

impl Document {
    /// Index path from the root to `node`, or `None` when detached.
    fn path(&self, node: NodeId) -> Option<Vec<usize>> {
        if !self.is_attached(node) {
            return None;
        }
        let mut path: Vec<usize> = self
            .ancestors_inclusive(node)
            .take_while(|&n| n != self.root())
            .filter_map(|n| self.index_in_parent(n))
            .collect();
        path.reverse();
        Some(path)
    }

    /// Compares two boundary points in document order.
    ///
    /// Returns `None` if either point is detached.
    pub fn compare_points(&self, a: Point, b: Point) -> Option<Ordering> {
        let mut pa = self.path(a.node)?;
        let mut pb = self.path(b.node)?;
        pa.push(a.offset);
        pb.push(b.offset);
        // A strict prefix sorts first: "before child k" precedes "inside child k"
        Some(pa.cmp(&pb))
    }

    /// Clamps a point's offset to its node length.
    pub fn clamp_point(&self, point: Point) -> Point {
        Point::new(point.node, point.offset.min(self.node_length(point.node)))
    }

    /// Point just before `node` in its parent.
    pub fn point_before(&self, node: NodeId) -> Option<Point> {
        Some(Point::new(self.parent(node)?, self.index_in_parent(node)?))
    }

    /// Point just after `node` in its parent.
    pub fn point_after(&self, node: NodeId) -> Option<Point> {
        Some(Point::new(self.parent(node)?, self.index_in_parent(node)? + 1))
    }

    /// Descends a point into the deepest leaf position it designates.
    ///
    /// `(p, 0)` over `<p>Hello</p>` becomes `(text, 0)`; `(p, 1)` becomes
    /// `(text, 5)`. Void elements are not entered.
    pub fn deepest_point(&self, point: Point) -> Point {
        let mut current = self.clamp_point(point);
        loop {
            if !self.is_element(current.node) || self.children(current.node).is_empty() {
                return current;
            }
            let children = self.children(current.node);
            let (child, at_end) = match children.get(current.offset) {
                Some(&child) => (child, false),
                None => (children[children.len() - 1], true),
            };
            let enterable = self.is_text(child)
                || (self.is_element(child) && !self.children(child).is_empty());
            if !enterable {
                return current;
            }
            let offset = if at_end { self.node_length(child) } else { 0 };
            current = Point::new(child, offset);
        }
    }

    /// Returns the attached nodes a range `start..end` touches, in order.
    ///
    /// A node is touched when its extent intersects the range; a collapsed
    /// range touches the nodes containing it.
    pub fn nodes_in_range(&self, start: Point, end: Point) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&node| {
                let (Some(before), Some(after)) = (self.point_before(node), self.point_after(node))
                else {
                    return false;
                };
                let starts_before_end = self
                    .compare_points(before, end)
                    .is_some_and(|o| o == Ordering::Less);
                let ends_after_start = self
                    .compare_points(after, start)
                    .is_some_and(|o| o == Ordering::Greater);
                starts_before_end && ends_after_start
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let doc = Document::from_html("<p>Hello</p><p>World</p>").unwrap();
        let p1 = doc.children(doc.root())[0];
        let p2 = doc.children(doc.root())[1];
        let text = doc.first_child(p1).unwrap();
        (doc, p1, p2, text)
    }

    #[test]
    fn test_point_ordering() {
        let (doc, p1, p2, text) = sample();
        assert_eq!(
            doc.compare_points(Point::new(text, 1), Point::new(text, 3)),
            Some(Ordering::Less)
        );
        // Before the text node vs inside it
        assert_eq!(
            doc.compare_points(Point::new(p1, 0), Point::new(text, 0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            doc.compare_points(Point::new(p1, 1), Point::new(text, 5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            doc.compare_points(Point::new(p2, 0), Point::new(text, 5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_direction() {
        let (doc, _, _, text) = sample();
        let backward = Selection::new(Point::new(text, 4), Point::new(text, 1));
        assert_eq!(backward.direction(&doc), Direction::Backward);
        assert_eq!(backward.start(&doc), Point::new(text, 1));
        assert!(!backward.is_collapsed());
    }

    #[test]
    fn test_deepest_point() {
        let (doc, p1, _, text) = sample();
        assert_eq!(doc.deepest_point(Point::new(p1, 0)), Point::new(text, 0));
        assert_eq!(doc.deepest_point(Point::new(p1, 1)), Point::new(text, 5));
        assert_eq!(doc.deepest_point(Point::new(doc.root(), 0)), Point::new(text, 0));
    }

    #[test]
    fn test_nodes_in_range() {
        let (doc, p1, p2, text) = sample();
        let other = doc.first_child(p2).unwrap();
        let collapsed = doc.nodes_in_range(Point::new(text, 2), Point::new(text, 2));
        assert_eq!(collapsed, vec![p1, text]);

        let spanning = doc.nodes_in_range(Point::new(text, 2), Point::new(other, 1));
        assert_eq!(spanning, vec![p1, text, p2, other]);
    }

    #[test]
    fn test_detached_points_do_not_compare() {
        let (mut doc, p1, _, text) = sample();
        doc.remove(p1).unwrap();
        assert!(doc.compare_points(Point::new(text, 0), Point::new(doc.root(), 0)).is_none());
    }
}
