use std::any::Any;

use mediumvec::Vec32;

use crate::decoration::Decoration;

/// Handle of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// An edge label as a range of the global offset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// What distinguishes the two node kinds.
#[derive(Debug)]
pub enum NodeKind {
    Internal {
        first_child: Option<NodeId>,
        suffix_link: Option<NodeId>,
    },
    /// Coordinates are kept in insertion order and read back newest first.
    Leaf { coordinates: Vec32<usize> },
}

/// A node of the tree. The edge leading into it, its right sibling and its
/// decoration chain are shared by both kinds.
#[derive(Debug)]
pub struct Node {
    span: Span,
    sibling: Option<NodeId>,
    decoration: Option<Box<Decoration>>,
    kind: NodeKind,
}

impl Node {
    pub(crate) fn internal(span: Span, sibling: Option<NodeId>, first_child: Option<NodeId>) -> Self {
        Self {
            span,
            sibling,
            decoration: None,
            kind: NodeKind::Internal {
                first_child,
                suffix_link: None,
            },
        }
    }

    pub(crate) fn leaf(span: Span, coordinate: usize) -> Self {
        let mut coordinates = Vec32::new();
        coordinates.push(coordinate);
        Self {
            span,
            sibling: None,
            decoration: None,
            kind: NodeKind::Leaf { coordinates },
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn sibling(&self) -> Option<NodeId> {
        self.sibling
    }

    pub(crate) fn set_sibling(&mut self, sibling: Option<NodeId>) {
        self.sibling = sibling;
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// `None` for leaves and for a childless root.
    pub fn first_child(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Internal { first_child, .. } => first_child,
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Returns false on a leaf, which cannot have children.
    pub(crate) fn set_first_child(&mut self, child: Option<NodeId>) -> bool {
        match &mut self.kind {
            NodeKind::Internal { first_child, .. } => {
                *first_child = child;
                true
            }
            NodeKind::Leaf { .. } => false,
        }
    }

    pub fn suffix_link(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Internal { suffix_link, .. } => suffix_link,
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Set or clear the link; rollback is the only caller that clears.
    pub(crate) fn set_suffix_link(&mut self, link: Option<NodeId>) -> bool {
        match &mut self.kind {
            NodeKind::Internal { suffix_link, .. } => {
                *suffix_link = link;
                true
            }
            NodeKind::Leaf { .. } => false,
        }
    }

    /// Suffix start offsets ending at this leaf, most recent first. Empty for
    /// internal nodes.
    pub fn coordinates(&self) -> impl Iterator<Item = usize> + '_ {
        let coordinates: &[usize] = match &self.kind {
            NodeKind::Leaf { coordinates } => &**coordinates,
            NodeKind::Internal { .. } => &[],
        };
        coordinates.iter().rev().copied()
    }

    pub(crate) fn push_coordinate(&mut self, coordinate: usize) -> bool {
        match &mut self.kind {
            NodeKind::Leaf { coordinates } => {
                coordinates.push(coordinate);
                true
            }
            NodeKind::Internal { .. } => false,
        }
    }

    pub(crate) fn pop_coordinate(&mut self) {
        if let NodeKind::Leaf { coordinates } = &mut self.kind {
            coordinates.pop();
        }
    }

    pub fn decoration(&self) -> Option<&Decoration> {
        self.decoration.as_deref()
    }

    /// Attach a payload in front of the existing chain.
    pub fn decorate<T: Any>(&mut self, payload: T) {
        let head = self.decoration.take();
        self.decoration = Some(Box::new(Decoration::new(payload)).push_onto(head));
    }
}
