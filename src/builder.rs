//! Online insertion of whole strings into a [`Tree`].
//!
//! Each string is added with Ukkonen's phase/extension scheme, run against the
//! tree as it stands rather than an empty one. Leaves are created with their
//! final length straight away since the whole string is known up front, so
//! leaf extensions never have to be revisited. A suffix that already ends at
//! an existing leaf is merged into it as an extra coordinate.

use log::{debug, trace};

use crate::error::{InsertError, Result};
use crate::node::{Node, NodeId, Span};
use crate::store::{Stored, TokenIndex};
use crate::tree::{Tree, TreeId};

/// The current walking position.
///
/// When `edge` is set the position lies strictly inside the edge into
/// `edge.child`, `gamma.len` characters below `node`; otherwise it is exactly
/// at `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveChain {
    node: NodeId,
    edge: Option<EdgeCursor>,
}

impl ActiveChain {
    const fn at(node: NodeId) -> Self {
        Self { node, edge: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeCursor {
    child: NodeId,
    /// Sibling in front of `child`, needed to splice a new node in its place.
    left: Option<NodeId>,
}

/// Text of the string being inserted that is still owed below the active node.
///
/// Invariant: `offset + len` is the offset of the current phase character.
#[derive(Debug, Clone, Copy, Default)]
struct Gamma {
    offset: usize,
    len: usize,
}

/// Result of one extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extension {
    /// The tree changed (new leaf, split, or coordinate merge).
    Explicit,
    /// The suffix was already present; the phase is over.
    Implicit,
}

enum Branch {
    Found { child: NodeId, left: Option<NodeId> },
    /// No child starts with the character; a new one belongs right after
    /// `left`, or in front of all children when `left` is `None`.
    Missing { left: Option<NodeId> },
}

/// Prior state of a pre-existing node, replayed when an insertion fails.
#[derive(Debug)]
enum Undo {
    Sibling(NodeId, Option<NodeId>),
    FirstChild(NodeId, Option<NodeId>),
    Span(NodeId, Span),
    SuffixLink(NodeId, Option<NodeId>),
    Coordinate(NodeId),
}

/// Inserts strings into the one tree it was created for.
#[derive(Debug)]
pub struct Builder {
    tree_id: TreeId,
    chain: ActiveChain,
    /// Copy of `chain` taken before each extension.
    snapshot: ActiveChain,
    gamma: Gamma,
    last_explicit: Option<usize>,
    /// Internal node created by the previous extension, still lacking its
    /// suffix link.
    pending_link: Option<NodeId>,
    new_nodes: usize,
    /// Global offset of the string being inserted and its characters.
    start: usize,
    text: Vec<char>,
    journal: Vec<Undo>,
    /// Arena size before the current insertion; older nodes are journaled.
    watermark: usize,
}

impl Builder {
    #[must_use]
    pub fn new(tree: &Tree) -> Self {
        Self {
            tree_id: tree.id(),
            chain: ActiveChain::at(tree.root()),
            snapshot: ActiveChain::at(tree.root()),
            gamma: Gamma::default(),
            last_explicit: None,
            pending_link: None,
            new_nodes: 0,
            start: 0,
            text: Vec::new(),
            journal: Vec::new(),
            watermark: 0,
        }
    }

    /// Add every suffix of `text` to `tree` and return the string's token
    /// index.
    ///
    /// A string already in the tree is not walked again: its existing index is
    /// returned and the tree is left as it is. On error the tree is exactly as
    /// it was before the call.
    pub fn add_string(&mut self, tree: &mut Tree, text: &str) -> Result<TokenIndex> {
        if tree.id() != self.tree_id {
            return Err(InsertError::ForeignTree);
        }
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Err(InsertError::Empty);
        }
        if let Some((position, ch)) = tree.alphabet().first_violation(&chars) {
            return Err(InsertError::OutOfAlphabet { ch, position });
        }

        let stored = tree.store_mut().insert(text);
        let index = stored.index();
        if let Stored::Duplicate(_) = stored {
            debug!("token {} inserted again; tree unchanged", index);
            return Ok(index);
        }
        let start = tree.start_offset(index)?;
        self.reset(tree, start, chars);

        match self.extend_phases(tree) {
            Ok(()) => {
                tree.bump_node_count(self.new_nodes);
                self.journal.clear();
                debug!(
                    "token {}: {} chars at offset {}, {} new nodes ({} total)",
                    index,
                    self.text.len(),
                    start,
                    self.new_nodes,
                    tree.node_count()
                );
                Ok(index)
            }
            Err(err) => {
                self.rollback(tree);
                tree.store_mut().pop_last();
                debug!("token at offset {} rejected: {}", start, err);
                Err(err)
            }
        }
    }

    fn reset(&mut self, tree: &Tree, start: usize, text: Vec<char>) {
        self.chain = ActiveChain::at(tree.root());
        self.snapshot = self.chain;
        self.gamma = Gamma {
            offset: start,
            len: 0,
        };
        self.last_explicit = None;
        self.pending_link = None;
        self.new_nodes = 0;
        self.start = start;
        self.text = text;
        self.journal.clear();
        self.watermark = tree.arena_len();
    }

    fn next_suffix(&self) -> usize {
        self.last_explicit.map_or(0, |j| j + 1)
    }

    fn extend_phases(&mut self, tree: &mut Tree) -> Result<()> {
        for phase in 0..self.text.len() {
            trace!(
                "phase {} {:?}: resuming at suffix {}",
                phase,
                self.text[phase],
                self.next_suffix()
            );
            while self.next_suffix() <= phase {
                let suffix = self.next_suffix();
                self.descend(tree, suffix)?;
                self.snapshot = self.chain;
                match self.apply_extension(tree, phase, suffix)? {
                    Extension::Explicit => {
                        self.last_explicit = Some(suffix);
                        self.ascend(tree)?;
                    }
                    Extension::Implicit => {
                        self.restore_to_last_explicit(phase);
                        break;
                    }
                }
            }
            if self.pending_link.is_some() {
                return Err(InsertError::Inconsistent(
                    "phase ended with an internal node lacking its suffix link",
                ));
            }
        }
        Ok(())
    }

    /// Move from the position of the suffix just extended to that of the next
    /// shorter one.
    fn ascend(&mut self, tree: &Tree) -> Result<()> {
        self.chain.edge = None;
        if self.chain.node == tree.root() {
            if self.gamma.len > 0 {
                self.gamma.offset += 1;
                self.gamma.len -= 1;
            }
            return Ok(());
        }
        self.chain.node = tree
            .at(self.chain.node)
            .suffix_link()
            .ok_or(InsertError::Inconsistent("internal node on the walk has no suffix link"))?;
        Ok(())
    }

    /// Skip/count walk of gamma below the active node. The text is known to
    /// be present, so each edge is chosen by its first character alone.
    fn descend(&mut self, tree: &Tree, suffix: usize) -> Result<()> {
        self.chain.edge = None;
        while self.gamma.len > 0 {
            let branch = self.owed_char(self.gamma.offset);
            let (child, left) = match find_child(tree, self.chain.node, branch)? {
                Branch::Found { child, left } => (child, left),
                Branch::Missing { .. } => {
                    return Err(InsertError::Inconsistent(
                        "descend found no edge for text already in the tree",
                    ))
                }
            };
            let node = tree.at(child);
            let edge_len = node.span().len;
            if self.gamma.len < edge_len {
                self.chain.edge = Some(EdgeCursor { child, left });
                return Ok(());
            }
            if node.is_leaf() {
                // The suffix runs on past a stored suffix's end.
                return Err(InsertError::Unterminated {
                    offset: self.start + suffix,
                });
            }
            self.chain.node = child;
            self.gamma.offset += edge_len;
            self.gamma.len -= edge_len;
        }
        Ok(())
    }

    /// Make sure `text[suffix..=phase]` is in the tree.
    fn apply_extension(&mut self, tree: &mut Tree, phase: usize, suffix: usize) -> Result<Extension> {
        let ch = self.text[phase];
        let last_phase = phase + 1 == self.text.len();
        let coordinate = self.start + suffix;

        let Some(EdgeCursor { child, left }) = self.chain.edge else {
            let parent = self.chain.node;
            return match find_child(tree, parent, ch)? {
                Branch::Found { child, .. } => {
                    self.link_pending(tree, parent)?;
                    if !last_phase {
                        return Ok(Extension::Implicit);
                    }
                    let node = tree.at(child);
                    if node.is_leaf() && node.span().len == 1 {
                        self.push_coordinate(tree, child, coordinate)?;
                        return Ok(Extension::Explicit);
                    }
                    Err(InsertError::Unterminated { offset: coordinate })
                }
                Branch::Missing { left } => {
                    let leaf = self.new_leaf(tree, phase, coordinate);
                    self.insert_child(tree, parent, left, leaf)?;
                    self.link_pending(tree, parent)?;
                    Ok(Extension::Explicit)
                }
            };
        };

        let depth = self.gamma.len;
        let span = tree.at(child).span();
        let next = tree.store().char_at(span.start + depth)?;
        if next == ch {
            if self.pending_link.is_some() {
                return Err(InsertError::Inconsistent(
                    "suffix link target falls inside an edge",
                ));
            }
            if !last_phase {
                return Ok(Extension::Implicit);
            }
            if tree.at(child).is_leaf() && span.start + depth + 1 == span.end() {
                self.push_coordinate(tree, child, coordinate)?;
                return Ok(Extension::Explicit);
            }
            return Err(InsertError::Unterminated { offset: coordinate });
        }

        // Split the edge at the mismatch: the fork takes over the upper part
        // and the child's place among its siblings.
        let sibling = tree.at(child).sibling();
        let fork = self.new_node(tree, Node::internal(Span::new(span.start, depth), sibling, None));
        self.set_span(tree, child, Span::new(span.start + depth, span.len - depth));
        let leaf = self.new_leaf(tree, phase, coordinate);
        if next > ch {
            self.set_first_child(tree, fork, Some(child))?;
            self.set_sibling(tree, child, Some(leaf));
        } else {
            self.set_first_child(tree, fork, Some(leaf))?;
            self.set_sibling(tree, leaf, Some(child));
            self.set_sibling(tree, child, None);
        }
        match left {
            Some(left) => self.set_sibling(tree, left, Some(fork)),
            None => self.set_first_child(tree, self.chain.node, Some(fork))?,
        }
        self.link_pending(tree, fork)?;
        self.pending_link = Some(fork);
        Ok(Extension::Explicit)
    }

    /// The phase ended on a match: resume from the pre-extension position,
    /// with gamma now covering the matched character too.
    fn restore_to_last_explicit(&mut self, phase: usize) {
        self.chain = self.snapshot;
        self.gamma.len += 1;
        self.gamma.offset = self.start + phase + 1 - self.gamma.len;
    }

    fn owed_char(&self, offset: usize) -> char {
        self.text[offset - self.start]
    }

    fn link_pending(&mut self, tree: &mut Tree, target: NodeId) -> Result<()> {
        let Some(pending) = self.pending_link.take() else {
            return Ok(());
        };
        if tree.at(pending).suffix_link().is_some() {
            return Err(InsertError::Inconsistent("suffix link assigned twice"));
        }
        if !tree.node_mut(pending).set_suffix_link(Some(target)) {
            return Err(InsertError::Inconsistent("suffix link on a leaf"));
        }
        self.record(pending, Undo::SuffixLink(pending, None));
        Ok(())
    }

    fn new_node(&mut self, tree: &mut Tree, node: Node) -> NodeId {
        self.new_nodes += 1;
        tree.push_node(node)
    }

    fn new_leaf(&mut self, tree: &mut Tree, phase: usize, coordinate: usize) -> NodeId {
        let span = Span::new(self.start + phase, self.text.len() - phase);
        self.new_node(tree, Node::leaf(span, coordinate))
    }

    /// Splice `new` into `parent`'s children right after `left`.
    fn insert_child(
        &mut self,
        tree: &mut Tree,
        parent: NodeId,
        left: Option<NodeId>,
        new: NodeId,
    ) -> Result<()> {
        match left {
            Some(left) => {
                let after = tree.at(left).sibling();
                self.set_sibling(tree, new, after);
                self.set_sibling(tree, left, Some(new));
            }
            None => {
                let first = tree.at(parent).first_child();
                self.set_sibling(tree, new, first);
                self.set_first_child(tree, parent, Some(new))?;
            }
        }
        Ok(())
    }

    fn record(&mut self, id: NodeId, undo: Undo) {
        if id.index() < self.watermark {
            self.journal.push(undo);
        }
    }

    fn set_sibling(&mut self, tree: &mut Tree, id: NodeId, sibling: Option<NodeId>) {
        let prior = tree.at(id).sibling();
        tree.node_mut(id).set_sibling(sibling);
        self.record(id, Undo::Sibling(id, prior));
    }

    fn set_first_child(&mut self, tree: &mut Tree, id: NodeId, child: Option<NodeId>) -> Result<()> {
        let prior = tree.at(id).first_child();
        if !tree.node_mut(id).set_first_child(child) {
            return Err(InsertError::Inconsistent("attempted to give a leaf a child"));
        }
        self.record(id, Undo::FirstChild(id, prior));
        Ok(())
    }

    fn set_span(&mut self, tree: &mut Tree, id: NodeId, span: Span) {
        let prior = tree.at(id).span();
        tree.node_mut(id).set_span(span);
        self.record(id, Undo::Span(id, prior));
    }

    fn push_coordinate(&mut self, tree: &mut Tree, leaf: NodeId, coordinate: usize) -> Result<()> {
        if !tree.node_mut(leaf).push_coordinate(coordinate) {
            return Err(InsertError::Inconsistent("coordinate added to an internal node"));
        }
        self.record(leaf, Undo::Coordinate(leaf));
        Ok(())
    }

    /// Put every pre-existing node back the way it was and drop the new ones.
    fn rollback(&mut self, tree: &mut Tree) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Sibling(id, prior) => tree.node_mut(id).set_sibling(prior),
                Undo::FirstChild(id, prior) => {
                    tree.node_mut(id).set_first_child(prior);
                }
                Undo::Span(id, prior) => tree.node_mut(id).set_span(prior),
                Undo::SuffixLink(id, prior) => {
                    tree.node_mut(id).set_suffix_link(prior);
                }
                Undo::Coordinate(id) => tree.node_mut(id).pop_coordinate(),
            }
        }
        tree.truncate_nodes(self.watermark);
        self.pending_link = None;
    }
}

/// Scan `parent`'s children, ordered by decreasing first character, for the
/// one starting with `ch`.
fn find_child(tree: &Tree, parent: NodeId, ch: char) -> Result<Branch> {
    let mut left = None;
    let mut cur = tree.at(parent).first_child();
    while let Some(id) = cur {
        let first = tree.first_char(id)?;
        if first == ch {
            return Ok(Branch::Found { child: id, left });
        }
        if first < ch {
            break;
        }
        left = Some(id);
        cur = tree.at(id).sibling();
    }
    Ok(Branch::Missing { left })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::create_tree;

    /// Shape of every reachable node: handle, edge, sibling, first child,
    /// suffix link and coordinates.
    type Shape = Vec<(NodeId, Span, Option<NodeId>, Option<NodeId>, Option<NodeId>, Vec<usize>)>;

    fn shape(tree: &Tree) -> Shape {
        tree.depth_first()
            .map(|visit| {
                let node = tree.at(visit.node);
                (
                    visit.node,
                    node.span(),
                    node.sibling(),
                    node.first_child(),
                    node.suffix_link(),
                    node.coordinates().collect(),
                )
            })
            .collect()
    }

    fn internal_nodes(tree: &Tree) -> Vec<NodeId> {
        tree.depth_first()
            .map(|visit| visit.node)
            .filter(|&id| id != tree.root() && !tree.at(id).is_leaf())
            .collect()
    }

    fn root_child(tree: &Tree, label: &str) -> NodeId {
        tree.children(tree.root())
            .unwrap()
            .find(|&c| tree.edge_label(c).unwrap() == label)
            .unwrap()
    }

    fn assert_aborted(tree: &mut Tree, builder: &mut Builder, text: &str, expected: &'static str) {
        let arena = tree.arena_len();
        let nodes = tree.node_count();
        let tokens = tree.store().len();
        let total = tree.store().total_length();
        let before = shape(tree);

        let err = builder.add_string(tree, text).unwrap_err();
        assert!(err.is_internal(), "{:?}", err);
        assert_eq!(err, InsertError::Inconsistent(expected));
        assert_eq!(tree.arena_len(), arena);
        assert_eq!(tree.node_count(), nodes);
        assert_eq!(tree.store().len(), tokens);
        assert_eq!(tree.store().total_length(), total);
        assert_eq!(shape(tree), before);
    }

    #[test]
    fn missing_suffix_link_aborts_insertion() {
        let (mut tree, mut builder) = create_tree(Alphabet::Unrestricted);
        builder.add_string(&mut tree, "abab$").unwrap();
        let internal = internal_nodes(&tree);
        assert_eq!(internal.len(), 2);
        for id in internal {
            assert!(tree.node_mut(id).set_suffix_link(None));
        }

        // The last phase splits "ab$" below "ab" and then has to follow the
        // link out of "ab".
        assert_aborted(
            &mut tree,
            &mut builder,
            "xabab#",
            "internal node on the walk has no suffix link",
        );
    }

    #[test]
    fn suffix_link_into_a_leaf_aborts_descend() {
        let (mut tree, mut builder) = create_tree(Alphabet::Unrestricted);
        builder.add_string(&mut tree, "abab$").unwrap();
        let ab = root_child(&tree, "ab");
        let dollar = root_child(&tree, "$");
        assert!(tree.node_mut(ab).set_suffix_link(Some(dollar)));

        // After the link "ab" is still owed below a node with no children.
        assert_aborted(
            &mut tree,
            &mut builder,
            "xabab#",
            "descend found no edge for text already in the tree",
        );
    }

    #[test]
    fn builder_recovers_after_abort() {
        let (mut tree, mut builder) = create_tree(Alphabet::Unrestricted);
        builder.add_string(&mut tree, "abab$").unwrap();
        let ab = root_child(&tree, "ab");
        let b = root_child(&tree, "b");
        tree.node_mut(ab).set_suffix_link(None);
        assert!(builder.add_string(&mut tree, "xabab#").is_err());

        tree.node_mut(ab).set_suffix_link(Some(b));
        assert_eq!(builder.add_string(&mut tree, "xabab#"), Ok(1));
        assert_eq!(tree.start_offset(1), Ok(5));
        assert_eq!(tree.leaf_count(), 11);
    }
}
