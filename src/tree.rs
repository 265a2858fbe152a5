use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::alphabet::Alphabet;
use crate::decoration::Decoration;
use crate::error::{StoreError, TreeError};
use crate::node::{Node, NodeId, Span};
use crate::store::{StringStore, TokenIndex};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a tree, used to keep a builder from wandering between trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

/// A generalized suffix tree: the node arena, the root and the strings whose
/// suffixes it indexes.
///
/// Nodes are only ever added; a [`NodeId`] stays valid for the lifetime of
/// the tree that handed it out. The public queries check handles and report
/// one this tree never handed out as `None` or [`TreeError::UnknownNode`].
///
/// # Examples
///
/// ```
/// use incremental_suffix_tree::{create_tree, Alphabet};
///
/// let (mut tree, mut builder) = create_tree(Alphabet::Unrestricted);
/// builder.add_string(&mut tree, "abc$").unwrap();
/// builder.add_string(&mut tree, "bc$").unwrap();
/// assert_eq!(tree.leaf_count(), 4);
/// ```
#[derive(Debug)]
pub struct Tree {
    id: TreeId,
    alphabet: Alphabet,
    store: StringStore,
    nodes: Vec<Node>,
    node_count: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(Alphabet::Unrestricted)
    }
}

impl Tree {
    #[must_use]
    pub fn new(alphabet: Alphabet) -> Self {
        let id = TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed));
        debug!("created tree {:?} with alphabet {:?}", id, alphabet.tag());
        Self {
            id,
            alphabet,
            store: StringStore::new(),
            nodes: vec![Node::internal(Span::default(), None, None)],
            node_count: 1,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn store(&self) -> &StringStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut StringStore {
        &mut self.store
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn checked(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode(id.index()))
    }

    /// Node lookup for handles this crate produced itself.
    pub(crate) fn at(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId::from_index(self.nodes.len() - 1)
    }

    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn truncate_nodes(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Number of nodes, the root included, as of the last completed insertion.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub(crate) fn bump_node_count(&mut self, delta: usize) {
        self.node_count += delta;
    }

    pub fn substring(&self, offset: usize, length: usize) -> Result<String, StoreError> {
        self.store.substring(offset, length)
    }

    pub fn substring_to_end(&self, offset: usize) -> Result<String, StoreError> {
        self.store.substring_to_end(offset)
    }

    pub fn start_offset(&self, token: TokenIndex) -> Result<usize, StoreError> {
        self.store.start_offset(token)
    }

    pub fn token_index_at(&self, offset: usize) -> Result<TokenIndex, StoreError> {
        self.store.token_index_at(offset)
    }

    /// Text on the edge leading into `id`. Empty for the root.
    pub fn edge_label(&self, id: NodeId) -> Result<String, TreeError> {
        let span = self.checked(id)?.span();
        if span.is_empty() {
            return Ok(String::new());
        }
        Ok(self.store.substring(span.start, span.len)?)
    }

    /// First character of the edge into a non-root node.
    pub(crate) fn first_char(&self, id: NodeId) -> Result<char, StoreError> {
        self.store.char_at(self.at(id).span().start)
    }

    /// Match `pattern[pattern_pos..]` against the edge leading into `node`.
    pub fn longest_common_extension(
        &self,
        pattern: &[char],
        pattern_pos: usize,
        node: NodeId,
    ) -> Result<usize, TreeError> {
        let span = self.checked(node)?.span();
        if span.is_empty() {
            return Ok(0);
        }
        Ok(self
            .store
            .longest_common_extension(pattern, pattern_pos, span.start, span.len)?)
    }

    /// Children of `id` in sibling order (decreasing first character).
    pub fn children(&self, id: NodeId) -> Result<Children<'_>, TreeError> {
        Ok(Children {
            tree: self,
            cur: self.checked(id)?.first_child(),
        })
    }

    /// Pre-order walk of the whole tree, driven by an explicit stack.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(NodeId::ROOT, 0)],
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.depth_first()
            .filter(|visit| self.at(visit.node).is_leaf())
            .count()
    }

    pub fn decoration(&self, id: NodeId) -> Option<&Decoration> {
        self.node(id)?.decoration()
    }

    pub fn decorate<T: Any>(&mut self, id: NodeId, payload: T) -> Result<(), TreeError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(TreeError::UnknownNode(id.index()))?;
        node.decorate(payload);
        Ok(())
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    cur: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.tree.at(id).sibling();
        Some(id)
    }
}

/// A node reached by [`Tree::depth_first`], with the length of the path label
/// from the root down to the node's lower end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub node: NodeId,
    pub depth: usize,
}

pub struct DepthFirst<'a> {
    tree: &'a Tree,
    /// Pending nodes with the string depth of their parent.
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        let (id, parent_depth) = self.stack.pop()?;
        let node = self.tree.at(id);
        let depth = parent_depth + node.span().len;
        // Sibling goes under the child so the whole subtree is visited first.
        if let Some(sibling) = node.sibling() {
            self.stack.push((sibling, parent_depth));
        }
        if let Some(child) = node.first_child() {
            self.stack.push((child, depth));
        }
        Some(Visit { node: id, depth })
    }
}
