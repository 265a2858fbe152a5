//! A generalized suffix tree built online with Ukkonen's algorithm.
//!
//! Strings are added one at a time to a single tree. Every suffix of every
//! string ends at a leaf; a suffix text occurring in several strings shares
//! one leaf carrying one coordinate (global start offset) per occurrence.
//! Strings are expected to end with a terminator that occurs nowhere else,
//! e.g. `$`; insertions that would leave a suffix without its own leaf are
//! refused and rolled back.
//!
//! ```
//! use incremental_suffix_tree::{create_tree, Alphabet};
//!
//! let (mut tree, mut builder) = create_tree(Alphabet::Unrestricted);
//! builder.add_string(&mut tree, "mississippi$").unwrap();
//! assert_eq!(tree.leaf_count(), 12);
//! ```
mod alphabet;
pub mod annotate;
mod builder;
mod decoration;
mod error;
mod node;
mod store;
mod tree;

pub use alphabet::Alphabet;
pub use builder::Builder;
pub use decoration::{Chain, Decoration};
pub use error::{InsertError, Result, StoreError, TreeError};
pub use node::{Node, NodeId, NodeKind, Span};
pub use store::{Stored, StringStore, TokenIndex};
pub use tree::{Children, DepthFirst, Tree, TreeId, Visit};

/// Create an empty tree together with the builder bound to it.
#[must_use]
pub fn create_tree(alphabet: Alphabet) -> (Tree, Builder) {
    let tree = Tree::new(alphabet);
    let builder = Builder::new(&tree);
    (tree, builder)
}
