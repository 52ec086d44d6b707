//! A red-black tree with parent links and stable node handles.
//!
//! [`RedBlackTree`] keeps an ordered multiset under a caller-supplied [`Comparator`]
//! ([`insort`]/[`binary_search`]), and additionally supports *positional* insertion
//! ([`append`]/[`insert_after`]) that places a node at an explicit in-order position
//! without comparing values. Deletion takes the [`TreeNode`] handle returned at insert
//! time; [`check`] and [`verify`] validate the red-black structural invariants. Nodes
//! live in header blocks from [`moored_core`].
//!
//! [`insort`]: RedBlackTree::insort
//! [`binary_search`]: RedBlackTree::binary_search
//! [`append`]: RedBlackTree::append
//! [`insert_after`]: RedBlackTree::insert_after
//! [`check`]: RedBlackTree::check
//! [`verify`]: RedBlackTree::verify

mod check;
mod node;
mod tree;


pub use self::check::StructureError;
pub use self::node::TreeNode;
pub use self::tree::{Iter, RedBlackTree};

pub use moored_core::{Comparator, OrdComparator};
