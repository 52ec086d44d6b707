#![expect(
    unsafe_code,
    reason = "the checker walks raw node links, read-only, under the tree's own borrow",
)]

use thiserror::Error;

use crate::node::{Color, TreeNode};
use crate::tree::RedBlackTree;


/// A violated red-black structural property, reported by [`RedBlackTree::check`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureError {
    #[error("the root is red")]
    RedRoot,
    #[error("a red node has a red child")]
    RedRedEdge,
    #[error("root-to-leaf paths disagree on their black depth")]
    UnevenBlackHeight,
    #[error("a child's parent link does not point back at its parent")]
    MismatchedParentLink,
}

impl<T, C> RedBlackTree<T, C> {
    /// Validate the structural invariants: a black root, no red node with a red child,
    /// the same number of black nodes on every root-to-leaf path, and parent links that
    /// agree with the child links. Value order is deliberately not checked — the
    /// positional insertions are allowed to ignore it.
    ///
    /// An empty tree is valid. Never panics.
    pub fn check(&self) -> Result<(), StructureError> {
        let Some(root) = self.root else {
            return Ok(());
        };

        // SAFETY: the root and everything reachable from it are live, and holding
        // `&self` keeps the tree un-rewired for the duration of the walk.
        unsafe {
            if root.color() == Color::Red {
                return Err(StructureError::RedRoot);
            }
            if root.parent().is_some() {
                return Err(StructureError::MismatchedParentLink);
            }
            black_height(root).map(|_| ())
        }
    }

    /// The boolean form of [`RedBlackTree::check`].
    #[inline]
    #[must_use]
    pub fn verify(&self) -> bool {
        self.check().is_ok()
    }
}

/// Check the subtree under `node` and return its black height (the node itself
/// included, absent children counted as black height 0).
///
/// # Safety
/// `node` must be live with live descendants.
unsafe fn black_height<T>(node: TreeNode<T>) -> Result<usize, StructureError> {
    // SAFETY: links of live, consistent nodes are live; recursion depth is the tree
    // height, O(log n) whenever the properties this function verifies actually hold,
    // and at worst the length of the longest parent-consistent chain.
    unsafe {
        let mut heights = [0_usize; 2];

        for (side, child) in [node.left(), node.right()].into_iter().enumerate() {
            if let Some(child) = child {
                if child.parent() != Some(node) {
                    return Err(StructureError::MismatchedParentLink);
                }
                if node.color() == Color::Red && child.color() == Color::Red {
                    return Err(StructureError::RedRedEdge);
                }
                heights[side] = black_height(child)?;
            }
        }

        if heights[0] != heights[1] {
            return Err(StructureError::UnevenBlackHeight);
        }

        Ok(heights[0] + usize::from(node.color() == Color::Black))
    }
}
