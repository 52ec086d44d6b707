#![expect(
    unsafe_code,
    reason = "tree nodes are raw block addresses; every accessor states its liveness contract",
)]

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};

use moored_core::RawBlock;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Heap record of one tree node. Lives in a zero-element header block so that identity,
/// initialization, and teardown go through the same primitive as the skip-list nodes.
pub(crate) struct RbNode<T> {
    pub parent: Option<TreeNode<T>>,
    pub left:   Option<TreeNode<T>>,
    pub right:  Option<TreeNode<T>>,
    pub color:  Color,
    pub value:  T,
}


/// A stable identity handle to one tree node.
///
/// Returned by the insertion operations and valid until the same node is deleted (or the
/// tree is cleared or dropped). Copying the handle never copies the node; two handles
/// compare equal iff they address the same node, and rebalancing never moves a node, so
/// handles survive arbitrary unrelated inserts and deletes.
///
/// All reads and writes go through the owning tree, which anchors borrows and states the
/// liveness contract.
pub struct TreeNode<T>(RawBlock<RbNode<T>, ()>);

impl<T> Clone for TreeNode<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TreeNode<T> {}

impl<T> PartialEq for TreeNode<T> {
    /// Identity equality, inherited from the underlying block.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for TreeNode<T> {}

impl<T> Hash for TreeNode<T> {
    /// Identity hash, consistent with the identity equality.
    #[inline]
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.0.hash(state);
    }
}

impl<T> Debug for TreeNode<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("TreeNode").field(&self.0.base()).finish()
    }
}

impl<T> TreeNode<T> {
    /// Allocate a detached node: no children, the given parent, the given color.
    #[must_use]
    pub(crate) fn allocate(value: T, color: Color, parent: Option<Self>) -> Self {
        let block = RawBlock::allocate(0);
        // SAFETY: freshly allocated, so the header slot is uninitialized.
        unsafe {
            block.initialize_header(RbNode {
                parent,
                left: None,
                right: None,
                color,
                value,
            });
        }
        Self(block)
    }

    #[inline]
    fn record(self) -> *mut RbNode<T> {
        self.0.header_ptr()
    }

    // Field reads. Each requires the node to be live (allocated and not yet destroyed);
    // the record was initialized at allocation and is only mutated through these setters.

    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn parent(self) -> Option<Self> {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).parent }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn left(self) -> Option<Self> {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).left }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn right(self) -> Option<Self> {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).right }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn color(self) -> Color {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).color }
    }

    /// Raw pointer to the node's value; valid to dereference while the node is live.
    ///
    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn value_ptr(self) -> *mut T {
        // SAFETY: projecting a field of the initialized record.
        unsafe { &raw mut (*self.record()).value }
    }

    // Field writes, under the same liveness contract as the reads.

    /// # Safety
    /// The node must be live.
    #[inline]
    pub(crate) unsafe fn set_parent(self, parent: Option<Self>) {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).parent = parent }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    pub(crate) unsafe fn set_left(self, left: Option<Self>) {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).left = left }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    pub(crate) unsafe fn set_right(self, right: Option<Self>) {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).right = right }
    }

    /// # Safety
    /// The node must be live.
    #[inline]
    pub(crate) unsafe fn set_color(self, color: Color) {
        // SAFETY: live per the contract.
        unsafe { (*self.record()).color = color }
    }

    /// Move the value out of a detached node.
    ///
    /// # Safety
    /// The node must be live and unreachable from any tree; only
    /// [`TreeNode::deallocate`] may touch it afterwards.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn take_value(self) -> T {
        // SAFETY: the record is initialized; the caller promises not to read it again.
        // The link fields and color are trivial, so moving out only the value leaks
        // nothing.
        unsafe { self.0.take_header().value }
    }

    /// Drop the value in place and free the node block.
    ///
    /// # Safety
    /// Same as [`TreeNode::take_value`]; the handle (and every copy of it) is dead
    /// afterwards.
    pub(crate) unsafe fn destroy(self) {
        // SAFETY: record initialized, block live, nothing uses the handle afterwards.
        unsafe {
            self.0.deinitialize_header();
            self.0.deallocate();
        }
    }

    /// Free the node block without touching the (already moved-out) record.
    ///
    /// # Safety
    /// Same as [`TreeNode::destroy`], except the record must already be moved-from.
    #[inline]
    pub(crate) unsafe fn deallocate(self) {
        // SAFETY: forwarded contract.
        unsafe { self.0.deallocate() }
    }
}


/// Null-safe color test: an absent child is black.
///
/// # Safety
/// If present, the node must be live.
#[inline]
#[must_use]
pub(crate) unsafe fn is_red<T>(node: Option<TreeNode<T>>) -> bool {
    // SAFETY: live per the contract.
    node.is_some_and(|node| unsafe { node.color() } == Color::Red)
}
