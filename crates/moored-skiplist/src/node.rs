#![expect(
    unsafe_code,
    reason = "node handles are raw block addresses; every access states its liveness contract",
)]

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};

use moored_core::RawBlock;


/// Header of a node block: the element value and the height the node was sampled with.
///
/// The height doubles as the block's element capacity, so a handle alone is enough to
/// recover the full block layout.
pub(crate) struct NodeHeader<T> {
    pub value:  T,
    pub height: usize,
}

/// One level's link record: the cyclic neighbors of a node at that level.
///
/// Trivial by construction (two raw addresses), as the element type of a header block
/// must be.
pub(crate) struct LevelLinks<T> {
    pub prev: SkipNode<T>,
    pub next: SkipNode<T>,
}

impl<T> Clone for LevelLinks<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LevelLinks<T> {}

impl<T> Debug for LevelLinks<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("LevelLinks")
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}


/// A stable identity handle to one skip-list node.
///
/// Returned by insertion and valid until the same node is deleted (or the list is cleared
/// or dropped). Copying the handle never copies the node, and two handles compare equal
/// iff they address the same node. Insertion and deletion of *other* nodes never
/// invalidate a handle.
///
/// A handle by itself exposes nothing: all reads and writes go through the owning list,
/// which anchors borrows and states the liveness contract.
pub struct SkipNode<T>(RawBlock<NodeHeader<T>, LevelLinks<T>>);

impl<T> Clone for SkipNode<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SkipNode<T> {}

impl<T> PartialEq for SkipNode<T> {
    /// Identity equality, inherited from the underlying block.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for SkipNode<T> {}

impl<T> Hash for SkipNode<T> {
    /// Identity hash, consistent with the identity equality.
    #[inline]
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.0.hash(state);
    }
}

impl<T> Debug for SkipNode<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("SkipNode").field(&self.0.base()).finish()
    }
}

impl<T> SkipNode<T> {
    /// Allocate a node block of `height` link levels and initialize its header.
    ///
    /// The link slots are left uninitialized; splicing writes each level exactly once
    /// before anything reads it.
    #[must_use]
    pub(crate) fn allocate(value: T, height: usize) -> Self {
        debug_assert!(height > 0, "a node participates in at least level 0");

        let block = RawBlock::allocate(height);
        // SAFETY: freshly allocated, so the header slot is uninitialized.
        unsafe {
            block.initialize_header(NodeHeader { value, height });
        }
        Self(block)
    }

    /// # Safety
    /// The node must be live (inserted and not yet deleted).
    #[inline]
    #[must_use]
    pub(crate) unsafe fn height(self) -> usize {
        // SAFETY: the header was initialized at allocation and stays valid while live.
        unsafe { (*self.0.header_ptr()).height }
    }

    /// Raw pointer to the node's value; valid to dereference while the node is live.
    ///
    /// # Safety
    /// The node must be live.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn value_ptr(self) -> *mut T {
        // SAFETY: projecting a field of the initialized header.
        unsafe { &raw mut (*self.0.header_ptr()).value }
    }

    /// # Safety
    /// The node must be live and spliced at `level` (i.e. `level < height` and the level's
    /// link slot already written).
    #[inline]
    #[must_use]
    pub(crate) unsafe fn links(self, level: usize) -> LevelLinks<T> {
        // SAFETY: in-range and initialized per the contract.
        unsafe { self.0.element(level) }
    }

    /// Write the whole link record for `level`. Doubles as the level's initialization.
    ///
    /// # Safety
    /// The node must be live and `level < height`.
    #[inline]
    pub(crate) unsafe fn set_links(self, level: usize, links: LevelLinks<T>) {
        // SAFETY: in-range per the contract; links are trivial, so overwrite is fine.
        unsafe { self.0.set_element(level, links) }
    }

    /// # Safety
    /// Same as [`SkipNode::links`].
    #[inline]
    pub(crate) unsafe fn set_next(self, level: usize, next: Self) {
        // SAFETY: read-modify-write of an initialized link record.
        unsafe {
            let links = self.links(level);
            self.set_links(level, LevelLinks { next, ..links });
        }
    }

    /// # Safety
    /// Same as [`SkipNode::links`].
    #[inline]
    pub(crate) unsafe fn set_prev(self, level: usize, prev: Self) {
        // SAFETY: read-modify-write of an initialized link record.
        unsafe {
            let links = self.links(level);
            self.set_links(level, LevelLinks { prev, ..links });
        }
    }

    /// Move the value out of a fully unlinked node.
    ///
    /// # Safety
    /// The node must be live and already unlinked from every ring; only
    /// [`SkipNode::deallocate`] may touch it afterwards.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn take_value(self) -> T {
        // SAFETY: the header is initialized; the caller promises not to read it again.
        unsafe { self.0.take_header().value }
    }

    /// Drop the value in place and free the node block.
    ///
    /// # Safety
    /// Same as [`SkipNode::take_value`]; the handle (and every copy of it) is dead
    /// afterwards.
    pub(crate) unsafe fn destroy(self) {
        // SAFETY: header initialized, block live, nothing uses the handle afterwards.
        unsafe {
            self.0.deinitialize_header();
            self.0.deallocate();
        }
    }

    /// Free the node block without touching the (already moved-out) header.
    ///
    /// # Safety
    /// Same as [`SkipNode::destroy`], except the header slot must already be
    /// deinitialized or moved-from.
    #[inline]
    pub(crate) unsafe fn deallocate(self) {
        // SAFETY: forwarded contract.
        unsafe { self.0.deallocate() }
    }
}
