#![expect(
    unsafe_code,
    reason = "the head vector is itself a header block; its level slots follow the same \
              initialize-before-read discipline as node links",
)]

use std::fmt::{Debug, Formatter, Result as FmtResult};

use moored_core::RawBlock;
use tracing::{Level as LogLevel, event};

use crate::node::LevelLinks;


/// Starting capacity of every head vector.
const INITIAL_CAPACITY: usize = 8;


/// The list's entry points into the per-level rings.
///
/// Stored as a header block whose element array holds one [`LevelLinks`] per level and
/// whose header slot is repurposed to carry the current level count `L`. Slots at levels
/// `L..capacity` are uninitialized or stale and must never be read; growth rewrites a slot
/// before the level count rises past it.
///
/// Capacity grows geometrically by `cap + cap/2 + 8`, applied until the requested height
/// fits; the in-use prefix is move-initialized into the new block and the old one freed.
/// Capacity never shrinks — only the level count does.
pub(crate) struct HeadVector<T> {
    block: RawBlock<usize, LevelLinks<T>>,
}

impl<T> HeadVector<T> {
    #[must_use]
    pub(crate) fn new() -> Self {
        let block = RawBlock::allocate(INITIAL_CAPACITY);
        // SAFETY: freshly allocated; the level count starts at zero, claiming no slots.
        unsafe {
            block.initialize_header(0_usize);
        }
        Self { block }
    }

    /// The current level count `L`.
    #[inline]
    #[must_use]
    pub(crate) fn level_count(&self) -> usize {
        // SAFETY: the header was initialized in `new` and is only rewritten whole.
        unsafe { self.block.read_header() }
    }

    /// Set the level count. Raising it is only valid once every newly claimed slot has
    /// been written.
    #[inline]
    pub(crate) fn set_level_count(&mut self, level_count: usize) {
        debug_assert!(level_count <= self.block.capacity());

        // SAFETY: plain store over an initialized `usize` header.
        unsafe {
            self.block.write_header(level_count);
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Entry links of `level`.
    ///
    /// # Safety
    /// `level` must be below the current level count.
    #[inline]
    #[must_use]
    pub(crate) unsafe fn links(&self, level: usize) -> LevelLinks<T> {
        debug_assert!(level < self.level_count(), "head read beyond the live levels");

        // SAFETY: slots below the level count are initialized, per the growth discipline.
        unsafe { self.block.element(level) }
    }

    /// Write the entry links of `level`. Doubles as the slot's initialization during
    /// growth, which is why the bound is the capacity rather than the level count.
    ///
    /// # Safety
    /// `level` must be below the capacity, and if it is at or above the current level
    /// count, the level count must be raised before anything reads the slot.
    #[inline]
    pub(crate) unsafe fn set_links(&mut self, level: usize, links: LevelLinks<T>) {
        // SAFETY: in-capacity write of a trivial record.
        unsafe { self.block.set_element(level, links) }
    }

    /// Make room for `needed` levels, reallocating with the geometric growth formula if
    /// the current block is too small. The level count is not changed.
    pub(crate) fn reserve(&mut self, needed: usize) {
        let old_capacity = self.block.capacity();
        if needed <= old_capacity {
            return;
        }

        let mut capacity = old_capacity;
        while capacity < needed {
            capacity = capacity + capacity / 2 + 8;
        }

        let level_count = self.level_count();
        let new_block = RawBlock::allocate(capacity);
        // SAFETY: the new block is fresh and larger; the old block's header and first
        // `level_count` slots are initialized, and the old block is freed without being
        // read again.
        unsafe {
            new_block.move_initialize_header(self.block);
            new_block.move_initialize_elements(self.block, level_count);
            self.block.deallocate();
        }
        self.block = new_block;

        event!(LogLevel::DEBUG, old_capacity, capacity, "head vector grown");
    }
}

impl<T> Drop for HeadVector<T> {
    fn drop(&mut self) {
        // SAFETY: the header is a plain `usize` and the link slots are trivial, so
        // releasing the memory is the whole teardown.
        unsafe {
            self.block.deallocate();
        }
    }
}

impl<T> Debug for HeadVector<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("HeadVector")
            .field("level_count", &self.level_count())
            .field("capacity", &self.capacity())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use crate::node::SkipNode;

    use super::*;


    #[test]
    fn starts_empty_with_initial_capacity() {
        let head = HeadVector::<u32>::new();

        assert_eq!(head.level_count(), 0);
        assert_eq!(head.capacity(), INITIAL_CAPACITY);
    }

    #[test]
    fn growth_follows_the_formula() {
        let mut head = HeadVector::<u32>::new();

        head.reserve(8);
        assert_eq!(head.capacity(), 8);

        head.reserve(9);
        // 8 + 8/2 + 8
        assert_eq!(head.capacity(), 20);

        head.reserve(21);
        // 20 + 20/2 + 8
        assert_eq!(head.capacity(), 38);

        // A single insert can demand a capacity more than one growth step away.
        let mut head = HeadVector::<u32>::new();
        head.reserve(33);
        assert_eq!(head.capacity(), 38);
    }

    #[test]
    fn reserve_preserves_live_links() {
        let mut head = HeadVector::<u32>::new();
        let node = SkipNode::allocate(1_u32, 3);

        // SAFETY: writes stay below capacity, the level count is raised after them, and
        // reads stay below the level count. The node outlives every read of its address.
        unsafe {
            for level in 0..3 {
                head.set_links(level, LevelLinks { prev: node, next: node });
            }
            head.set_level_count(3);

            head.reserve(30);
            assert!(head.capacity() >= 30);
            assert_eq!(head.level_count(), 3);

            for level in 0..3 {
                assert_eq!(head.links(level).next, node);
                assert_eq!(head.links(level).prev, node);
            }

            node.destroy();
        }
    }
}
