#![expect(
    unsafe_code,
    reason = "ring splicing works on raw node addresses; each block states the liveness \
              and linking facts it relies on",
)]

use std::marker::PhantomData;

use moored_core::{Comparator, Lcg64, OrdComparator};
use tracing::{Level as LogLevel, event};

use crate::head::HeadVector;
use crate::node::{LevelLinks, SkipNode};


/// Seed of the height-sampling generator. Fixed so that identical insertion sequences
/// produce identical list shapes across runs.
const HEIGHT_SEED: u64 = 24;


/// An ordered multiset on circular per-level doubly-linked rings.
///
/// Every node participates in level 0; each higher level holds a subset of the one below
/// it, and the number of levels a node spans is sampled geometrically (`P(height = k) =
/// 2⁻ᵏ`) from a deterministic [`Lcg64`]. At each live level the participating nodes form
/// a cyclic ring entered through the head vector: `head[ℓ].next` is the smallest node at
/// that level, and the single ring edge from the largest node back to the smallest is the
/// *discontinuity* — forward search must stop there rather than wrap forever.
///
/// [`insert`] returns a [`SkipNode`] handle that stays valid until that node is passed to
/// [`delete`]; operations on other nodes never move or invalidate it. Deletion, element
/// access, and neighbor queries take a handle and are `unsafe`: passing a stale handle or
/// one from another list is undefined behavior, deliberately undetected, exactly like an
/// out-of-range subscript on the underlying block.
///
/// Dropping the list tears down every remaining node and then the head vector; [`clear`]
/// is the explicit form that leaves the list reusable.
///
/// [`insert`]: RingSkiplist::insert
/// [`delete`]: RingSkiplist::delete
/// [`clear`]: RingSkiplist::clear
pub struct RingSkiplist<T, C = OrdComparator> {
    head: HeadVector<T>,
    cmp:  C,
    prng: Lcg64,
    len:  usize,
}

impl<T, C: Default> Default for RingSkiplist<T, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T> RingSkiplist<T> {
    /// An empty list ordered by `T`'s own [`Ord`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(OrdComparator)
    }
}

impl<T, C> RingSkiplist<T, C> {
    /// An empty list ordered by `cmp`.
    #[must_use]
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            head: HeadVector::new(),
            cmp,
            prng: Lcg64::new(HEIGHT_SEED),
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The current level count `L`: the height of the tallest live node, and the length
    /// of the head vector's in-use prefix.
    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.head.level_count()
    }

    /// Handle of the smallest element, if any.
    #[must_use]
    pub fn first(&self) -> Option<SkipNode<T>> {
        if self.is_empty() {
            None
        } else {
            // SAFETY: a nonempty list has a live level 0, whose head entry is linked.
            Some(unsafe { self.head.links(0).next })
        }
    }

    /// Handle of the largest element, if any.
    #[must_use]
    pub fn last(&self) -> Option<SkipNode<T>> {
        // The largest is read through the smallest node's back link, never through
        // `head[0].prev`: deletion of a smallest node rewrites the head's back link to
        // the new smallest, and only the ring itself stays authoritative.
        let first = self.first()?;
        // SAFETY: `first` is live and spliced at level 0.
        Some(unsafe { first.links(0).prev })
    }

    /// The node's element.
    ///
    /// # Safety
    /// `node` must be a live member of this list.
    #[inline]
    #[must_use]
    pub unsafe fn value(&self, node: SkipNode<T>) -> &T {
        // SAFETY: live per the contract; the returned borrow is tied to `&self`, and
        // deleting the node would require `&mut self`.
        unsafe { &*node.value_ptr() }
    }

    /// How many levels the node participates in.
    ///
    /// # Safety
    /// `node` must be a live member of this list.
    #[inline]
    #[must_use]
    pub unsafe fn height(&self, node: SkipNode<T>) -> usize {
        // SAFETY: live per the contract.
        unsafe { node.height() }
    }

    /// The next node in level-0 order, or `None` if `node` is the largest.
    ///
    /// # Safety
    /// `node` must be a live member of this list.
    #[must_use]
    pub unsafe fn next(&self, node: SkipNode<T>) -> Option<SkipNode<T>> {
        // SAFETY: live per the contract, hence spliced at level 0; the list is nonempty.
        unsafe {
            let following = node.links(0).next;
            if following == self.head.links(0).next {
                // Crossed the discontinuity.
                None
            } else {
                Some(following)
            }
        }
    }

    /// The previous node in level-0 order, or `None` if `node` is the smallest.
    ///
    /// # Safety
    /// `node` must be a live member of this list.
    #[must_use]
    pub unsafe fn prev(&self, node: SkipNode<T>) -> Option<SkipNode<T>> {
        // SAFETY: live per the contract; the list is nonempty.
        unsafe {
            if node == self.head.links(0).next {
                None
            } else {
                Some(node.links(0).prev)
            }
        }
    }

    /// Iterate the elements in level-0 order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            cursor: self.first(),
            remaining: self.len,
            _list: PhantomData,
        }
    }

    /// Sample a height with `P(height = k) = 2⁻ᵏ`: one plus the number of trailing zero
    /// bits of the next generator iterate.
    fn random_height(&mut self) -> usize {
        self.prng.next_u64().trailing_zeros() as usize + 1
    }

    /// Claim levels `[level_count, height)` for `node`: grow the head vector if needed,
    /// self-loop both the node's and the head's links at each new level, then raise the
    /// level count.
    fn claim_levels(&mut self, height: usize, node: SkipNode<T>) {
        let level_count = self.head.level_count();
        debug_assert!(height > level_count);

        self.head.reserve(height);
        for level in level_count..height {
            // SAFETY: `node` is live with `height` link slots; the head slots are below
            // capacity after `reserve`, and the level count rises only after the loop.
            unsafe {
                node.set_links(level, LevelLinks { prev: node, next: node });
                self.head.set_links(level, LevelLinks { prev: node, next: node });
            }
        }
        self.head.set_level_count(height);

        event!(LogLevel::TRACE, level_count = height, "level count raised");
    }
}

impl<T, C: Comparator<T>> RingSkiplist<T, C> {
    /// Insert `value`, returning a stable handle to its node.
    ///
    /// The node's height is sampled internally; the node is spliced into sorted position
    /// at every level it participates in. Equal elements are kept (multiset semantics),
    /// and the handle stays valid until the node itself is deleted.
    pub fn insert(&mut self, value: T) -> SkipNode<T> {
        let height = self.random_height();
        let node = SkipNode::allocate(value, height);
        let level_count = self.head.level_count();

        if height > level_count {
            self.claim_levels(height, node);
            if level_count == 0 {
                // The sole node: every live level is already a self-loop around it.
                self.len += 1;
                return node;
            }
        }

        // Search the pre-existing levels top-down. `None` is the head pseudo-position;
        // a real cursor node participates in every level at or below the one where the
        // search reached it, so descending never invalidates it.
        let mut level = level_count.min(height) - 1;
        let mut current: Option<SkipNode<T>> = None;

        loop {
            // SAFETY: `level` is below the pre-grow level count, so the head entry and
            // every ring link at this level are initialized; `node`'s value was written
            // at allocation.
            let advanced = unsafe {
                let first = self.head.links(level).next;
                let next = match current {
                    None => first,
                    Some(cursor) => cursor.links(level).next,
                };

                // The discontinuity guard: once a non-head cursor's forward edge reaches
                // the level's smallest node again, the walk has wrapped and must stop
                // regardless of how values compare.
                let wrapped = current.is_some() && next == first;

                if !wrapped && self.cmp.less(&*next.value_ptr(), &*node.value_ptr()) {
                    current = Some(next);
                    true
                } else {
                    false
                }
            };
            if advanced {
                continue;
            }

            debug_assert!(level < height);

            // SAFETY: all four nodes touched below are live and spliced at `level`;
            // `node` has a slot for `level` since `level < height`.
            unsafe {
                match current {
                    Some(cursor) => {
                        let after = cursor.links(level).next;
                        node.set_links(level, LevelLinks { prev: cursor, next: after });
                        after.set_prev(level, node);
                        cursor.set_next(level, node);
                    }
                    None => {
                        // New smallest at this level. The back link of the old smallest
                        // is the level's true largest, which wraps to the new node.
                        let old_first = self.head.links(level).next;
                        let largest = old_first.links(level).prev;
                        node.set_links(level, LevelLinks { prev: largest, next: old_first });
                        old_first.set_prev(level, node);
                        largest.set_next(level, node);
                        self.head.set_links(level, LevelLinks { prev: node, next: node });
                    }
                }
            }

            if level == 0 {
                break;
            }
            level -= 1;
        }

        self.len += 1;
        node
    }
}

impl<T, C> RingSkiplist<T, C> {
    /// Unlink `node` from every level it participates in, shrink the level count if the
    /// tallest node vanished, free the node, and return its element.
    ///
    /// # Safety
    /// `node` must be a live member of this list. The handle (and every copy of it) is
    /// dead afterwards.
    pub unsafe fn delete(&mut self, node: SkipNode<T>) -> T {
        // SAFETY: live per the contract.
        let height = unsafe { node.height() };
        let mut level_count = self.head.level_count();
        debug_assert!(height <= level_count);

        for level in (0..height).rev() {
            // SAFETY: the node is spliced at every level below its height, and its
            // neighbors there are live.
            unsafe {
                let links = node.links(level);
                if links.next == node {
                    // Sole participant: the level dies with the node. Any node at a
                    // higher level would also be here, so the surviving maximum height
                    // is exactly this level.
                    level_count = level;
                } else {
                    links.prev.set_next(level, links.next);
                    links.next.set_prev(level, links.prev);

                    if self.head.links(level).next == node {
                        // The successor becomes the smallest. Both head links point at
                        // it; the level's largest stays reachable as `smallest.prev`.
                        self.head
                            .set_links(level, LevelLinks { prev: links.next, next: links.next });
                    }
                }
            }
        }

        if level_count < self.head.level_count() {
            self.head.set_level_count(level_count);
            event!(LogLevel::TRACE, level_count, "level count lowered");
        }
        self.len -= 1;

        // SAFETY: fully unlinked; the caller forfeits the handle.
        unsafe {
            let value = node.take_value();
            node.deallocate();
            value
        }
    }

    /// Tear down every node, leaving an empty, reusable list.
    ///
    /// Equivalent to deleting every handle, minus the per-level unlinking: the level-0
    /// ring alone reaches every node.
    pub fn clear(&mut self) {
        if self.head.level_count() == 0 {
            debug_assert_eq!(self.len, 0);
            return;
        }

        let len = self.len;

        // SAFETY: level 0 holds every node exactly once; each node's forward link is
        // read before the node is destroyed, and no handle is used after its node.
        unsafe {
            let first = self.head.links(0).next;
            let mut cursor = first;
            loop {
                let following = cursor.links(0).next;
                cursor.destroy();
                if following == first {
                    break;
                }
                cursor = following;
            }
        }

        self.head.set_level_count(0);
        self.len = 0;

        event!(LogLevel::DEBUG, len, "list cleared");
    }
}

impl<T, C> Drop for RingSkiplist<T, C> {
    fn drop(&mut self) {
        self.clear();
        // The head vector frees its own block.
    }
}

impl<T, C> std::fmt::Debug for RingSkiplist<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingSkiplist")
            .field("len", &self.len)
            .field("level_count", &self.level_count())
            .field("head_capacity", &self.head.capacity())
            .finish_non_exhaustive()
    }
}

impl<'a, T, C> IntoIterator for &'a RingSkiplist<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}


/// Level-0 in-order iterator over a [`RingSkiplist`], yielding `&T`.
#[expect(
    missing_copy_implementations,
    reason = "iterators advance; implicit copies would silently fork the walk",
)]
#[derive(Debug)]
pub struct Iter<'a, T> {
    cursor:    Option<SkipNode<T>>,
    remaining: usize,
    _list:     PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.cursor?;
        self.remaining -= 1;

        // SAFETY: the iterator borrows the list for `'a`, so no node can be deleted
        // while it exists; `remaining` stops the walk before it crosses the
        // discontinuity back to the smallest node.
        unsafe {
            self.cursor = Some(node.links(0).next);
            Some(&*node.value_ptr())
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            cursor:    self.cursor,
            remaining: self.remaining,
            _list:     PhantomData,
        }
    }
}


#[cfg(test)]
mod tests {
    use moored_core::Lcg64;

    use super::*;


    /// Walk every ring and check the structural invariants: level-0 order, ring closure
    /// both ways, level containment, and head height equal to the tallest node.
    fn assert_valid<T: Ord>(list: &RingSkiplist<T>) {
        use std::collections::HashSet;

        let levels = list.level_count();
        if levels == 0 {
            assert_eq!(list.len(), 0, "an empty level structure must hold no nodes");
            return;
        }
        assert!(list.len() > 0, "live levels require at least one node");

        // SAFETY: every handle walked below comes from a live ring of this list, and
        // nothing mutates the list while we hold `&list`.
        unsafe {
            let first = list.head.links(0).next;
            let mut heights = Vec::new();
            let mut members = HashSet::new();
            let mut tallest = 0;
            let mut cursor = first;
            loop {
                assert!(heights.len() < list.len(), "level-0 ring fails to close");
                assert!(members.insert(cursor), "node appears twice at level 0");
                heights.push(cursor.height());
                tallest = tallest.max(cursor.height());

                let next = cursor.links(0).next;
                assert_eq!(next.links(0).prev, cursor, "mismatched back link at level 0");

                if next == first {
                    break;
                }
                assert!(
                    *cursor.value_ptr() <= *next.value_ptr(),
                    "level-0 order violated",
                );
                cursor = next;
            }
            assert_eq!(heights.len(), list.len(), "level 0 must contain every node");
            assert_eq!(levels, tallest, "head height must equal the tallest node");

            for level in 1..levels {
                let first = list.head.links(level).next;
                let mut seen = HashSet::new();
                let mut cursor = first;
                loop {
                    assert!(seen.len() < heights.len(), "ring at level {level} fails to close");
                    assert!(cursor.height() > level, "node spliced above its height");
                    assert!(
                        members.contains(&cursor),
                        "level {level} holds a node missing from level 0",
                    );
                    assert!(seen.insert(cursor), "node appears twice at level {level}");

                    let next = cursor.links(level).next;
                    assert_eq!(
                        next.links(level).prev,
                        cursor,
                        "mismatched back link at level {level}",
                    );

                    if next == first {
                        break;
                    }
                    cursor = next;
                }

                // Ring closure plus the subset relation pin the membership exactly.
                let expected = heights.iter().filter(|&&height| height > level).count();
                assert_eq!(
                    seen.len(),
                    expected,
                    "level {level} must hold every node tall enough for it",
                );
            }
        }
    }

    fn collect(list: &RingSkiplist<i64>) -> Vec<i64> {
        list.iter().copied().collect()
    }


    #[test]
    fn empty_list() {
        let list = RingSkiplist::<i64>::new();

        assert!(list.is_empty());
        assert_eq!(list.level_count(), 0);
        assert!(list.first().is_none());
        assert!(list.last().is_none());
        assert_eq!(list.iter().next(), None);
        assert_valid(&list);

        let _check_that_debug_works = format!("{list:?}");
    }

    #[test]
    fn first_insert_completes_without_searching() {
        // An insert into an empty list claims its levels and returns; there is nothing
        // to compare against, whatever height was sampled.
        let mut list = RingSkiplist::new();
        let node = list.insert(42_i64);

        assert_eq!(list.len(), 1);
        assert!(list.level_count() >= 1);
        assert_eq!(list.first(), Some(node));
        assert_eq!(list.last(), Some(node));
        assert_valid(&list);

        // SAFETY: `node` is live until the `delete` below, which forfeits it.
        unsafe {
            assert_eq!(*list.value(node), 42);
            assert_eq!(list.next(node), None);
            assert_eq!(list.prev(node), None);

            assert_eq!(list.delete(node), 42);
        }

        assert!(list.is_empty());
        assert_eq!(list.level_count(), 0);
        assert_valid(&list);
    }

    #[test]
    fn insert_sequence_sorts_and_deletes_clean() {
        let values = [7, 5, 6, 1, 9, 16, 33, 7, -3, 0];

        let mut list = RingSkiplist::new();
        let handles: Vec<_> = values.iter().map(|&v| list.insert(v)).collect();

        assert_eq!(collect(&list), [-3, 0, 1, 5, 6, 7, 7, 9, 16, 33]);
        assert_valid(&list);

        for (index, &handle) in handles.iter().enumerate() {
            // SAFETY: each handle is deleted exactly once, in insertion order.
            let value = unsafe { list.delete(handle) };
            assert_eq!(value, values[index]);
            assert_valid(&list);
        }

        assert!(list.is_empty());
        assert_eq!(list.level_count(), 0);
    }

    #[test]
    fn duplicate_values_are_kept() {
        let mut list = RingSkiplist::new();
        let first_three = list.insert(3_i64);
        list.insert(1);
        let second_three = list.insert(3);
        list.insert(2);

        assert_ne!(first_three, second_three);
        assert_eq!(collect(&list), [1, 2, 3, 3]);
        assert_valid(&list);
    }

    #[test]
    fn neighbors_walk_the_bottom_ring() {
        let mut list = RingSkiplist::new();
        for value in [10_i64, 30, 20] {
            list.insert(value);
        }

        // SAFETY: all handles come from `first`/`next` walks of the live list.
        unsafe {
            let first = list.first().unwrap();
            assert_eq!(*list.value(first), 10);
            assert_eq!(list.prev(first), None);

            let second = list.next(first).unwrap();
            assert_eq!(*list.value(second), 20);
            assert_eq!(list.prev(second), Some(first));

            let third = list.next(second).unwrap();
            assert_eq!(*list.value(third), 30);
            assert_eq!(list.next(third), None);
            assert_eq!(list.last(), Some(third));
        }
    }

    #[test]
    fn delete_smallest_rebuilds_head_entry() {
        let mut list = RingSkiplist::new();
        let small = list.insert(1_i64);
        list.insert(2);
        list.insert(3);

        // SAFETY: `small` is live until deleted here.
        unsafe {
            list.delete(small);
        }

        assert_eq!(collect(&list), [2, 3]);
        // `last` reads through the smallest node's back link, which must have survived
        // the head rewrite.
        // SAFETY: `last` returns a live handle.
        unsafe {
            assert_eq!(*list.value(list.last().unwrap()), 3);
        }
        assert_valid(&list);
    }

    #[test]
    fn handles_stay_stable_across_unrelated_operations() {
        let mut list = RingSkiplist::new();
        let kept = list.insert(50_i64);

        let churn: Vec<_> = (0..200).map(|i| list.insert(i * 7 % 101)).collect();
        // SAFETY: `kept` stays live throughout; churn handles are each deleted once.
        unsafe {
            assert_eq!(*list.value(kept), 50);

            for handle in churn {
                list.delete(handle);
            }

            assert_eq!(*list.value(kept), 50);
            assert_eq!(list.first(), Some(kept));
        }
        assert_eq!(list.len(), 1);
        assert_valid(&list);
    }

    #[test]
    fn clear_resets_for_reuse() {
        let mut list = RingSkiplist::new();
        for value in 0..100_i64 {
            list.insert(value);
        }

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.level_count(), 0);
        assert_valid(&list);

        for value in [3_i64, 1, 2] {
            list.insert(value);
        }
        assert_eq!(collect(&list), [1, 2, 3]);
        assert_valid(&list);
    }

    #[test]
    fn lcg_key_streams_hold_invariants() {
        for size in (1..=100).map(|step| step * 100) {
            let mut keys = Lcg64::new(13);
            let mut list = RingSkiplist::new();

            for _ in 0..size {
                list.insert(keys.next_u64() >> 32);
            }

            assert_eq!(list.len(), size);
            assert_valid(&list);
        }
    }

    #[test]
    fn shuffled_deletion_keeps_structure() {
        let mut keys = Lcg64::new(13);
        let mut list = RingSkiplist::new();
        let mut handles: Vec<_> = (0..2000).map(|_| list.insert(keys.next_u64() >> 32)).collect();

        // Fisher-Yates with an unrelated generator, so deletion order shares nothing
        // with insertion order.
        let mut shuffle = oorandom::Rand32::new(0xfeed);
        for index in (1..handles.len()).rev() {
            let other = shuffle.rand_range(0..(index as u32 + 1)) as usize;
            handles.swap(index, other);
        }

        for (count, handle) in handles.into_iter().enumerate() {
            // SAFETY: every handle is deleted exactly once.
            unsafe {
                list.delete(handle);
            }
            if count % 100 == 0 {
                assert_valid(&list);
            }
        }

        assert!(list.is_empty());
        assert_eq!(list.level_count(), 0);
        assert_valid(&list);
    }
}
