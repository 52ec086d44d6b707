#![expect(
    unsafe_code,
    reason = "rebalancing rewires raw node links; each block states the liveness and \
              shape facts it relies on",
)]

use std::marker::PhantomData;

use moored_core::{Comparator, OrdComparator};
use tracing::{Level as LogLevel, event};

use crate::node::{Color, TreeNode, is_red};


/// Deepest node on the left spine of `node`'s subtree (possibly `node` itself).
///
/// # Safety
/// `node` must be live and part of a consistent tree.
#[must_use]
pub(crate) unsafe fn leftmost<T>(mut node: TreeNode<T>) -> TreeNode<T> {
    // SAFETY: every link reached from a live, consistent node is live.
    unsafe {
        while let Some(left) = node.left() {
            node = left;
        }
    }
    node
}

/// Deepest node on the right spine of `node`'s subtree (possibly `node` itself).
///
/// # Safety
/// Same as [`leftmost`].
#[must_use]
pub(crate) unsafe fn rightmost<T>(mut node: TreeNode<T>) -> TreeNode<T> {
    // SAFETY: every link reached from a live, consistent node is live.
    unsafe {
        while let Some(right) = node.right() {
            node = right;
        }
    }
    node
}

/// The in-order successor: the leftmost descendant of the right subtree when there is
/// one, otherwise the nearest ancestor whose left subtree holds `node`.
///
/// # Safety
/// Same as [`leftmost`].
#[must_use]
pub(crate) unsafe fn successor_of<T>(node: TreeNode<T>) -> Option<TreeNode<T>> {
    // SAFETY: every link reached from a live, consistent node is live.
    unsafe {
        if let Some(right) = node.right() {
            return Some(leftmost(right));
        }

        let mut child = node;
        let mut ancestor = node.parent();
        while let Some(above) = ancestor {
            if above.left() == Some(child) {
                return Some(above);
            }
            child = above;
            ancestor = above.parent();
        }
        None
    }
}

/// Mirror of [`successor_of`].
///
/// # Safety
/// Same as [`leftmost`].
#[must_use]
pub(crate) unsafe fn predecessor_of<T>(node: TreeNode<T>) -> Option<TreeNode<T>> {
    // SAFETY: every link reached from a live, consistent node is live.
    unsafe {
        if let Some(left) = node.left() {
            return Some(rightmost(left));
        }

        let mut child = node;
        let mut ancestor = node.parent();
        while let Some(above) = ancestor {
            if above.right() == Some(child) {
                return Some(above);
            }
            child = above;
            ancestor = above.parent();
        }
        None
    }
}


/// A red-black tree: an ordered multiset with deterministic O(log n) rebalancing.
///
/// Ordered insertion goes through [`insort`] (or [`binary_search`] for lookup), both of
/// which consult the caller-supplied [`Comparator`]. [`append`] and [`insert_after`]
/// instead place a node at an explicit in-order position without comparing at all, which
/// also means they can produce a tree that is *not* value-ordered — the red-black shape
/// invariants hold regardless, and [`check`] validates exactly those.
///
/// Every insertion returns a [`TreeNode`] handle that stays valid until that node is
/// passed to [`delete`]; rebalancing recolors and rewires but never moves a node.
/// Handle-taking operations are `unsafe`: a stale handle or one from another tree is
/// undefined behavior, deliberately undetected.
///
/// Dropping the tree reclaims every node recursively; [`clear`] is the explicit form.
///
/// [`insort`]: RedBlackTree::insort
/// [`binary_search`]: RedBlackTree::binary_search
/// [`append`]: RedBlackTree::append
/// [`insert_after`]: RedBlackTree::insert_after
/// [`delete`]: RedBlackTree::delete
/// [`check`]: RedBlackTree::check
/// [`clear`]: RedBlackTree::clear
pub struct RedBlackTree<T, C = OrdComparator> {
    pub(crate) root: Option<TreeNode<T>>,
    cmp: C,
    len: usize,
}

impl<T, C: Default> Default for RedBlackTree<T, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T> RedBlackTree<T> {
    /// An empty tree ordered by `T`'s own [`Ord`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(OrdComparator)
    }
}

impl<T, C> RedBlackTree<T, C> {
    /// An empty tree ordered by `cmp`.
    #[inline]
    #[must_use]
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            root: None,
            cmp,
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

    /// Handle of the first node in order, if any.
    #[must_use]
    pub fn first(&self) -> Option<TreeNode<T>> {
        // SAFETY: the root of a consistent tree is live.
        self.root.map(|root| unsafe { leftmost(root) })
    }

    /// Handle of the last node in order, if any.
    #[must_use]
    pub fn last(&self) -> Option<TreeNode<T>> {
        // SAFETY: the root of a consistent tree is live.
        self.root.map(|root| unsafe { rightmost(root) })
    }

    /// The node's element.
    ///
    /// # Safety
    /// `node` must be a live member of this tree.
    #[inline]
    #[must_use]
    pub unsafe fn value(&self, node: TreeNode<T>) -> &T {
        // SAFETY: live per the contract; the borrow is tied to `&self`, and deleting the
        // node would require `&mut self`.
        unsafe { &*node.value_ptr() }
    }

    /// The next node in order, or `None` if `node` is the last.
    ///
    /// # Safety
    /// `node` must be a live member of this tree.
    #[inline]
    #[must_use]
    pub unsafe fn successor(&self, node: TreeNode<T>) -> Option<TreeNode<T>> {
        // SAFETY: live per the contract.
        unsafe { successor_of(node) }
    }

    /// The previous node in order, or `None` if `node` is the first.
    ///
    /// # Safety
    /// `node` must be a live member of this tree.
    #[inline]
    #[must_use]
    pub unsafe fn predecessor(&self, node: TreeNode<T>) -> Option<TreeNode<T>> {
        // SAFETY: live per the contract.
        unsafe { predecessor_of(node) }
    }

    /// Iterate the elements in order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            cursor: self.first(),
            remaining: self.len,
            _tree: PhantomData,
        }
    }

    /// Tear down every node, leaving an empty, reusable tree.
    pub fn clear(&mut self) {
        /// Post-order reclaim; depth is bounded by the tree height, O(log n).
        unsafe fn reclaim<T>(node: TreeNode<T>) {
            // SAFETY: children of a live, consistent node are live; each node is
            // destroyed after both of its subtrees and never touched again.
            unsafe {
                if let Some(left) = node.left() {
                    reclaim(left);
                }
                if let Some(right) = node.right() {
                    reclaim(right);
                }
                node.destroy();
            }
        }

        let len = self.len;
        if let Some(root) = self.root.take() {
            // SAFETY: the tree is consistent and gives up all of its handles here.
            unsafe {
                reclaim(root);
            }
            self.len = 0;

            event!(LogLevel::DEBUG, len, "tree cleared");
        }
    }
}

impl<T, C> Drop for RedBlackTree<T, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, C> std::fmt::Debug for RedBlackTree<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedBlackTree")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<'a, T, C> IntoIterator for &'a RedBlackTree<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Lookup and ordered insertion.
impl<T, C: Comparator<T>> RedBlackTree<T, C> {
    /// Insert `value` at its sorted position, returning a stable handle to its node.
    ///
    /// Equal elements are kept, each new one descending to the right of those already
    /// present.
    pub fn insort(&mut self, value: T) -> TreeNode<T> {
        let mut parent = None;
        let mut go_left = false;
        let mut cursor = self.root;

        // SAFETY: the descent only follows links of live nodes in a consistent tree.
        unsafe {
            while let Some(node) = cursor {
                parent = Some(node);
                go_left = self.cmp.less(&value, &*node.value_ptr());
                cursor = if go_left { node.left() } else { node.right() };
            }
        }

        // SAFETY: `parent` is a live member (or absent for the empty tree), and the
        // chosen child slot is the null the descent ended in.
        unsafe { self.attach(parent, go_left, value) }
    }

    /// Find a node whose element compares equal to `value`, if any.
    ///
    /// Equality is derived from two strict-less-than tests, so this only requires the
    /// same relation the ordered insertions use. Only meaningful on trees built through
    /// [`RedBlackTree::insort`].
    #[must_use]
    pub fn binary_search(&self, value: &T) -> Option<TreeNode<T>> {
        let mut cursor = self.root;

        // SAFETY: the descent only follows links of live nodes in a consistent tree.
        unsafe {
            while let Some(node) = cursor {
                cursor = if self.cmp.less(value, &*node.value_ptr()) {
                    node.left()
                } else if self.cmp.less(&*node.value_ptr(), value) {
                    node.right()
                } else {
                    return Some(node);
                };
            }
        }
        None
    }
}

// Positional insertion.
impl<T, C> RedBlackTree<T, C> {
    /// Insert `value` as the in-order successor of the current last node (or as the root
    /// of an empty tree). No comparison is performed, and `value` is *not* required to
    /// sort after the rest.
    pub fn append(&mut self, value: T) -> TreeNode<T> {
        let last = self.last();
        // SAFETY: `last` is live when present, and the rightmost node has a null right
        // child by definition.
        unsafe { self.attach(last, false, value) }
    }

    /// Insert `value` as the immediate in-order successor of `after`: into `after`'s
    /// null right-child slot, or as the leftmost descendant of its right subtree.
    ///
    /// # Safety
    /// `after` must be a live member of this tree.
    pub unsafe fn insert_after(&mut self, after: TreeNode<T>, value: T) -> TreeNode<T> {
        // SAFETY: `after` is live per the contract, so its links are too; either chosen
        // slot is null by construction.
        unsafe {
            match after.right() {
                None => self.attach(Some(after), false, value),
                Some(right) => self.attach(Some(leftmost(right)), true, value),
            }
        }
    }

    /// Link a fresh red node into a null child slot of `parent`, then rebalance.
    ///
    /// # Safety
    /// `parent` must be a live member (or `None` for an empty tree), and the selected
    /// child slot must currently be null.
    unsafe fn attach(
        &mut self,
        parent: Option<TreeNode<T>>,
        as_left_child: bool,
        value: T,
    ) -> TreeNode<T> {
        let node = TreeNode::allocate(value, Color::Red, parent);

        // SAFETY: `parent` is live per the contract.
        unsafe {
            match parent {
                None => {
                    debug_assert!(self.root.is_none());
                    self.root = Some(node);
                }
                Some(parent) if as_left_child => {
                    debug_assert!(parent.left().is_none());
                    parent.set_left(Some(node));
                }
                Some(parent) => {
                    debug_assert!(parent.right().is_none());
                    parent.set_right(Some(node));
                }
            }

            self.insert_fixup(node);
        }

        self.len += 1;
        node
    }
}

// Rotations and the link plumbing shared by both fixups.
impl<T, C> RedBlackTree<T, C> {
    /// Point whichever slot held `old` under `parent` (or the root slot) at `new`.
    ///
    /// # Safety
    /// `parent` must be live when present, and one of its child slots (or the root when
    /// `parent` is `None`) must currently hold `old`.
    unsafe fn replace_child(
        &mut self,
        parent: Option<TreeNode<T>>,
        old: TreeNode<T>,
        new: Option<TreeNode<T>>,
    ) {
        // SAFETY: `parent` is live per the contract.
        unsafe {
            match parent {
                None => {
                    debug_assert_eq!(self.root, Some(old));
                    self.root = new;
                }
                Some(parent) if parent.left() == Some(old) => parent.set_left(new),
                Some(parent) => {
                    debug_assert_eq!(parent.right(), Some(old));
                    parent.set_right(new);
                }
            }
        }
    }

    /// Rotate `pivot` down to the left; its right child takes its place. Preserves
    /// in-order sequence and parent consistency, and updates the root when `pivot` was
    /// the root.
    ///
    /// # Safety
    /// `pivot` must be a live member with a right child.
    unsafe fn rotate_left(&mut self, pivot: TreeNode<T>) {
        // SAFETY: `pivot` and everything reachable from it are live per the contract.
        unsafe {
            let Some(riser) = pivot.right() else {
                unreachable!("left rotation requires a right child");
            };

            let inner = riser.left();
            pivot.set_right(inner);
            if let Some(inner) = inner {
                inner.set_parent(Some(pivot));
            }

            let parent = pivot.parent();
            riser.set_parent(parent);
            self.replace_child(parent, pivot, Some(riser));

            riser.set_left(Some(pivot));
            pivot.set_parent(Some(riser));
        }
    }

    /// Mirror of [`RedBlackTree::rotate_left`].
    ///
    /// # Safety
    /// `pivot` must be a live member with a left child.
    unsafe fn rotate_right(&mut self, pivot: TreeNode<T>) {
        // SAFETY: `pivot` and everything reachable from it are live per the contract.
        unsafe {
            let Some(riser) = pivot.left() else {
                unreachable!("right rotation requires a left child");
            };

            let inner = riser.right();
            pivot.set_left(inner);
            if let Some(inner) = inner {
                inner.set_parent(Some(pivot));
            }

            let parent = pivot.parent();
            riser.set_parent(parent);
            self.replace_child(parent, pivot, Some(riser));

            riser.set_right(Some(pivot));
            pivot.set_parent(Some(riser));
        }
    }

    /// Restore the red-black properties after linking the red leaf `node`.
    ///
    /// Walks upward: a red uncle recolors and recurses on the grandparent; a black uncle
    /// rotates the inner-child case into the outer-child case, then recolors and rotates
    /// at the grandparent, which terminates. Reaching the root blackens it.
    ///
    /// # Safety
    /// `node` must be a live member, red, with consistent links; the tree must satisfy
    /// the red-black properties everywhere except possibly the edge above `node`.
    unsafe fn insert_fixup(&mut self, mut node: TreeNode<T>) {
        // SAFETY: the loop only follows links of live members; each case re-establishes
        // the properties it is labeled with.
        unsafe {
            loop {
                let Some(parent) = node.parent() else {
                    // The node rose to the root: blacken it.
                    node.set_color(Color::Black);
                    return;
                };

                if parent.color() == Color::Black {
                    // A red node under a black parent violates nothing.
                    return;
                }

                // A red parent cannot be the root, so the grandparent exists.
                let Some(grand) = parent.parent() else {
                    unreachable!("a red non-root node must have a grandparent");
                };
                let parent_is_left = grand.left() == Some(parent);
                let uncle = if parent_is_left { grand.right() } else { grand.left() };

                if is_red(uncle) {
                    // Red uncle: push the blackness down from the grandparent and
                    // continue there.
                    parent.set_color(Color::Black);
                    if let Some(uncle) = uncle {
                        uncle.set_color(Color::Black);
                    }
                    grand.set_color(Color::Red);
                    node = grand;
                    continue;
                }

                // Black uncle. Rotate an inner child outward first, which swaps the
                // roles of node and parent.
                let node_is_inner = if parent_is_left {
                    parent.right() == Some(node)
                } else {
                    parent.left() == Some(node)
                };
                let outer_child = if node_is_inner {
                    // The rotation swaps the roles: the former parent becomes the
                    // outer child of the former node.
                    if parent_is_left {
                        self.rotate_left(parent);
                    } else {
                        self.rotate_right(parent);
                    }
                    parent
                } else {
                    node
                };

                // Outer child under a red parent with a black uncle: recolor and rotate
                // the grandparent. Done.
                let Some(outer_parent) = outer_child.parent() else {
                    unreachable!("the outer child's parent survived the rotation");
                };
                outer_parent.set_color(Color::Black);
                grand.set_color(Color::Red);
                if parent_is_left {
                    self.rotate_right(grand);
                } else {
                    self.rotate_left(grand);
                }
                return;
            }
        }
    }
}

// Deletion.
impl<T, C> RedBlackTree<T, C> {
    /// Unlink `node`, rebalance if a black node left the tree, free the node, and return
    /// its element.
    ///
    /// # Safety
    /// `node` must be a live member of this tree. The handle (and every copy of it) is
    /// dead afterwards.
    pub unsafe fn delete(&mut self, node: TreeNode<T>) -> T {
        // SAFETY: `node` is live per the contract, and the tree is consistent.
        unsafe {
            if node.left().is_some() && node.right().is_some() {
                let Some(right) = node.right() else {
                    unreachable!("checked just above");
                };
                let successor = leftmost(right);
                self.exchange_with_successor(node, successor);
            }

            // At most one child now: a two-child node was swapped into its successor's
            // position, and the successor never has a left child.
            let child = node.left().or(node.right());
            let parent = node.parent();

            self.replace_child(parent, node, child);
            if let Some(child) = child {
                child.set_parent(parent);
            }

            if node.color() == Color::Black {
                // A black node left the tree: its position is now doubly black.
                self.fix_delete(child, parent);
            }

            self.len -= 1;

            let value = node.take_value();
            node.deallocate();
            value
        }
    }

    /// Swap `node` with its in-order successor *structurally* — a four-way exchange of
    /// parent, left, right, and color — so the node's handle keeps addressing the same
    /// allocation while the two trade places in the tree.
    ///
    /// When the successor is the node's own right child, a naive exchange of parent
    /// links would produce a cycle (the successor's parent *is* the node). The
    /// successor's parent link is therefore self-looped first; after the exchange, the
    /// self-reference surfaces as the successor's right child and is redirected back at
    /// the node. All surrounding uplinks are then re-normalized.
    ///
    /// # Safety
    /// Both nodes must be live members, `successor` must be the in-order successor of
    /// `node`, and `node` must have two children.
    unsafe fn exchange_with_successor(&mut self, node: TreeNode<T>, successor: TreeNode<T>) {
        // SAFETY: both nodes are live per the contract, as is everything linked to them.
        unsafe {
            debug_assert!(successor.left().is_none());
            let adjacent = successor.parent() == Some(node);

            if adjacent {
                successor.set_parent(Some(successor));
            }

            let node_parent = node.parent();
            let node_left = node.left();
            let node_right = node.right();
            let node_color = node.color();

            node.set_parent(successor.parent());
            node.set_left(successor.left());
            node.set_right(successor.right());
            node.set_color(successor.color());

            successor.set_parent(node_parent);
            successor.set_left(node_left);
            successor.set_right(node_right);
            successor.set_color(node_color);

            if adjacent {
                // The self-loop came through as node.parent == successor (correct), and
                // as successor.right == successor (the stale self-reference).
                debug_assert_eq!(node.parent(), Some(successor));
                debug_assert_eq!(successor.right(), Some(successor));
                successor.set_right(Some(node));
            }

            // Re-normalize the uplinks around both repositioned nodes.
            self.replace_child(successor.parent(), node, Some(successor));
            if let Some(left) = successor.left() {
                left.set_parent(Some(successor));
            }
            if !adjacent {
                if let Some(right) = successor.right() {
                    right.set_parent(Some(successor));
                }
                let Some(node_parent) = node.parent() else {
                    unreachable!("a non-adjacent successor sits below the deleted node");
                };
                self.replace_child(Some(node_parent), successor, Some(node));
            }
            if let Some(right) = node.right() {
                right.set_parent(Some(node));
            }
            debug_assert!(node.left().is_none());
        }
    }

    /// Restore the red-black properties at a doubly-black position, carried as
    /// `(child, parent)` because the child may be absent.
    ///
    /// The six standard cases: reaching the root terminates; a red sibling rotates into
    /// a black-sibling case; a black sibling with black children recolors and recurses
    /// on the parent (terminating immediately when the parent was red); a red near
    /// nephew rotates into the far-nephew case; a red far nephew recolors, rotates the
    /// parent, and terminates.
    ///
    /// # Safety
    /// `parent` must be live when present with `child` in one of its slots (`child` may
    /// be `None` only where the sibling subtree carries the missing black height); the
    /// tree must satisfy the red-black properties except for the single missing black
    /// on `child`'s side.
    unsafe fn fix_delete(&mut self, mut child: Option<TreeNode<T>>, mut parent: Option<TreeNode<T>>) {
        // SAFETY: the loop follows links of live members only; each case restores the
        // property it is labeled with.
        unsafe {
            loop {
                let Some(above) = parent else {
                    // The doubly-black position rose to the root; the extra black is
                    // absorbed.
                    break;
                };
                if is_red(child) {
                    // A red carrier just re-blackens below.
                    break;
                }

                // With a black height to spare on the other side, the sibling exists.
                let child_is_left = above.left() == child;

                if child_is_left {
                    let Some(mut sibling) = above.right() else {
                        unreachable!("a doubly-black position always has a sibling");
                    };

                    if sibling.color() == Color::Red {
                        // Red sibling (parent necessarily black): rotate it above and
                        // continue against the new, black sibling.
                        sibling.set_color(Color::Black);
                        above.set_color(Color::Red);
                        self.rotate_left(above);
                        let Some(new_sibling) = above.right() else {
                            unreachable!("rotation moved a child of the old sibling here");
                        };
                        sibling = new_sibling;
                    }

                    if !is_red(sibling.left()) && !is_red(sibling.right()) {
                        // Both nephews black: pull a black out of both sides and move
                        // the deficit up. A red parent ends the loop and re-blackens.
                        sibling.set_color(Color::Red);
                        child = Some(above);
                        parent = above.parent();
                        continue;
                    }

                    if !is_red(sibling.right()) {
                        // Near nephew red, far black: rotate the sibling so the red
                        // lands on the far side.
                        if let Some(near) = sibling.left() {
                            near.set_color(Color::Black);
                        }
                        sibling.set_color(Color::Red);
                        self.rotate_right(sibling);
                        let Some(new_sibling) = above.right() else {
                            unreachable!("rotation moved the near nephew here");
                        };
                        sibling = new_sibling;
                    }

                    // Far nephew red: the sibling takes the parent's color, parent and
                    // far nephew go black, and rotating the parent repairs the deficit.
                    sibling.set_color(above.color());
                    above.set_color(Color::Black);
                    if let Some(far) = sibling.right() {
                        far.set_color(Color::Black);
                    }
                    self.rotate_left(above);
                    break;
                } else {
                    let Some(mut sibling) = above.left() else {
                        unreachable!("a doubly-black position always has a sibling");
                    };

                    if sibling.color() == Color::Red {
                        sibling.set_color(Color::Black);
                        above.set_color(Color::Red);
                        self.rotate_right(above);
                        let Some(new_sibling) = above.left() else {
                            unreachable!("rotation moved a child of the old sibling here");
                        };
                        sibling = new_sibling;
                    }

                    if !is_red(sibling.left()) && !is_red(sibling.right()) {
                        sibling.set_color(Color::Red);
                        child = Some(above);
                        parent = above.parent();
                        continue;
                    }

                    if !is_red(sibling.left()) {
                        if let Some(near) = sibling.right() {
                            near.set_color(Color::Black);
                        }
                        sibling.set_color(Color::Red);
                        self.rotate_left(sibling);
                        let Some(new_sibling) = above.left() else {
                            unreachable!("rotation moved the near nephew here");
                        };
                        sibling = new_sibling;
                    }

                    sibling.set_color(above.color());
                    above.set_color(Color::Black);
                    if let Some(far) = sibling.left() {
                        far.set_color(Color::Black);
                    }
                    self.rotate_right(above);
                    break;
                }
            }

            if let Some(carrier) = child {
                carrier.set_color(Color::Black);
            }
        }
    }
}


/// In-order iterator over a [`RedBlackTree`], yielding `&T`.
#[expect(
    missing_copy_implementations,
    reason = "iterators advance; implicit copies would silently fork the walk",
)]
#[derive(Debug)]
pub struct Iter<'a, T> {
    cursor:    Option<TreeNode<T>>,
    remaining: usize,
    _tree:     PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.remaining -= 1;

        // SAFETY: the iterator borrows the tree for `'a`, so no node can be deleted or
        // rewired while it exists.
        unsafe {
            self.cursor = successor_of(node);
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
            _tree:     PhantomData,
        }
    }
}


#[cfg(test)]
mod tests {
    use moored_core::Lcg64;

    use super::*;


    fn collect(tree: &RedBlackTree<i64>) -> Vec<i64> {
        tree.iter().copied().collect()
    }


    #[test]
    fn empty_tree() {
        let tree = RedBlackTree::<i64>::new();

        assert!(tree.is_empty());
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());
        assert!(tree.binary_search(&1).is_none());
        assert!(tree.verify());
        assert_eq!(tree.iter().next(), None);

        let _check_that_debug_works = format!("{tree:?}");
    }

    #[test]
    fn first_insert_makes_a_black_root() {
        let mut tree = RedBlackTree::new();
        let node = tree.insort(5_i64);

        assert_eq!(tree.root, Some(node));
        // SAFETY: the root is live.
        unsafe {
            assert_eq!(node.color(), Color::Black);
            assert_eq!(*tree.value(node), 5);
        }
        assert!(tree.verify());
    }

    #[test]
    fn equal_values_descend_to_the_right() {
        let mut tree = RedBlackTree::new();
        let first = tree.insort(7_i64);
        let second = tree.insort(7);
        tree.insort(7);

        assert_ne!(first, second);
        assert_eq!(collect(&tree), [7, 7, 7]);
        assert!(tree.verify());
    }

    #[test]
    fn deleting_the_root_promotes_a_replacement() {
        let mut tree = RedBlackTree::new();
        let handles: Vec<_> = (0..7_i64).map(|v| tree.insort(v)).collect();

        loop {
            let Some(root) = tree.root else { break };
            // SAFETY: the root is live until this delete.
            unsafe {
                tree.delete(root);
            }
            assert!(tree.verify(), "delete of the root broke the invariants");
        }

        assert!(tree.is_empty());
        drop(handles);
    }

    #[test]
    fn adjacent_successor_swap_stays_consistent() {
        // Build shapes where the deleted node's successor is its direct right child,
        // which exercises the self-loop path of the structural exchange.
        for size in 2..40_i64 {
            let mut tree = RedBlackTree::new();
            let handles: Vec<_> = (0..size).map(|v| tree.insort(v)).collect();

            for &handle in &handles {
                // SAFETY: each handle is live until its own delete.
                unsafe {
                    tree.delete(handle);
                }
                assert!(tree.verify(), "size {size}: delete broke the invariants");
            }
            assert!(tree.is_empty());
        }
    }

    #[test]
    fn check_names_the_violated_property() {
        use crate::check::StructureError;

        // 10 (black) over 5 and 15 (black) with a red 3: the red-uncle recolor on the
        // fourth insert settles exactly this shape.
        let mut tree = RedBlackTree::new();
        let root = tree.insort(10_i64);
        let five = tree.insort(5);
        tree.insort(15);
        let three = tree.insort(3);

        assert_eq!(tree.check(), Ok(()));

        // SAFETY: all handles are live; every corruption is undone before the next.
        unsafe {
            assert_eq!(root.color(), Color::Black);
            assert_eq!(five.color(), Color::Black);
            assert_eq!(three.color(), Color::Red);

            root.set_color(Color::Red);
            assert_eq!(tree.check(), Err(StructureError::RedRoot));
            root.set_color(Color::Black);

            five.set_color(Color::Red);
            assert_eq!(tree.check(), Err(StructureError::RedRedEdge));
            five.set_color(Color::Black);

            three.set_color(Color::Black);
            assert_eq!(tree.check(), Err(StructureError::UnevenBlackHeight));
            three.set_color(Color::Red);

            three.set_parent(Some(root));
            assert_eq!(tree.check(), Err(StructureError::MismatchedParentLink));
            three.set_parent(Some(five));

            assert_eq!(tree.check(), Ok(()));
        }
    }

    #[test]
    fn randomized_churn_stays_verified() {
        let mut keys = Lcg64::new(13);
        let mut shuffle = oorandom::Rand32::new(0xdada);
        let mut tree = RedBlackTree::new();
        let mut handles: Vec<_> = (0..500).map(|_| tree.insort(keys.next_u64() >> 32)).collect();

        for round in 0..2000 {
            let delete = !handles.is_empty() && shuffle.rand_range(0..2) == 0;
            if delete {
                let pick = shuffle.rand_range(0..handles.len() as u32) as usize;
                let handle = handles.swap_remove(pick);
                // SAFETY: each handle is live until its single delete.
                unsafe {
                    tree.delete(handle);
                }
            } else {
                handles.push(tree.insort(keys.next_u64() >> 32));
            }

            if round % 64 == 0 {
                assert!(tree.verify());
                let in_order: Vec<u64> = tree.iter().copied().collect();
                assert!(in_order.is_sorted(), "in-order traversal fell out of order");
                assert_eq!(in_order.len(), tree.len());
            }
        }
    }
}
