//! Ordered containers backed by a [red-black][1] [tree][2].
//!
//! [1]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
//! [2]: https://en.wikipedia.org/wiki/Binary_search_tree
//!
//! The coloring invariants maintained here, transient mid-rebalance states
//! aside:
//!
//!  1. Every node is red or black.
//!  2. The root is black.
//!  3. A red node never has a red child.
//!  4. Every path from a node down to a nil position passes the same number
//!     of black nodes.
//!
//! Together with the usual ordering rule they bound the height of a tree of
//! `n` values by `2 * log2(n + 1)`.
#![allow(unsafe_op_in_unsafe_fn)]
use core::cmp::Ordering;
use core::fmt;
use core::ptr::NonNull;

use crate::bst::{Color, IsRightChild, Node};


// Data types
// -----------------------------------------------------------------------------

/// An ordered multiset of `T`s with guaranteed O(log n) height.
///
/// Equal values are kept and ordered by insertion. All operations run to
/// completion without suspension points; callers that need shared access
/// must serialize externally (a single lock around the whole tree, or
/// single-owner confinement).
///
/// # Examples
///
/// ```
/// use ebony::RbTree;
///
/// let mut tree = RbTree::new();
/// tree.insert(7);
/// tree.insert(3);
/// tree.insert(0);
///
/// assert!(tree.contains(&3));
/// assert_eq!(tree.get_min(), Some(&0));
/// assert_eq!(tree.get_max(), Some(&7));
/// assert_eq!(tree.len(), 3);
/// ```
pub struct RbTree<T> {
    root: Option<NonNull<Node<T>>>,
    len: usize,
}

// Safety: The tree exclusively owns its node graph; sending it across
// threads sends every `T` with it.
unsafe impl<T: Send> Send for RbTree<T> {}

// Safety: `&RbTree` only hands out `&T` and has no interior mutability.
unsafe impl<T: Sync> Sync for RbTree<T> {}

/// Indicates a failure of [`RbTree::from_iterable`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum FromIterableError {
    /// The given iterable yielded no values.
    #[cfg_attr(feature = "std", error("the given iterable is empty"))]
    Empty,
}

// Queries
// -----------------------------------------------------------------------------

impl<T> RbTree<T> {
    /// Create an empty tree.
    pub const fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// The number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree stores nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The smallest stored value.
    pub fn get_min(&self) -> Option<&T> {
        // Safety: `&self` keeps every node alive and the walk only borrows
        // them shared.
        self.root
            .map(|root| unsafe { &Node::extremum(root, false).as_ref().value })
    }

    /// The largest stored value.
    pub fn get_max(&self) -> Option<&T> {
        // Safety: see `get_min`.
        self.root
            .map(|root| unsafe { &Node::extremum(root, true).as_ref().value })
    }

    /// The number of edges on the longest root-to-leaf path. An empty tree
    /// and a lone root both have height 0.
    pub fn height(&self) -> usize {
        match self.root {
            // Safety: see `get_min`.
            Some(root) => unsafe { Self::height_of(root) },
            None => 0,
        }
    }

    unsafe fn height_of(node: NonNull<Node<T>>) -> usize {
        let mut height = 0;
        for child in node.as_ref().children {
            if let Some(child) = child {
                height = height.max(Self::height_of(child) + 1);
            }
        }
        height
    }

    /// The number of black nodes between the root (exclusive) and a nil
    /// position (inclusive), counted along the leftmost path; invariant 4
    /// makes every other path agree. 0 for an empty tree.
    pub fn black_height(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut count = 1; // the nil position counts as black
        // Safety: see `get_min`.
        unsafe {
            let mut cursor = root.as_ref().children[0];
            while let Some(node) = cursor {
                if node.as_ref().color == Color::Black {
                    count += 1;
                }
                cursor = node.as_ref().children[0];
            }
        }
        count
    }

    /// Whether every root-to-nil path passes the same number of black
    /// nodes.
    pub fn is_balanced(&self) -> bool {
        match self.root {
            // Safety: see `get_min`.
            Some(root) => unsafe { Self::black_depth_of(root).is_some() },
            None => true,
        }
    }

    /// The black height of the subtree under `node`, or `None` if its paths
    /// disagree.
    unsafe fn black_depth_of(node: NonNull<Node<T>>) -> Option<usize> {
        let node = node.as_ref();
        let mut depths = [1, 1];
        for (slot, child) in node.children.iter().enumerate() {
            if let Some(child) = *child {
                depths[slot] = Self::black_depth_of(child)?;
            }
        }
        if depths[0] != depths[1] {
            return None;
        }
        Some(depths[0] + (node.color == Color::Black) as usize)
    }

    /// Drop every stored value.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            // Safety: the graph is exclusively ours and no longer reachable
            // through `self.root`.
            unsafe { Node::free_subtree(root) };
        }
        self.len = 0;
    }
}

impl<T: Ord> RbTree<T> {
    /// Whether at least one occurrence of `value` is stored.
    pub fn contains(&self, value: &T) -> bool {
        // Safety: see `get_min`.
        unsafe { Node::search(&self.root, value).is_some() }
    }

    /// The least stored value that is greater than or equal to `value`.
    pub fn lower_bound(&self, value: &T) -> Option<&T> {
        // Safety: see `get_min`.
        unsafe {
            Node::lower_bound(&self.root, |existing| value.cmp(existing))
                .map(|node| &node.as_ref().value)
        }
    }

    /// The least stored value that is strictly greater than `value`.
    pub fn upper_bound(&self, value: &T) -> Option<&T> {
        // Safety: see `get_min`.
        unsafe {
            Node::lower_bound(&self.root, |existing| match value.cmp(existing) {
                Ordering::Equal => Ordering::Greater,
                ordering => ordering,
            })
            .map(|node| &node.as_ref().value)
        }
    }
}

// Mutation
// -----------------------------------------------------------------------------

impl<T: Ord> RbTree<T> {
    /// Build a tree from a sequence by repeated insertion. An input that
    /// yields nothing is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use ebony::{FromIterableError, RbTree};
    ///
    /// let tree = RbTree::from_iterable([7, 3, 0]).unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// let err = RbTree::<i32>::from_iterable([]).unwrap_err();
    /// assert_eq!(err, FromIterableError::Empty);
    /// ```
    pub fn from_iterable<I>(iterable: I) -> Result<Self, FromIterableError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut tree = Self::new();
        tree.extend(iterable);
        if tree.is_empty() {
            return Err(FromIterableError::Empty);
        }
        Ok(tree)
    }

    /// Insert `value`. Never fails; equal values are kept and ordered after
    /// their equals.
    pub fn insert(&mut self, value: T) {
        let node = Node::new(value, Color::Red);
        // Safety: the tree is exclusively borrowed and `node` is detached.
        unsafe {
            Node::attach_leaf(&mut self.root, node);
            self.rebalance_after_insert(node);
        }
        self.len += 1;
    }

    /// Remove one occurrence of `value`.
    ///
    /// A missing value is not an error: the tree is left untouched and the
    /// miss is reported at warn level through the `log` facade.
    pub fn remove(&mut self, value: &T) {
        if self.is_empty() {
            log::warn!("remove on an empty tree");
            return;
        }
        // Safety: the tree is exclusively borrowed.
        unsafe {
            let Some(node) = Node::search(&self.root, value) else {
                log::warn!("remove: value not present in the tree");
                return;
            };
            self.remove_node(node);
        }
        self.len -= 1;
    }
}

impl<T> RbTree<T> {
    /// Restore the color invariants after `node` was attached as a red
    /// leaf, walking parent links bottom-up.
    ///
    /// # Safety
    ///
    /// `node` must be a red node of this tree and the tree must satisfy the
    /// invariants everywhere except possibly on the edge above `node`.
    unsafe fn rebalance_after_insert(&mut self, mut node: NonNull<Node<T>>) {
        loop {
            debug_assert_eq!(node.as_ref().color, Color::Red);

            let Some(mut parent) = node.as_ref().parent else {
                // `node` is the root; repainting it black below settles it.
                break;
            };
            if parent.as_ref().color == Color::Black {
                break;
            }
            let Some(mut grandparent) = parent.as_ref().parent else {
                // A red root; repainting it black below restores invariant 2
                // and grows every path's black count by one.
                break;
            };
            // Two reds in a row. The tree was valid before the insertion,
            // so the grandparent is black.
            debug_assert_eq!(grandparent.as_ref().color, Color::Black);

            let parent_side = Node::side_of(grandparent, parent);
            let uncle = grandparent.as_ref().children[(!parent_side) as usize];
            if let Some(mut uncle) = uncle.filter(|u| u.as_ref().color == Color::Red) {
                // Red uncle: repaint `parent` and `uncle` black and
                // `grandparent` red, keeping the grandparent's black count
                // intact, then continue from the grandparent which may now
                // clash with its own parent.
                parent.as_mut().color = Color::Black;
                uncle.as_mut().color = Color::Black;
                grandparent.as_mut().color = Color::Red;
                node = grandparent;
                continue;
            }

            // Black or absent uncle: one or two rotations settle the
            // subtree and terminate the walk.
            let node_side = Node::side_of(parent, node);
            if node_side != parent_side {
                // Bent shape; straighten it first. The rotation makes the
                // previous `node` the parent of the previous `parent`.
                Node::rotate(&mut self.root, parent, !node_side);
                parent = node;
            }
            // Straight shape: push the grandparent down to the former
            // uncle's side and trade colors with the parent.
            Node::rotate(&mut self.root, grandparent, !parent_side);
            parent.as_mut().color = Color::Black;
            grandparent.as_mut().color = Color::Red;
            break;
        }

        if let Some(mut root) = self.root {
            root.as_mut().color = Color::Black;
        }
    }

    /// Detach and free `node`, restoring the color invariants.
    ///
    /// # Safety
    ///
    /// `node` must belong to this tree.
    unsafe fn remove_node(&mut self, node: NonNull<Node<T>>) {
        let color = node.as_ref().color;

        // Prefer a red replacement: it can vacate its own position without
        // disturbing any black count. Otherwise fall back to the successor,
        // then the predecessor, regardless of color.
        let successor = node.as_ref().children[1].map(|c| Node::extremum(c, false));
        let predecessor = node.as_ref().children[0].map(|c| Node::extremum(c, true));
        let replacement = match (successor, predecessor) {
            (Some(s), _) if s.as_ref().color == Color::Red => Some(s),
            (_, Some(p)) if p.as_ref().color == Color::Red => Some(p),
            (Some(s), _) => Some(s),
            (None, p) => p,
        };

        let Some(mut replacement) = replacement else {
            // `node` is a leaf. A red leaf and the lone root leave nothing
            // to fix; a black non-root leaf leaves its slot one black
            // short.
            let parent = node.as_ref().parent;
            let side = parent.map(|p| Node::side_of(p, node));
            Node::transplant(&mut self.root, node, None);
            drop(Node::free(node));
            if color == Color::Black {
                if let (Some(parent), Some(side)) = (parent, side) {
                    self.rebalance_after_removal(parent, side);
                }
            }
            return;
        };

        let replacement_color = replacement.as_ref().color;
        let from_right = Some(replacement) == successor;

        // Splice the replacement out of its old position and into `node`'s,
        // never moving values between nodes. Record where the tree loses a
        // black count if the replacement was black: the replacement's old
        // slot, as seen after the splice.
        let (anchor, side): (NonNull<Node<T>>, IsRightChild);
        if node.as_ref().children[from_right as usize] == Some(replacement) {
            // The replacement is `node`'s direct child. It keeps its own
            // subtree on that side and only adopts the other child.
            anchor = replacement;
            side = from_right;
            let other = node.as_ref().children[(!from_right) as usize];
            replacement.as_mut().children[(!from_right) as usize] = other;
            if let Some(mut other) = other {
                other.as_mut().parent = Some(replacement);
            }
        } else {
            // The replacement sits deeper. Being an extremum of `node`'s
            // subtree it has at most one child, on the far side; promote
            // that child into its slot, then adopt both of `node`'s
            // children.
            let old_parent = replacement
                .as_ref()
                .parent
                .expect("a deep replacement always has a parent");
            anchor = old_parent;
            side = Node::side_of(old_parent, replacement);
            let only_child = replacement.as_ref().children[from_right as usize];
            Node::transplant(&mut self.root, replacement, only_child);
            let children = node.as_ref().children;
            replacement.as_mut().children = children;
            for mut child in children.into_iter().flatten() {
                child.as_mut().parent = Some(replacement);
            }
        }
        Node::transplant(&mut self.root, node, Some(replacement));
        replacement.as_mut().color = color;
        drop(Node::free(node));

        if replacement_color == Color::Black {
            self.rebalance_after_removal(anchor, side);
        }
    }

    /// Restore invariant 4 after the child slot `side` of `parent` came up
    /// one black count short.
    ///
    /// # Safety
    ///
    /// `parent` must belong to this tree and the deficiency description
    /// must be accurate.
    unsafe fn rebalance_after_removal(
        &mut self,
        mut parent: NonNull<Node<T>>,
        mut side: IsRightChild,
    ) {
        loop {
            // A red occupant of the deficient slot absorbs the missing
            // black count on its own.
            let occupant = parent.as_ref().children[side as usize];
            if let Some(mut occupant) = occupant.filter(|n| n.as_ref().color == Color::Red) {
                occupant.as_mut().color = Color::Black;
                break;
            }

            //         parent
            //          /  \
            //  deficient   sibling
            //              /    \
            //           near     far      (named from the deficient side)
            //
            // The deficient side is one black short of the sibling side, so
            // the sibling exists; anything else means the structure is
            // corrupted and continuing would corrupt it further.
            let Some(mut sibling) = parent.as_ref().children[(!side) as usize] else {
                unreachable!("deletion rebalance found no sibling");
            };

            if sibling.as_ref().color == Color::Red {
                // Red sibling: demote it over `parent` so that the next
                // round sees a black sibling (the former near nephew, which
                // invariant 3 makes black and invariant 4 non-nil).
                sibling.as_mut().color = Color::Black;
                parent.as_mut().color = Color::Red;
                Node::rotate(&mut self.root, parent, side);
                continue;
            }

            let near = sibling.as_ref().children[side as usize];
            let far = sibling.as_ref().children[(!side) as usize];

            if let Some(mut far) = far.filter(|n| n.as_ref().color == Color::Red) {
                // Red far nephew: the terminal rotation. The sibling takes
                // over `parent`'s color while `parent` and the far nephew
                // each pay one black into the rearranged paths.
                sibling.as_mut().color = parent.as_ref().color;
                parent.as_mut().color = Color::Black;
                far.as_mut().color = Color::Black;
                Node::rotate(&mut self.root, parent, side);
                break;
            }

            if let Some(mut near) = near.filter(|n| n.as_ref().color == Color::Red) {
                // Red near nephew, black far nephew: surface the red nephew
                // into the far position and retry, landing in the case
                // above.
                near.as_mut().color = Color::Black;
                sibling.as_mut().color = Color::Red;
                Node::rotate(&mut self.root, sibling, !side);
                continue;
            }

            // Both nephews black: take one black out of the sibling side
            // too, moving the deficiency up to `parent`. A red `parent` is
            // absorbed by the check at the top of the next round.
            sibling.as_mut().color = Color::Red;
            let Some(grandparent) = parent.as_ref().parent else {
                // The whole tree got uniformly shorter; nothing left to
                // fix.
                break;
            };
            side = Node::side_of(grandparent, parent);
            parent = grandparent;
        }

        if let Some(mut root) = self.root {
            root.as_mut().color = Color::Black;
        }
    }
}

// Trait plumbing
// -----------------------------------------------------------------------------

impl<T> Default for RbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RbTree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Ord> Extend<T> for RbTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> fmt::Debug for RbTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbTree")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
