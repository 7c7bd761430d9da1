//! [Binary search tree][1] structural core.
//!
//! [1]: https://en.wikipedia.org/wiki/Binary_search_tree
//!
//! This module owns the node shape and every color-agnostic structural
//! operation: ordered descent, extremum walks, in-order stepping, rotation,
//! and subtree splicing. The balancing policy that decides *when* these
//! primitives run lives in [`crate::rbtree`].
#![allow(unsafe_op_in_unsafe_fn)]
use core::cmp::Ordering;
use core::ptr::NonNull;

use alloc::boxed::Box;

/// Identifies the child slot a node occupies in its parent, `false` being
/// the left one.
pub(crate) type IsRightChild = bool;

/// The color tag carried by every [`Node`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Color {
    Black,
    Red,
}

/// A heap-allocated tree node.
///
/// The operation functions mutate linked nodes behind raw pointers. Unless
/// stated otherwise, they require the tree containing their arguments to be
/// valid and consider every node in it mutably borrowed for the duration of
/// the call.
pub(crate) struct Node<T> {
    pub(crate) children: [Option<NonNull<Self>>; 2],
    /// Non-owning back-reference, used for upward walks only.
    pub(crate) parent: Option<NonNull<Self>>,
    pub(crate) color: Color,
    pub(crate) value: T,
}

impl<T> Node<T> {
    /// Allocate a detached node.
    pub(crate) fn new(value: T, color: Color) -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Self {
            children: [None, None],
            parent: None,
            color,
            value,
        })))
    }

    /// Free a node previously allocated by [`Node::new`] and return its
    /// value.
    ///
    /// # Safety
    ///
    /// No tree and no other node may still link to `node`, and `node` must
    /// not be freed twice.
    pub(crate) unsafe fn free(node: NonNull<Self>) -> T {
        Box::from_raw(node.as_ptr()).value
    }

    /// Which child slot of `parent` holds `node`.
    ///
    /// # Safety
    ///
    /// `parent` must be valid and actually be `node`'s parent.
    #[inline]
    pub(crate) unsafe fn side_of(parent: NonNull<Self>, node: NonNull<Self>) -> IsRightChild {
        parent.as_ref().children[1] == Some(node)
    }

    /// Walk to the extremum of the subtree rooted by `this`: the minimum
    /// for `side == false`, the maximum for `side == true`.
    ///
    /// # Safety
    ///
    /// The subtree must be valid; the traversed nodes are considered
    /// borrowed for the duration of the call.
    #[inline]
    pub(crate) unsafe fn extremum(mut this: NonNull<Self>, side: IsRightChild) -> NonNull<Self> {
        while let Some(child) = this.as_ref().children[side as usize] {
            this = child;
        }
        this
    }

    /// Find the in-order successor of `this`, following parent links when
    /// `this` has no right subtree.
    ///
    /// # Safety
    ///
    /// See [`Node::extremum`].
    pub(crate) unsafe fn successor(this: NonNull<Self>) -> Option<NonNull<Self>> {
        if let Some(child) = this.as_ref().children[1] {
            return Some(Self::extremum(child, false));
        }
        let mut node = this;
        loop {
            let parent = node.as_ref().parent?;
            if parent.as_ref().children[0] == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
    }

    /// Locate a node holding `value`. With duplicates present this returns
    /// the topmost match, the first one the descent encounters.
    ///
    /// # Safety
    ///
    /// See [`Node::extremum`].
    pub(crate) unsafe fn search(tree: &Option<NonNull<Self>>, value: &T) -> Option<NonNull<Self>>
    where
        T: Ord,
    {
        let mut cursor = *tree;
        while let Some(node) = cursor {
            cursor = match value.cmp(&node.as_ref().value) {
                Ordering::Less => node.as_ref().children[0],
                Ordering::Greater => node.as_ref().children[1],
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// Find the leftmost node for which `cmp` returns `Less` or `Equal`.
    /// `cmp` receives stored values and must be monotone with respect to the
    /// tree order (`Greater`, then `Equal`, then `Less` as the stored value
    /// increases).
    ///
    /// # Safety
    ///
    /// See [`Node::extremum`].
    pub(crate) unsafe fn lower_bound(
        tree: &Option<NonNull<Self>>,
        mut cmp: impl FnMut(&T) -> Ordering,
    ) -> Option<NonNull<Self>> {
        let mut node = (*tree)?;
        loop {
            match cmp(&node.as_ref().value) {
                Ordering::Less | Ordering::Equal => {
                    if let Some(child) = node.as_ref().children[0] {
                        node = child;
                    } else {
                        return Some(node);
                    }
                }
                Ordering::Greater => {
                    if let Some(child) = node.as_ref().children[1] {
                        node = child;
                    } else {
                        // Every node below and including `node` compares
                        // `Greater`; the answer is the next one in order.
                        return Self::successor(node);
                    }
                }
            }
        }
    }

    /// Attach `new_node` as a leaf at its ordered position. Values equal to
    /// an existing one descend to the right, keeping equal values in
    /// insertion order.
    ///
    /// # Safety
    ///
    /// The tree must be valid and `new_node` detached; every node involved
    /// is considered mutably borrowed for the duration of the call.
    pub(crate) unsafe fn attach_leaf(tree: &mut Option<NonNull<Self>>, mut new_node: NonNull<Self>)
    where
        T: Ord,
    {
        let Some(root) = *tree else {
            *tree = Some(new_node);
            new_node.as_mut().parent = None;
            return;
        };
        let mut parent = root;
        loop {
            let side = new_node.as_ref().value.cmp(&parent.as_ref().value) != Ordering::Less;
            let child_cell = &mut parent.as_mut().children[side as usize];
            if let Some(child) = *child_cell {
                parent = child;
            } else {
                *child_cell = Some(new_node);
                new_node.as_mut().parent = Some(parent);
                return;
            }
        }
    }

    /// Rotate `node` downward; `dir` is the side `node` ends up on.
    /// `rotate(node, false)` is the classic left rotation, promoting
    /// `node`'s right child into its position, and `rotate(node, true)` is
    /// the mirror image. Returns the promoted child.
    ///
    /// Purely structural: the three participating parent links and the
    /// enclosing child slot (or the root cell) are rewired, colors are
    /// untouched.
    ///
    /// # Safety
    ///
    /// `node` must be part of the tree and its child opposite `dir` must
    /// exist.
    pub(crate) unsafe fn rotate(
        tree: &mut Option<NonNull<Self>>,
        mut node: NonNull<Self>,
        dir: IsRightChild,
    ) -> NonNull<Self> {
        let idir = (!dir) as usize;
        let dir = dir as usize;

        //          node            new_root
        //          /  \            /  \
        //         /    \          /    \
        //  new_root    y   ==>   x     node
        //    /  \                      /  \
        //   x  mid                    mid  y
        //
        // (drawn for `dir == true`; mirror it for the other side)

        let mut new_root = node.as_ref().children[idir]
            .expect("rotation requires a child on the rising side");
        let mid = new_root.as_ref().children[dir];
        node.as_mut().children[idir] = mid;
        new_root.as_mut().children[dir] = Some(node);

        new_root.as_mut().parent = node.as_ref().parent;
        node.as_mut().parent = Some(new_root);
        if let Some(mut mid) = mid {
            mid.as_mut().parent = Some(node);
        }

        // Update the enclosing subtree's child pointer.
        let child_cell = if let Some(mut parent) = new_root.as_ref().parent {
            let children = &mut parent.as_mut().children;
            if children[0] == Some(node) {
                &mut children[0]
            } else {
                &mut children[1]
            }
        } else {
            tree
        };
        debug_assert_eq!(*child_cell, Some(node));
        *child_cell = Some(new_root);

        new_root
    }

    /// Point the slot that holds `node` (its parent's child cell, or the
    /// root cell) at `replacement`, fixing the replacement's parent link.
    /// `node` itself is left untouched and afterwards dangles off the tree.
    ///
    /// # Safety
    ///
    /// The tree must contain `node`; `replacement`, if any, must not be
    /// reachable through `node`'s slot once unlinked by the caller.
    pub(crate) unsafe fn transplant(
        tree: &mut Option<NonNull<Self>>,
        node: NonNull<Self>,
        replacement: Option<NonNull<Self>>,
    ) {
        let parent = node.as_ref().parent;
        let slot = if let Some(mut parent) = parent {
            let side = Self::side_of(parent, node);
            &mut parent.as_mut().children[side as usize]
        } else {
            &mut *tree
        };
        debug_assert_eq!(*slot, Some(node));
        *slot = replacement;
        if let Some(mut replacement) = replacement {
            replacement.as_mut().parent = parent;
        }
    }

    /// Free every node of the tree rooted by `this`, iteratively and
    /// top-down, never dereferencing an already-freed child.
    ///
    /// # Safety
    ///
    /// `this` must be the root of a valid tree that no one else links to;
    /// every node in it is freed.
    pub(crate) unsafe fn free_subtree(this: NonNull<Self>) {
        let mut cursor = this;
        loop {
            cursor = if let Some(child) = cursor.as_ref().children[0] {
                child
            } else if let Some(child) = cursor.as_ref().children[1] {
                child
            } else {
                // A leaf; unhook it and resume from its parent.
                let leaf = cursor;
                let parent = leaf.as_ref().parent;
                drop(Self::free(leaf));
                if leaf == this {
                    return;
                }
                let mut parent = parent.expect("interior node lost its parent link");
                let children = &mut parent.as_mut().children;
                let slot = (children[1] == Some(leaf)) as usize;
                debug_assert_eq!(children[slot], Some(leaf));
                children[slot] = None;
                parent
            };
        }
    }
}
