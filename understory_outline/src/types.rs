// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the outline: values, destinations, and owned items.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

/// A payload stored in an outline node.
///
/// The payload carries its own identity. The identity must be stable for the
/// lifetime of the value, except when the tree asks for a fresh one through
/// [`OutlineValue::regenerate_id`] to resolve a collision.
pub trait OutlineValue {
    /// Identifier type. Small and copyable, such as an integer or a UUID.
    type Id: Copy + Eq + Hash + Debug;

    /// Returns the identity of this value.
    fn id(&self) -> Self::Id;

    /// Replaces the identity of this value with a fresh one.
    ///
    /// Called when a value is grafted into a tree that already contains its
    /// id, and for every node of a forest inserted with
    /// [`Root::insert_forest`](crate::Root::insert_forest).
    fn regenerate_id(&mut self);
}

/// Target position for inserting or moving items.
///
/// Indexes are clamped to the length of the target child list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Destination<K> {
    /// Append to the end of the top-level list.
    ToRoot,
    /// Insert into the top-level list at the given index.
    RootIndex(usize),
    /// Append to the end of the children of the given item.
    OnItem(K),
    /// Insert into the children of the given item at the given index.
    UnderItem(K, usize),
}

impl<K: Copy> Destination<K> {
    /// Returns the item this destination refers to, or `None` for top-level targets.
    pub fn target(&self) -> Option<K> {
        match *self {
            Self::ToRoot | Self::RootIndex(_) => None,
            Self::OnItem(id) | Self::UnderItem(id, _) => Some(id),
        }
    }

    /// Returns the explicit insertion index, or `None` when appending.
    pub fn index(&self) -> Option<usize> {
        match *self {
            Self::ToRoot | Self::OnItem(_) => None,
            Self::RootIndex(index) | Self::UnderItem(_, index) => Some(index),
        }
    }

    /// Builds the destination "end of `parent`", where `None` is the top level.
    pub fn end_of(parent: Option<K>) -> Self {
        match parent {
            None => Self::ToRoot,
            Some(id) => Self::OnItem(id),
        }
    }

    /// Builds the destination "`index` within `parent`", where `None` is the top level.
    pub fn within(parent: Option<K>, index: usize) -> Self {
        match parent {
            None => Self::RootIndex(index),
            Some(id) => Self::UnderItem(id, index),
        }
    }
}

/// An owned subtree outside of any [`Root`](crate::Root).
///
/// This is the exchange format with collaborators: text parsers produce items,
/// formatters and persistence layers consume [`Root::to_items`](crate::Root::to_items).
///
/// The derived `Clone`, `PartialEq`, and `Drop` recurse once per level.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item<V> {
    /// Payload of this node.
    pub value: V,
    /// Children in display order.
    pub children: Vec<Self>,
}

impl<V> Item<V> {
    /// Creates a leaf item.
    pub fn new(value: V) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    /// Creates an item with the given children.
    pub fn with_children(value: V, children: Vec<Self>) -> Self {
        Self { value, children }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut total = 0;
        let mut stack: Vec<&Self> = alloc::vec![self];
        while let Some(item) = stack.pop() {
            total += 1;
            stack.extend(item.children.iter());
        }
        total
    }
}

/// Internal arena handle (generational), never exposed to callers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct NodeKey(u32, u32);

impl NodeKey {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Arena slots use 32-bit indices by design."
    )]
    pub(crate) const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn destination_parts() {
        let d: Destination<u32> = Destination::UnderItem(7, 2);
        assert_eq!(d.target(), Some(7));
        assert_eq!(d.index(), Some(2));
        assert_eq!(Destination::<u32>::ToRoot.target(), None);
        assert_eq!(Destination::<u32>::ToRoot.index(), None);
        assert_eq!(Destination::end_of(Some(3_u32)), Destination::OnItem(3));
        assert_eq!(Destination::<u32>::within(None, 4), Destination::RootIndex(4));
    }

    #[test]
    fn node_count_covers_subtree() {
        let item = Item::with_children(
            1_u32,
            vec![Item::with_children(2, vec![Item::new(3)]), Item::new(4)],
        );
        assert_eq!(item.node_count(), 4);
        assert_eq!(Item::new(9_u32).node_count(), 1);
    }
}
