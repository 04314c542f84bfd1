// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree engine: arena storage, identity index, structural edits, aggregates.

use alloc::{vec, vec::Vec};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::error::MoveError;
use crate::trace::{mutation_span, trace_ignored};
use crate::types::{Destination, Item, NodeKey, OutlineValue};

/// Mutable outline forest.
///
/// Nodes live in a single arena owned by the `Root`. Parent and child links
/// are arena keys, and exactly one map resolves a value's id to its key. All
/// public operations address nodes by the id of their value
/// ([`OutlineValue::id`]).
///
/// Mutations tolerate ids that are not (or no longer) present: they are
/// skipped silently, so overlapping user actions such as a double delete are
/// harmless. Every id appears at most once in the forest; colliding ids are
/// regenerated on insertion.
///
/// ## Example
///
/// ```rust
/// use understory_outline::{Destination, Item, OutlineValue, Root};
///
/// #[derive(Clone, Debug)]
/// struct Row {
///     id: u32,
///     done: bool,
/// }
///
/// impl OutlineValue for Row {
///     type Id = u32;
///     fn id(&self) -> u32 {
///         self.id
///     }
///     fn regenerate_id(&mut self) {
///         self.id += 1000;
///     }
/// }
///
/// let row = |id| Row { id, done: false };
/// let mut root = Root::from_items(vec![
///     Item::with_children(row(1), vec![Item::new(row(2)), Item::new(row(3))]),
///     Item::new(row(4)),
/// ]);
///
/// root.move_items(&[3], Destination::RootIndex(0));
/// assert_eq!(root.roots().collect::<Vec<_>>(), [3, 1, 4]);
///
/// root.set_property(&[1], true, |r| r.done = true);
/// assert!(root.get(2).unwrap().done);
/// ```
#[derive(Clone)]
pub struct Root<V: OutlineValue> {
    /// slots
    nodes: Vec<Option<Node<V>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    roots: Vec<NodeKey>,
    index: HashMap<V::Id, NodeKey>,
}

impl<V: OutlineValue> core::fmt::Debug for Root<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Root")
            .field("nodes_total", &self.nodes.len())
            .field("nodes_alive", &self.index.len())
            .field("free_list", &self.free_list.len())
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl<V: OutlineValue> Default for Root<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    generation: u32,
    parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) value: V,
}

impl<V> Node<V> {
    fn new(generation: u32, value: V) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            value,
        }
    }
}

impl<V: OutlineValue> Root<V> {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a forest from owned items, in order.
    ///
    /// Ids are kept unless they collide with one already taken, in which case
    /// the later value gets a fresh id.
    pub fn from_items(items: Vec<Item<V>>) -> Self {
        let mut root = Self::new();
        for item in items {
            root.graft(item, None, None);
        }
        root
    }

    /// Insert new leaf values at `destination`, preserving their order.
    ///
    /// Returns the ids the values ended up with, which differ from the
    /// supplied ones where a collision forced a fresh id. If `destination`
    /// names an unknown item nothing is inserted and the result is empty.
    pub fn insert_items(
        &mut self,
        values: impl IntoIterator<Item = V>,
        destination: Destination<V::Id>,
    ) -> Vec<V::Id> {
        let _span = mutation_span!("insert_items", ?destination);
        let Some((parent, mut index)) = self.resolve(destination) else {
            trace_ignored!(?destination, "insert at unknown destination ignored");
            return Vec::new();
        };
        let mut inserted = Vec::new();
        for value in values {
            let key = self.admit(value, false);
            let at = self.attach(key, parent, index);
            index = index.map(|_| at + 1);
            inserted.push(self.node(key).value.id());
        }
        inserted
    }

    /// Deep-copy externally sourced subtrees into the forest at `destination`.
    ///
    /// Every copied node receives a fresh id, so pasting or duplicating a
    /// subtree that already lives in this forest is safe. Returns the new ids
    /// of the top-level copies.
    pub fn insert_forest(
        &mut self,
        items: &[Item<V>],
        destination: Destination<V::Id>,
    ) -> Vec<V::Id>
    where
        V: Clone,
    {
        let _span = mutation_span!("insert_forest", count = items.len(), ?destination);
        let Some((parent, mut index)) = self.resolve(destination) else {
            trace_ignored!(?destination, "graft at unknown destination ignored");
            return Vec::new();
        };
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let (key, at) = self.graft_copy(item, parent, index);
            index = index.map(|_| at + 1);
            inserted.push(self.node(key).value.id());
        }
        inserted
    }

    /// Remove an item and its whole subtree. Unknown ids are ignored.
    pub fn delete_item(&mut self, id: V::Id) {
        let _span = mutation_span!("delete_item", ?id);
        let Some(&key) = self.index.get(&id) else {
            trace_ignored!(?id, "delete of unknown item ignored");
            return;
        };
        self.detach(key);
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            let node = self.nodes[key.idx()].take().expect("dangling NodeKey");
            self.index.remove(&node.value.id());
            self.free_list.push(key.idx());
            stack.extend(node.children);
        }
    }

    /// Remove several items and their subtrees. Unknown ids are ignored,
    /// including ids already removed as part of an earlier subtree.
    pub fn delete_items(&mut self, ids: impl IntoIterator<Item = V::Id>) {
        for id in ids {
            self.delete_item(id);
        }
    }

    /// Returns `false` if `destination` is one of `ids` or lies inside the
    /// subtree of one of them.
    ///
    /// Top-level destinations, and destinations naming an unknown item, are
    /// always valid.
    pub fn validate_moving(&self, ids: &[V::Id], destination: Destination<V::Id>) -> bool {
        self.moved_ancestor(ids, destination).is_none()
    }

    /// Move items to `destination`, preserving the relative order of `ids`.
    ///
    /// An explicit index is interpreted against the target list as it was
    /// before the move: moved items that sat before that index are discounted,
    /// so the group lands between the same remaining siblings it was dropped
    /// between. Unknown ids are skipped; an unknown destination makes the call
    /// a no-op.
    ///
    /// The caller must first check [`Root::validate_moving`]. Moving an item
    /// into its own subtree detaches that subtree from the forest. Use
    /// [`Root::try_move_items`] for the checked variant.
    pub fn move_items(&mut self, ids: &[V::Id], destination: Destination<V::Id>) {
        let _span = mutation_span!("move_items", count = ids.len(), ?destination);
        debug_assert!(
            self.validate_moving(ids, destination),
            "destination lies inside a moved subtree"
        );
        let Some((parent, index)) = self.resolve(destination) else {
            trace_ignored!(?destination, "move to unknown destination ignored");
            return;
        };

        let mut moving: HashSet<NodeKey> = HashSet::with_capacity(ids.len());
        let keys: Vec<NodeKey> = ids
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .filter(|key| moving.insert(*key))
            .collect();
        if keys.is_empty() {
            return;
        }

        let mut index = index.map(|index| {
            let preceding = self
                .siblings(parent)
                .iter()
                .take(index)
                .filter(|key| moving.contains(*key))
                .count();
            index - preceding
        });

        for &key in &keys {
            self.detach(key);
        }
        for key in keys {
            let at = self.attach(key, parent, index);
            index = index.map(|_| at + 1);
        }
    }

    /// Checked [`Root::move_items`]: refuses moves into a moved item's own subtree.
    pub fn try_move_items(
        &mut self,
        ids: &[V::Id],
        destination: Destination<V::Id>,
    ) -> Result<(), MoveError<V::Id>> {
        if let Some((moved, target)) = self.moved_ancestor(ids, destination) {
            return Err(MoveError::IntoOwnSubtree { moved, target });
        }
        self.move_items(ids, destination);
        Ok(())
    }

    /// Move each item to the end of its current parent (or of the top level).
    pub fn move_to_end(&mut self, ids: &[V::Id]) {
        for (parent, group) in self.group_by_parent(ids) {
            self.move_items(&group, Destination::end_of(parent));
        }
    }

    /// Move each item to the start of its current parent (or of the top level).
    pub fn move_to_top(&mut self, ids: &[V::Id]) {
        for (parent, group) in self.group_by_parent(ids) {
            self.move_items(&group, Destination::within(parent, 0));
        }
    }

    /// Apply `setter` to each identified value and, if `downstream`, to all of
    /// their descendants. Each value is visited at most once.
    ///
    /// The setter must not change the value's id.
    pub fn set_property(
        &mut self,
        ids: &[V::Id],
        downstream: bool,
        mut setter: impl FnMut(&mut V),
    ) {
        let _span = mutation_span!("set_property", count = ids.len(), downstream);
        let mut visited: HashSet<NodeKey> = HashSet::new();
        let mut stack: SmallVec<[NodeKey; 16]> = SmallVec::new();
        for id in ids {
            let Some(&key) = self.index.get(id) else {
                trace_ignored!(?id, "property change on unknown item ignored");
                continue;
            };
            stack.push(key);
            while let Some(key) = stack.pop() {
                if !visited.insert(key) {
                    continue;
                }
                let node = self.node_mut(key);
                let before = node.value.id();
                setter(&mut node.value);
                debug_assert_eq!(before, node.value.id(), "setter changed the item id");
                if downstream {
                    stack.extend(node.children.iter().copied());
                }
            }
        }
    }

    /// Number of items in the forest.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the forest has no items.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of items whose value satisfies `predicate`.
    pub fn count_where(&self, mut predicate: impl FnMut(&V) -> bool) -> usize {
        self.live().filter(|node| predicate(&node.value)).count()
    }

    /// Returns `true` if every value satisfies `predicate` (vacuously for an empty forest).
    pub fn all_satisfy(&self, mut predicate: impl FnMut(&V) -> bool) -> bool {
        self.live().all(|node| predicate(&node.value))
    }

    /// Returns `true` if `id` is present.
    pub fn contains(&self, id: V::Id) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the value of a present item.
    pub fn get(&self, id: V::Id) -> Option<&V> {
        self.key_of(id).map(|key| &self.node(key).value)
    }

    /// Returns the value of a present item mutably.
    ///
    /// The value's id must not be changed through this reference.
    pub fn get_mut(&mut self, id: V::Id) -> Option<&mut V> {
        let key = self.key_of(id)?;
        Some(&mut self.node_mut(key).value)
    }

    /// Returns the parent of an item, or `None` for top-level or unknown ids.
    pub fn parent_of(&self, id: V::Id) -> Option<V::Id> {
        let parent = self.node(self.key_of(id)?).parent?;
        Some(self.node(parent).value.id())
    }

    /// Iterate the children of an item in order; empty for unknown ids.
    pub fn children_of(&self, id: V::Id) -> impl Iterator<Item = V::Id> + '_ {
        let children: &[NodeKey] = match self.key_of(id) {
            Some(key) => &self.node(key).children,
            None => &[],
        };
        self.ids_of(children)
    }

    /// Iterate the top-level items in order.
    pub fn roots(&self) -> impl Iterator<Item = V::Id> + '_ {
        self.ids_of(&self.roots)
    }

    /// Number of ancestors of an item (top-level items are at level 0).
    pub fn level(&self, id: V::Id) -> Option<usize> {
        let key = self.key_of(id)?;
        Some(self.ancestor_keys(key).count())
    }

    /// Ancestors of an item, nearest first. Empty for top-level or unknown ids.
    pub fn ancestors(&self, id: V::Id) -> Vec<V::Id> {
        match self.key_of(id) {
            Some(key) => self
                .ancestor_keys(key)
                .map(|key| self.node(key).value.id())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of items below an item, excluding the item itself.
    pub fn descendant_count(&self, id: V::Id) -> Option<usize> {
        let key = self.key_of(id)?;
        let mut total = 0;
        let mut stack: SmallVec<[NodeKey; 16]> = SmallVec::new();
        stack.extend(self.node(key).children.iter().copied());
        while let Some(key) = stack.pop() {
            total += 1;
            stack.extend(self.node(key).children.iter().copied());
        }
        Some(total)
    }

    /// Get the next item in depth-first (pre-order) traversal.
    ///
    /// Returns `None` at the end of the forest or for unknown ids. Does not wrap around.
    pub fn next_depth_first(&self, id: V::Id) -> Option<V::Id> {
        let key = self.key_of(id)?;
        let next = self.next_in_order(key)?;
        Some(self.node(next).value.id())
    }

    /// Get the previous item in depth-first (pre-order) traversal.
    ///
    /// Returns `None` at the start of the forest or for unknown ids. Does not wrap around.
    pub fn prev_depth_first(&self, id: V::Id) -> Option<V::Id> {
        let key = self.key_of(id)?;
        let prev = self.prev_in_order(key)?;
        Some(self.node(prev).value.id())
    }

    /// Export the forest as owned items, in order.
    pub fn to_items(&self) -> Vec<Item<V>>
    where
        V: Clone,
    {
        let mut forest = Vec::with_capacity(self.roots.len());
        // Post-order: a frame is finished once every child has been exported.
        let mut stack: Vec<(NodeKey, Vec<Item<V>>)> = Vec::new();
        for &top in &self.roots {
            stack.push((top, Vec::with_capacity(self.node(top).children.len())));
            while let Some((key, exported)) = stack.last_mut() {
                let node = self.node(*key);
                if let Some(&child) = node.children.get(exported.len()) {
                    let width = self.node(child).children.len();
                    stack.push((child, Vec::with_capacity(width)));
                    continue;
                }
                let item = Item::with_children(node.value.clone(), core::mem::take(exported));
                stack.pop();
                match stack.last_mut() {
                    Some((_, siblings)) => siblings.push(item),
                    None => forest.push(item),
                }
            }
        }
        forest
    }
}

impl<V: OutlineValue> Root<V> {
    // --- internals ---

    pub(crate) fn root_keys(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Access a node; panics if `key` is stale.
    pub(crate) fn node(&self, key: NodeKey) -> &Node<V> {
        self.nodes[key.idx()]
            .as_ref()
            .filter(|node| node.generation == key.generation())
            .expect("dangling NodeKey")
    }

    /// Access a node mutably; panics if `key` is stale.
    fn node_mut(&mut self, key: NodeKey) -> &mut Node<V> {
        self.nodes[key.idx()]
            .as_mut()
            .filter(|node| node.generation == key.generation())
            .expect("dangling NodeKey")
    }

    fn key_of(&self, id: V::Id) -> Option<NodeKey> {
        self.index.get(&id).copied()
    }

    fn ids_of<'a>(&'a self, keys: &'a [NodeKey]) -> impl Iterator<Item = V::Id> + 'a {
        keys.iter().map(|&key| self.node(key).value.id())
    }

    fn live(&self) -> impl Iterator<Item = &Node<V>> + '_ {
        self.nodes.iter().flatten()
    }

    fn ancestor_keys(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        core::iter::successors(self.node(key).parent, |&key| self.node(key).parent)
    }

    fn siblings(&self, parent: Option<NodeKey>) -> &[NodeKey] {
        match parent {
            None => &self.roots,
            Some(parent) => &self.node(parent).children,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeKey>) -> &mut Vec<NodeKey> {
        match parent {
            None => &mut self.roots,
            Some(parent) => &mut self.node_mut(parent).children,
        }
    }

    /// Map a destination to `(parent, index)`; `None` if it names an unknown item.
    fn resolve(
        &self,
        destination: Destination<V::Id>,
    ) -> Option<(Option<NodeKey>, Option<usize>)> {
        let parent = match destination.target() {
            None => None,
            Some(id) => Some(self.key_of(id)?),
        };
        Some((parent, destination.index()))
    }

    /// The first moved item on the destination's ancestor chain (inclusive),
    /// paired with the destination's target.
    fn moved_ancestor(
        &self,
        ids: &[V::Id],
        destination: Destination<V::Id>,
    ) -> Option<(V::Id, V::Id)> {
        let target = destination.target()?;
        let key = self.key_of(target)?;
        let moving: HashSet<V::Id> = ids.iter().copied().collect();
        core::iter::once(key)
            .chain(self.ancestor_keys(key))
            .map(|key| self.node(key).value.id())
            .find(|id| moving.contains(id))
            .map(|moved| (moved, target))
    }

    /// Group present ids by their current parent, preserving first-seen order.
    fn group_by_parent(&self, ids: &[V::Id]) -> Vec<(Option<V::Id>, Vec<V::Id>)> {
        let mut groups: Vec<(Option<V::Id>, Vec<V::Id>)> = Vec::new();
        for &id in ids {
            if !self.contains(id) {
                continue;
            }
            let parent = self.parent_of(id);
            match groups.iter_mut().find(|(p, _)| *p == parent) {
                Some((_, group)) => group.push(id),
                None => groups.push((parent, vec![id])),
            }
        }
        groups
    }

    /// Store `value` in a fresh slot and index it, regenerating its id while it
    /// collides (and once up front if `fresh`).
    fn admit(&mut self, mut value: V, fresh: bool) -> NodeKey {
        if fresh {
            value.regenerate_id();
        }
        while self.index.contains_key(&value.id()) {
            value.regenerate_id();
        }
        let id = value.id();
        let key = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, value));
            NodeKey::new(idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, value)));
            self.generations.push(generation);
            NodeKey::new(self.nodes.len() - 1, generation)
        };
        self.index.insert(id, key);
        key
    }

    /// Link `key` into `parent` at `index` (clamped; `None` appends). Returns the position used.
    fn attach(&mut self, key: NodeKey, parent: Option<NodeKey>, index: Option<usize>) -> usize {
        let siblings = self.siblings_mut(parent);
        let at = index.map_or(siblings.len(), |index| index.min(siblings.len()));
        siblings.insert(at, key);
        self.node_mut(key).parent = parent;
        at
    }

    fn detach(&mut self, key: NodeKey) {
        let parent = self.node(key).parent;
        let siblings = self.siblings_mut(parent);
        let pos = siblings
            .iter()
            .position(|&k| k == key)
            .expect("node missing from its parent's child list");
        siblings.remove(pos);
        self.node_mut(key).parent = None;
    }

    /// Admit a whole owned subtree, attaching its top node at `parent`/`index`.
    fn graft(
        &mut self,
        item: Item<V>,
        parent: Option<NodeKey>,
        index: Option<usize>,
    ) -> (NodeKey, usize) {
        let Item { value, children } = item;
        let top = self.admit(value, false);
        let at = self.attach(top, parent, index);

        // Children are pushed in reverse so each list is appended in order.
        let mut stack: Vec<(Item<V>, NodeKey)> = children
            .into_iter()
            .rev()
            .map(|child| (child, top))
            .collect();
        while let Some((item, parent)) = stack.pop() {
            let Item { value, children } = item;
            let key = self.admit(value, false);
            self.attach(key, Some(parent), None);
            stack.extend(children.into_iter().rev().map(|child| (child, key)));
        }
        (top, at)
    }

    /// Like [`Root::graft`], but copies values out of a borrowed subtree.
    fn graft_copy(
        &mut self,
        item: &Item<V>,
        parent: Option<NodeKey>,
        index: Option<usize>,
    ) -> (NodeKey, usize)
    where
        V: Clone,
    {
        let top = self.admit(item.value.clone(), true);
        let at = self.attach(top, parent, index);

        let mut stack: Vec<(&Item<V>, NodeKey)> =
            item.children.iter().rev().map(|child| (child, top)).collect();
        while let Some((item, parent)) = stack.pop() {
            let key = self.admit(item.value.clone(), true);
            self.attach(key, Some(parent), None);
            stack.extend(item.children.iter().rev().map(|child| (child, key)));
        }
        (top, at)
    }

    fn next_in_order(&self, key: NodeKey) -> Option<NodeKey> {
        if let Some(&first_child) = self.node(key).children.first() {
            return Some(first_child);
        }
        let mut current = key;
        loop {
            if let Some(next) = self.sibling_at_offset(current, 1) {
                return Some(next);
            }
            current = self.node(current).parent?;
        }
    }

    fn prev_in_order(&self, key: NodeKey) -> Option<NodeKey> {
        if let Some(mut prev) = self.sibling_at_offset(key, -1) {
            while let Some(&last) = self.node(prev).children.last() {
                prev = last;
            }
            return Some(prev);
        }
        self.node(key).parent
    }

    fn sibling_at_offset(&self, key: NodeKey, offset: isize) -> Option<NodeKey> {
        let siblings = self.siblings(self.node(key).parent);
        let pos = siblings.iter().position(|&k| k == key)?;
        siblings.get(pos.checked_add_signed(offset)?).copied()
    }
}
