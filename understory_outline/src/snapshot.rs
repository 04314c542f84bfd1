// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable, flattened projection of a forest.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::diff::VisibleOutline;
use crate::root::Root;
use crate::types::{Destination, Item, OutlineValue};

/// Point-in-time, read-only view of a forest.
///
/// A snapshot is built by one depth-first walk and stores one row per item in
/// pre-order, so an item's flattened index is its row position. Each row keeps
/// the item's level, parent, position among its siblings, child rows, model,
/// and optionally a boolean aggregate ("this item and all of its descendants
/// satisfy a predicate").
///
/// Lookups by id are O(1). Querying an id that is not in the snapshot is a
/// contract violation and panics: callers must only use ids obtained from this
/// snapshot. Use [`Snapshot::get`] or [`Snapshot::contains`] to probe.
///
/// Two snapshots built from identical forests are identical; child order
/// always follows the source lists.
#[derive(Clone, Debug)]
pub struct Snapshot<K, M> {
    rows: Vec<Row<K, M>>,
    roots: Vec<usize>,
    by_id: HashMap<K, usize>,
}

#[derive(Clone, Debug)]
struct Row<K, M> {
    id: K,
    model: M,
    level: usize,
    parent: Option<usize>,
    /// Position among siblings.
    position: usize,
    children: SmallVec<[usize; 4]>,
    aggregate: Option<bool>,
}

impl<V> Snapshot<V::Id, V>
where
    V: OutlineValue + Clone,
{
    /// Snapshot the current state of `root`.
    pub fn new(root: &Root<V>) -> Self {
        let mut snapshot = Self::empty();
        let mut stack: Vec<_> = root.root_keys().iter().rev().map(|&k| (k, None)).collect();
        while let Some((key, parent)) = stack.pop() {
            let node = root.node(key);
            let row = snapshot.push(node.value.id(), node.value.clone(), parent);
            stack.extend(node.children.iter().rev().map(|&child| (child, Some(row))));
        }
        snapshot
    }

    /// Snapshot `root` and precompute the aggregate of `predicate` for every item.
    pub fn with_aggregate(root: &Root<V>, predicate: impl FnMut(&V) -> bool) -> Self {
        Self::new(root).aggregated(predicate)
    }

    /// Snapshot an owned forest that does not live in a [`Root`].
    ///
    /// # Panics
    ///
    /// If an id occurs more than once in `items`.
    pub fn from_items(items: &[Item<V>]) -> Self {
        let mut snapshot = Self::empty();
        let mut stack: Vec<_> = items.iter().rev().map(|item| (item, None)).collect();
        while let Some((item, parent)) = stack.pop() {
            let row = snapshot.push(item.value.id(), item.value.clone(), parent);
            stack.extend(item.children.iter().rev().map(|child| (child, Some(row))));
        }
        snapshot
    }

    /// [`Snapshot::from_items`] with a precomputed aggregate of `predicate`.
    pub fn from_items_with_aggregate(
        items: &[Item<V>],
        predicate: impl FnMut(&V) -> bool,
    ) -> Self {
        Self::from_items(items).aggregated(predicate)
    }
}

impl<K, M> Snapshot<K, M>
where
    K: Copy + Eq + Hash + Debug,
{
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            roots: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Append a row in pre-order under `parent` and return its index.
    fn push(&mut self, id: K, model: M, parent: Option<usize>) -> usize {
        let row = self.rows.len();
        let (level, position) = match parent {
            None => {
                self.roots.push(row);
                (0, self.roots.len() - 1)
            }
            Some(parent) => {
                let parent = &mut self.rows[parent];
                parent.children.push(row);
                (parent.level + 1, parent.children.len() - 1)
            }
        };
        let previous = self.by_id.insert(id, row);
        assert!(previous.is_none(), "duplicate id {id:?} in snapshot source");
        self.rows.push(Row {
            id,
            model,
            level,
            parent,
            position,
            children: SmallVec::new(),
            aggregate: None,
        });
        row
    }

    /// Replace the aggregate cache with one computed from `predicate`.
    ///
    /// An item's aggregate is `true` iff it and all of its descendants satisfy
    /// `predicate`.
    pub fn aggregated(mut self, mut predicate: impl FnMut(&M) -> bool) -> Self {
        // Reverse pre-order visits every child before its parent.
        for idx in (0..self.rows.len()).rev() {
            let row = &self.rows[idx];
            let all = predicate(&row.model)
                && row
                    .children
                    .iter()
                    .all(|&child| self.rows[child].aggregate == Some(true));
            self.rows[idx].aggregate = Some(all);
        }
        self
    }

    fn row(&self, id: K) -> &Row<K, M> {
        match self.by_id.get(&id) {
            Some(&idx) => &self.rows[idx],
            None => panic!("id {id:?} is not in this snapshot"),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the snapshot has no items.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns `true` if `id` is in this snapshot.
    pub fn contains(&self, id: K) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Iterate every id in pre-order.
    pub fn identifiers(&self) -> impl ExactSizeIterator<Item = K> + '_ {
        self.rows.iter().map(|row| row.id)
    }

    /// Iterate the top-level ids in order.
    pub fn root_ids(&self) -> impl ExactSizeIterator<Item = K> + '_ {
        self.roots.iter().map(|&idx| self.rows[idx].id)
    }

    /// Model of `id`, or `None` if absent.
    pub fn get(&self, id: K) -> Option<&M> {
        self.by_id.get(&id).map(|&idx| &self.rows[idx].model)
    }

    /// Model of `id`.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn model(&self, id: K) -> &M {
        &self.row(id).model
    }

    /// Depth of `id`; top-level items are at level 0.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn level(&self, id: K) -> usize {
        self.row(id).level
    }

    /// Position of `id` in the fully expanded pre-order sequence.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn index(&self, id: K) -> usize {
        self.by_id
            .get(&id)
            .copied()
            .unwrap_or_else(|| panic!("id {id:?} is not in this snapshot"))
    }

    /// Parent of `id`, or `None` for top-level items.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn parent(&self, id: K) -> Option<K> {
        self.row(id).parent.map(|idx| self.rows[idx].id)
    }

    /// Children of `id` in order.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn children(&self, id: K) -> impl ExactSizeIterator<Item = K> + '_ {
        self.row(id).children.iter().map(|&idx| self.rows[idx].id)
    }

    /// Returns `true` if `id` has no children.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn is_leaf(&self, id: K) -> bool {
        self.row(id).children.is_empty()
    }

    /// Precomputed aggregate for `id`, or `None` if the snapshot was built
    /// without an aggregate predicate.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn aggregate(&self, id: K) -> Option<bool> {
        self.row(id).aggregate
    }

    /// Ancestors of `id`, nearest first.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn ancestors(&self, id: K) -> Vec<K> {
        core::iter::successors(self.row(id).parent, |&idx| self.rows[idx].parent)
            .map(|idx| self.rows[idx].id)
            .collect()
    }

    /// The destination that would put an item exactly where `id` is now.
    ///
    /// # Panics
    ///
    /// If `id` is not in the snapshot.
    pub fn destination(&self, id: K) -> Destination<K> {
        let row = self.row(id);
        Destination::within(row.parent.map(|idx| self.rows[idx].id), row.position)
    }

    /// Pre-order sequence of models, descending into an item's children only
    /// while `descend` holds for it.
    ///
    /// Every visited item is emitted; `descend` prunes subtrees, so passing
    /// "is expanded" yields the rows a collapsed outline shows.
    pub fn flattened(&self, descend: impl FnMut(&M) -> bool) -> Vec<&M> {
        let mut out = Vec::new();
        self.walk_visible(descend, |idx| out.push(&self.rows[idx].model));
        out
    }

    /// Like [`Snapshot::flattened`], yielding ids.
    pub fn flattened_ids(&self, descend: impl FnMut(&M) -> bool) -> Vec<K> {
        let mut out = Vec::new();
        self.walk_visible(descend, |idx| out.push(self.rows[idx].id));
        out
    }

    /// Visible structure under `descend`, for [`diff_scoped`](crate::diff_scoped).
    pub fn visible(&self, descend: impl FnMut(&M) -> bool) -> VisibleOutline<K> {
        let mut entries = Vec::new();
        self.walk_visible(descend, |idx| {
            let row = &self.rows[idx];
            entries.push((row.id, row.parent.map(|p| self.rows[p].id)));
        });
        VisibleOutline::from_flattened(entries)
    }

    /// Ids of every item whose model satisfies `predicate`.
    pub fn satisfy(&self, mut predicate: impl FnMut(&M) -> bool) -> HashSet<K> {
        self.rows
            .iter()
            .filter(|row| predicate(&row.model))
            .map(|row| row.id)
            .collect()
    }

    /// Same-shaped snapshot with each model replaced by `transform(model)`.
    ///
    /// Ids, levels, order, and aggregates are carried over unchanged.
    pub fn map<T>(&self, mut transform: impl FnMut(&M) -> T) -> Snapshot<K, T> {
        Snapshot {
            rows: self
                .rows
                .iter()
                .map(|row| Row {
                    id: row.id,
                    model: transform(&row.model),
                    level: row.level,
                    parent: row.parent,
                    position: row.position,
                    children: row.children.clone(),
                    aggregate: row.aggregate,
                })
                .collect(),
            roots: self.roots.clone(),
            by_id: self.by_id.clone(),
        }
    }

    fn walk_visible(&self, mut descend: impl FnMut(&M) -> bool, mut visit: impl FnMut(usize)) {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            visit(idx);
            let row = &self.rows[idx];
            if descend(&row.model) {
                stack.extend(row.children.iter().rev().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Entry, leaf, node, sample};
    use alloc::vec;

    fn ids(models: &[&Entry]) -> Vec<u64> {
        models.iter().map(|e| e.id).collect()
    }

    #[test]
    fn levels_and_order() {
        let snapshot = Snapshot::new(&sample());
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.level(1), 0);
        assert_eq!(snapshot.level(2), 1);
        assert_eq!(snapshot.level(3), 1);
        assert_eq!(snapshot.level(4), 0);
        assert_eq!(ids(&snapshot.flattened(|_| true)), [1, 2, 3, 4]);
        assert_eq!(snapshot.identifiers().collect::<Vec<_>>(), [1, 2, 3, 4]);
        assert_eq!(snapshot.index(4), 3);
        assert_eq!(snapshot.root_ids().collect::<Vec<_>>(), [1, 4]);
    }

    #[test]
    fn parent_children_and_leaves() {
        let snapshot = Snapshot::new(&sample());
        assert_eq!(snapshot.parent(2), Some(1));
        assert_eq!(snapshot.parent(1), None);
        assert_eq!(snapshot.children(1).collect::<Vec<_>>(), [2, 3]);
        assert!(snapshot.is_leaf(2));
        assert!(!snapshot.is_leaf(1));
        assert_eq!(snapshot.model(3).title, "c");
        assert_eq!(snapshot.ancestors(3), [1]);
        assert!(snapshot.get(99).is_none());
        assert!(!snapshot.contains(99));
    }

    #[test]
    #[should_panic(expected = "not in this snapshot")]
    fn unknown_id_is_fatal() {
        let snapshot = Snapshot::new(&sample());
        let _ = snapshot.level(99);
    }

    #[test]
    #[should_panic(expected = "duplicate id 1")]
    fn duplicate_source_ids_are_fatal() {
        let _ = Snapshot::from_items(&[leaf(1, "a"), node(2, "b", vec![leaf(1, "c")])]);
    }

    #[test]
    fn flattened_prunes_collapsed_subtrees() {
        let root = crate::Root::from_items(vec![
            node(1, "a", vec![node(2, "b", vec![leaf(5, "e")]), leaf(3, "c")]),
            leaf(4, "d"),
        ]);
        let snapshot = Snapshot::new(&root);
        // Only item 1 is expanded: its children show, item 2's do not.
        let visible = snapshot.flattened_ids(|e| e.id == 1);
        assert_eq!(visible, [1, 2, 3, 4]);
        assert_eq!(snapshot.flattened_ids(|_| false), [1, 4]);
        assert_eq!(snapshot.flattened_ids(|_| true), [1, 2, 5, 3, 4]);
    }

    #[test]
    fn destination_reconstructs_position() {
        let snapshot = Snapshot::new(&sample());
        assert_eq!(snapshot.destination(3), Destination::UnderItem(1, 1));
        assert_eq!(snapshot.destination(4), Destination::RootIndex(1));
        assert_eq!(snapshot.destination(1), Destination::RootIndex(0));
    }

    #[test]
    fn aggregate_requires_whole_subtree() {
        let mut root = sample();
        root.set_property(&[2], false, |e| e.done = true);
        let snapshot = Snapshot::with_aggregate(&root, |e| e.done);
        assert_eq!(snapshot.aggregate(2), Some(true));
        assert_eq!(snapshot.aggregate(1), Some(false));

        root.set_property(&[1], true, |e| e.done = true);
        let snapshot = Snapshot::with_aggregate(&root, |e| e.done);
        assert_eq!(snapshot.aggregate(1), Some(true));
        assert_eq!(snapshot.aggregate(4), Some(false));

        assert_eq!(Snapshot::new(&root).aggregate(1), None);
    }

    #[test]
    fn satisfy_collects_matching_ids() {
        let mut root = sample();
        root.set_property(&[3, 4], false, |e| e.done = true);
        let snapshot = Snapshot::new(&root);
        let done = snapshot.satisfy(|e| e.done);
        assert_eq!(done.len(), 2);
        assert!(done.contains(&3) && done.contains(&4));
    }

    #[test]
    fn map_preserves_shape() {
        let snapshot = Snapshot::with_aggregate(&sample(), |e| !e.done);
        let titles = snapshot.map(|e| e.title);
        assert_eq!(
            titles.identifiers().collect::<Vec<_>>(),
            snapshot.identifiers().collect::<Vec<_>>()
        );
        for id in snapshot.identifiers() {
            assert_eq!(titles.level(id), snapshot.level(id));
            assert_eq!(titles.parent(id), snapshot.parent(id));
            assert_eq!(titles.aggregate(id), snapshot.aggregate(id));
            assert_eq!(*titles.model(id), snapshot.model(id).title);
        }
    }

    #[test]
    fn items_and_root_snapshots_agree() {
        let root = sample();
        let from_root = Snapshot::new(&root);
        let from_items = Snapshot::from_items(&root.to_items());
        assert_eq!(
            from_root.identifiers().collect::<Vec<_>>(),
            from_items.identifiers().collect::<Vec<_>>()
        );
        for id in from_root.identifiers() {
            assert_eq!(from_root.destination(id), from_items.destination(id));
            assert_eq!(from_root.level(id), from_items.level(id));
        }
    }

    #[test]
    fn visible_outline_follows_expansion() {
        let snapshot = Snapshot::new(&sample());
        let outline = snapshot.visible(|_| true);
        assert_eq!(outline.ids(), [1, 2, 3, 4]);
        assert_eq!(outline.children(Some(1)), [2, 3]);
        let collapsed = snapshot.visible(|_| false);
        assert_eq!(collapsed.ids(), [1, 4]);
        assert!(collapsed.children(Some(1)).is_empty());
    }
}
