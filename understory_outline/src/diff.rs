// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped diffing of visible outlines.
//!
//! List widgets with animated hierarchical updates expect edits relative to
//! a parent container, not to the global row index. [`diff_scoped`] compares
//! two [`VisibleOutline`]s one parent scope at a time and reports removals
//! and insertions with per-scope offsets.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::{SmallVec, smallvec};

/// The rows an outline currently shows, grouped by parent.
///
/// Build one with [`Snapshot::visible`](crate::Snapshot::visible), or from a
/// host-maintained flattened sequence with [`VisibleOutline::from_flattened`].
#[derive(Clone, Debug)]
pub struct VisibleOutline<K> {
    order: Vec<K>,
    scopes: HashMap<Option<K>, Vec<K>>,
}

impl<K> Default for VisibleOutline<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            scopes: HashMap::new(),
        }
    }
}

impl<K> VisibleOutline<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Build from `(id, parent)` pairs in pre-order.
    ///
    /// Every parent must appear before its children.
    pub fn from_flattened(entries: impl IntoIterator<Item = (K, Option<K>)>) -> Self {
        let mut outline = Self::default();
        for (id, parent) in entries {
            outline.order.push(id);
            outline.scopes.entry(parent).or_default().push(id);
        }
        outline
    }

    /// Visible ids in display order.
    pub fn ids(&self) -> &[K] {
        &self.order
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visible children of `parent` (`None` is the top level).
    ///
    /// Empty for collapsed, childless, or hidden parents.
    pub fn children(&self, parent: Option<K>) -> &[K] {
        self.scopes.get(&parent).map(Vec::as_slice).unwrap_or_default()
    }
}

/// One step of a scoped edit script.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edit<K> {
    /// Remove the row at `offset` in the old children of `parent`.
    Remove {
        /// Containing scope; `None` is the top level.
        parent: Option<K>,
        /// Offset within the old child list.
        offset: usize,
        /// The removed item.
        id: K,
    },
    /// Insert a row at `offset` in the new children of `parent`.
    Insert {
        /// Containing scope; `None` is the top level.
        parent: Option<K>,
        /// Offset within the new child list.
        offset: usize,
        /// The inserted item.
        id: K,
    },
    /// The child order of `id` changed; its row should be refreshed.
    Reload {
        /// The item whose visible children changed.
        id: K,
    },
}

impl<K: Copy> Edit<K> {
    /// The scope this edit applies to; `None` is the top level.
    pub fn scope(&self) -> Option<K> {
        match *self {
            Self::Remove { parent, .. } | Self::Insert { parent, .. } => parent,
            Self::Reload { id } => Some(id),
        }
    }
}

/// Compute per-scope edits turning `old` into `new`.
///
/// Scopes are visited in pre-order starting with the top level. For each
/// scope whose child order differs, the script contains its removals in
/// descending old offset, then its insertions in ascending new offset, then a
/// [`Edit::Reload`] of the scope's item (the top level has none). Applying a
/// scope's removals and insertions in that order to the old child list yields
/// the new one. Moves are expressed as a removal plus an insertion.
///
/// Only children kept in a scope are descended into: removed rows take their
/// visible subtree with them, and inserted rows bring their new subtree.
pub fn diff_scoped<K>(old: &VisibleOutline<K>, new: &VisibleOutline<K>) -> Vec<Edit<K>>
where
    K: Copy + Eq + Hash + Debug,
{
    let mut edits = Vec::new();
    let mut worklist: SmallVec<[Option<K>; 16]> = smallvec![None];
    while let Some(scope) = worklist.pop() {
        let before = old.children(scope);
        let after = new.children(scope);
        if before == after {
            worklist.extend(before.iter().rev().map(|&id| Some(id)));
            continue;
        }

        let kept = common_subsequence(before, after);
        for (offset, &id) in before.iter().enumerate().rev() {
            if !kept.contains(&id) {
                edits.push(Edit::Remove {
                    parent: scope,
                    offset,
                    id,
                });
            }
        }
        for (offset, &id) in after.iter().enumerate() {
            if !kept.contains(&id) {
                edits.push(Edit::Insert {
                    parent: scope,
                    offset,
                    id,
                });
            }
        }
        if let Some(id) = scope {
            edits.push(Edit::Reload { id });
        }
        worklist.extend(
            before
                .iter()
                .rev()
                .filter(|id| kept.contains(*id))
                .map(|&id| Some(id)),
        );
    }
    edits
}

/// Longest common subsequence of two lists of unique ids.
///
/// With unique ids this is the longest increasing run of new positions taken
/// in old order (patience sorting).
fn common_subsequence<K>(before: &[K], after: &[K]) -> HashSet<K>
where
    K: Copy + Eq + Hash,
{
    let positions: HashMap<K, usize> = after.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let shared: Vec<(usize, K)> = before
        .iter()
        .filter_map(|id| positions.get(id).map(|&pos| (pos, *id)))
        .collect();

    // tails[n] is the entry of `shared` ending the best run of length n + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = alloc::vec![None; shared.len()];
    for (i, &(pos, _)) in shared.iter().enumerate() {
        let n = tails.partition_point(|&t| shared[t].0 < pos);
        if n > 0 {
            prev[i] = Some(tails[n - 1]);
        }
        if n == tails.len() {
            tails.push(i);
        } else {
            tails[n] = i;
        }
    }

    let mut kept = HashSet::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        kept.insert(shared[i].1);
        cursor = prev[i];
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{vec, vec::Vec};

    /// Owned visible tree used to replay edit scripts.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Row {
        id: u64,
        children: Vec<Self>,
    }

    fn build(outline: &VisibleOutline<u64>, parent: Option<u64>) -> Vec<Row> {
        outline
            .children(parent)
            .iter()
            .map(|&id| Row {
                id,
                children: build(outline, Some(id)),
            })
            .collect()
    }

    fn find_mut(rows: &mut [Row], id: u64) -> Option<&mut Row> {
        for row in rows.iter_mut() {
            if row.id == id {
                return Some(row);
            }
            if let Some(found) = find_mut(&mut row.children, id) {
                return Some(found);
            }
        }
        None
    }

    fn scope_mut(rows: &mut Vec<Row>, scope: Option<u64>) -> &mut Vec<Row> {
        match scope {
            None => rows,
            Some(id) => &mut find_mut(rows, id).expect("scope row exists").children,
        }
    }

    /// Replay `edits` on the visible tree of `old`, taking inserted subtrees from `new`.
    fn replay(
        old: &VisibleOutline<u64>,
        new: &VisibleOutline<u64>,
        edits: &[Edit<u64>],
    ) -> Vec<Row> {
        let mut rows = build(old, None);
        for edit in edits {
            match *edit {
                Edit::Remove { parent, offset, id } => {
                    let removed = scope_mut(&mut rows, parent).remove(offset);
                    assert_eq!(removed.id, id, "removal offset points at the wrong row");
                }
                Edit::Insert { parent, offset, id } => {
                    let row = Row {
                        id,
                        children: build(new, Some(id)),
                    };
                    scope_mut(&mut rows, parent).insert(offset, row);
                }
                Edit::Reload { .. } => {}
            }
        }
        rows
    }

    fn outline(entries: &[(u64, Option<u64>)]) -> VisibleOutline<u64> {
        VisibleOutline::from_flattened(entries.iter().copied())
    }

    #[test]
    fn identical_outlines_produce_no_edits() {
        let a = outline(&[(1, None), (2, Some(1)), (3, None)]);
        assert!(diff_scoped(&a, &a.clone()).is_empty());
    }

    #[test]
    fn insertion_is_scope_relative() {
        let old = outline(&[(1, None), (2, Some(1)), (4, None)]);
        let new = outline(&[(1, None), (2, Some(1)), (3, Some(1)), (4, None)]);
        let edits = diff_scoped(&old, &new);
        assert_eq!(
            edits,
            [
                Edit::Insert {
                    parent: Some(1),
                    offset: 1,
                    id: 3
                },
                Edit::Reload { id: 1 },
            ]
        );
    }

    #[test]
    fn collapsing_removes_children_in_descending_order() {
        let old = outline(&[(1, None), (2, Some(1)), (3, Some(1)), (4, None)]);
        let new = outline(&[(1, None), (4, None)]);
        let edits = diff_scoped(&old, &new);
        assert_eq!(
            edits,
            [
                Edit::Remove {
                    parent: Some(1),
                    offset: 1,
                    id: 3
                },
                Edit::Remove {
                    parent: Some(1),
                    offset: 0,
                    id: 2
                },
                Edit::Reload { id: 1 },
            ]
        );
    }

    #[test]
    fn reorder_is_remove_plus_insert() {
        let old = outline(&[(1, None), (2, None), (3, None)]);
        let new = outline(&[(3, None), (1, None), (2, None)]);
        let edits = diff_scoped(&old, &new);
        assert_eq!(
            edits,
            [
                Edit::Remove {
                    parent: None,
                    offset: 2,
                    id: 3
                },
                Edit::Insert {
                    parent: None,
                    offset: 0,
                    id: 3
                },
            ]
        );
        assert_eq!(replay(&old, &new, &edits), build(&new, None));
    }

    #[test]
    fn removed_subtrees_are_not_descended() {
        let old = outline(&[(1, None), (2, Some(1)), (3, Some(2))]);
        let new = outline(&[(4, None)]);
        let edits = diff_scoped(&old, &new);
        assert_eq!(edits.len(), 2, "only the top-level scope changes: {edits:?}");
        assert_eq!(replay(&old, &new, &edits), build(&new, None));
    }

    #[test]
    fn reparenting_replays_exactly() {
        let old = outline(&[
            (1, None),
            (2, Some(1)),
            (3, Some(1)),
            (5, Some(3)),
            (4, None),
        ]);
        let new = outline(&[
            (4, None),
            (3, Some(4)),
            (5, Some(3)),
            (1, None),
            (2, Some(1)),
            (6, Some(2)),
        ]);
        let edits = diff_scoped(&old, &new);
        assert_eq!(replay(&old, &new, &edits), build(&new, None));
        assert!(edits.contains(&Edit::Reload { id: 4 }));
        assert!(!edits.iter().any(|e| e.scope() == Some(3)), "{edits:?}");
    }

    #[test]
    fn common_subsequence_keeps_longest_run() {
        let kept = common_subsequence(&[1, 2, 3, 4, 5], &[2, 5, 3, 4, 1]);
        let mut kept: Vec<u64> = kept.into_iter().collect();
        kept.sort_unstable();
        assert_eq!(kept, vec![2, 3, 4]);
    }
}
