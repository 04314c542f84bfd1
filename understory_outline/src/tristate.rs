// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! All/none/mixed membership queries for checkbox-like controls.

use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::snapshot::Snapshot;

/// State of a property across a batch of items.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tristate {
    /// No item in the batch has the property (also used for an empty batch).
    Off,
    /// Every item in the batch has the property.
    On,
    /// Some, but not all, items have the property.
    Mixed,
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Per-property sets of matching ids, derived from a [`Snapshot`].
///
/// Build it once per snapshot, then answer any number of [`TristateCache::validate`]
/// queries for selections without rescanning the tree.
///
/// ```rust
/// use understory_outline::{Item, OutlineValue, Snapshot, Tristate, TristateCache};
///
/// #[derive(Clone)]
/// struct Task {
///     id: u8,
///     done: bool,
/// }
///
/// impl OutlineValue for Task {
///     type Id = u8;
///     fn id(&self) -> u8 {
///         self.id
///     }
///     fn regenerate_id(&mut self) {
///         self.id = self.id.wrapping_add(100);
///     }
/// }
///
/// let items = [
///     Item::new(Task { id: 1, done: true }),
///     Item::new(Task { id: 2, done: false }),
/// ];
/// let snapshot = Snapshot::from_items(&items);
///
/// let mut cache = TristateCache::new();
/// cache.insert("done", &snapshot, |t| t.done);
/// assert_eq!(cache.validate(&"done", &[1]), Tristate::On);
/// assert_eq!(cache.validate(&"done", &[1, 2]), Tristate::Mixed);
/// ```
#[derive(Clone, Debug)]
pub struct TristateCache<P, K> {
    properties: HashMap<P, HashSet<K>>,
}

impl<P, K> Default for TristateCache<P, K> {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
        }
    }
}

impl<P, K> TristateCache<P, K>
where
    P: Eq + Hash + Debug,
    K: Copy + Eq + Hash + Debug,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the ids of `snapshot` whose model satisfies `predicate` under `property`.
    ///
    /// Replaces any set previously cached for `property`.
    pub fn insert<M>(
        &mut self,
        property: P,
        snapshot: &Snapshot<K, M>,
        predicate: impl FnMut(&M) -> bool,
    ) {
        self.properties.insert(property, snapshot.satisfy(predicate));
    }

    /// Returns `true` if `property` has been cached.
    pub fn has_property(&self, property: &P) -> bool {
        self.properties.contains_key(property)
    }

    /// Matching ids cached for `property`.
    pub fn matching(&self, property: &P) -> Option<&HashSet<K>> {
        self.properties.get(property)
    }

    /// Whether all, none, or some of `ids` have `property`.
    ///
    /// An empty batch is [`Tristate::Off`].
    ///
    /// # Panics
    ///
    /// If `property` was never cached.
    pub fn validate(&self, property: &P, ids: &[K]) -> Tristate {
        let Some(set) = self.properties.get(property) else {
            panic!("property {property:?} is not cached");
        };
        let matching = ids.iter().filter(|id| set.contains(*id)).count();
        if matching == 0 {
            Tristate::Off
        } else if matching == ids.len() {
            Tristate::On
        } else {
            Tristate::Mixed
        }
    }
}
