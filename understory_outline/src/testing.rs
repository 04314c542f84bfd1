// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for unit tests.

use alloc::{vec, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::{Item, OutlineValue, Root};

static NEXT_ID: AtomicU64 = AtomicU64::new(1_000);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) id: u64,
    pub(crate) title: &'static str,
    pub(crate) done: bool,
}

impl Entry {
    pub(crate) fn new(id: u64, title: &'static str) -> Self {
        Self {
            id,
            title,
            done: false,
        }
    }
}

impl OutlineValue for Entry {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn regenerate_id(&mut self) {
        self.id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn leaf(id: u64, title: &'static str) -> Item<Entry> {
    Item::new(Entry::new(id, title))
}

pub(crate) fn node(id: u64, title: &'static str, children: Vec<Item<Entry>>) -> Item<Entry> {
    Item::with_children(Entry::new(id, title), children)
}

/// `[a(b, c), d]` with ids 1..=4.
pub(crate) fn sample() -> Root<Entry> {
    Root::from_items(vec![
        node(1, "a", vec![leaf(2, "b"), leaf(3, "c")]),
        leaf(4, "d"),
    ])
}
