// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Outline: an identity-indexed outline tree with flattened snapshots.
//!
//! Understory Outline is the document model behind outliners, task lists, and
//! tree views. It keeps a mutable forest of items addressed by the ids of their
//! values, and derives immutable, list-shaped snapshots for display.
//!
//! - [`Root`] owns the forest in an arena and performs structural edits:
//!   insertion, deletion, batch moves, and property propagation to subtrees.
//! - [`Snapshot`] flattens a forest once into pre-order rows with O(1) level,
//!   index, parent, and child lookups, and can prune collapsed subtrees.
//! - [`TristateCache`] answers "all / none / mixed" for a property over a
//!   selection, the state of an indeterminate checkbox.
//! - [`diff_scoped`] compares two [`VisibleOutline`]s and emits per-parent
//!   insert/remove edits suitable for animating a hierarchical list widget.
//!
//! ## Data flow
//!
//! An edit on [`Root`] produces a new forest state. A [`Snapshot`] is rebuilt
//! from it, the presentation layer derives the visible rows with
//! [`Snapshot::visible`] (respecting expand/collapse), and [`diff_scoped`]
//! turns the previous and current visible rows into an edit script.
//!
//! ```rust
//! use understory_outline::{Destination, Edit, Item, OutlineValue, Root, Snapshot, diff_scoped};
//!
//! #[derive(Clone, Debug)]
//! struct Line {
//!     id: u32,
//!     expanded: bool,
//! }
//!
//! impl OutlineValue for Line {
//!     type Id = u32;
//!     fn id(&self) -> u32 {
//!         self.id
//!     }
//!     fn regenerate_id(&mut self) {
//!         self.id += 1000;
//!     }
//! }
//!
//! let line = |id| Line { id, expanded: true };
//! let mut root = Root::from_items(vec![
//!     Item::with_children(line(1), vec![Item::new(line(2)), Item::new(line(3))]),
//!     Item::new(line(4)),
//! ]);
//!
//! let before = Snapshot::new(&root);
//! assert_eq!(before.flattened_ids(|l| l.expanded), [1, 2, 3, 4]);
//! assert_eq!(before.level(2), 1);
//!
//! root.move_items(&[3], Destination::RootIndex(0));
//! let after = Snapshot::new(&root);
//! assert_eq!(after.flattened_ids(|l| l.expanded), [3, 1, 2, 4]);
//!
//! let edits = diff_scoped(&before.visible(|l| l.expanded), &after.visible(|l| l.expanded));
//! assert!(edits.contains(&Edit::Insert { parent: None, offset: 0, id: 3 }));
//! assert!(edits.contains(&Edit::Remove { parent: Some(1), offset: 1, id: 3 }));
//! ```
//!
//! ## Failure policy
//!
//! - Mutations given ids that are not present are silent no-ops, so racing
//!   user actions (for example a double delete) are harmless.
//! - Snapshot reads given ids that are not present panic: the caller's id
//!   bookkeeping is out of sync with the model.
//! - Moving an item into its own subtree is a precondition violation. Check
//!   [`Root::validate_moving`] first, or use [`Root::try_move_items`].
//!
//! ## Features
//!
//! - `tracing`: debug spans around mutations and trace events for ignored ones.
//! - `serde`: `Serialize`/`Deserialize` for [`Item`], [`Destination`],
//!   [`Tristate`], and [`Edit`].
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod diff;
mod error;
mod root;
mod snapshot;
mod trace;
mod tristate;
mod types;

#[cfg(test)]
mod testing;

pub use diff::{Edit, VisibleOutline, diff_scoped};
pub use error::MoveError;
pub use root::Root;
pub use snapshot::Snapshot;
pub use tristate::{Tristate, TristateCache};
pub use types::{Destination, Item, OutlineValue};
