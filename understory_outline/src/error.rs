// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by checked mutations.

use core::fmt::Debug;

/// Reasons a checked move was refused.
///
/// Returned by [`Root::try_move_items`](crate::Root::try_move_items). The
/// unchecked [`Root::move_items`](crate::Root::move_items) assumes the caller
/// already ran [`Root::validate_moving`](crate::Root::validate_moving).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError<K: Debug> {
    /// The destination is one of the moved items or lies inside one of their subtrees.
    #[error("cannot move {moved:?} into its own subtree (destination {target:?})")]
    IntoOwnSubtree {
        /// The moved item that contains the destination.
        moved: K,
        /// The item named by the destination.
        target: K,
    },
}
