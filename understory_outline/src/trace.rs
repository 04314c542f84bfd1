// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logging shims.
//!
//! With the `tracing` feature these forward to `tracing`; without it they
//! expand to nothing.

#[cfg(feature = "tracing")]
macro_rules! trace_ignored {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_ignored {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! mutation_span {
    ($name:literal $(, $($field:tt)*)?) => {
        tracing::debug_span!($name $(, $($field)*)?).entered()
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! mutation_span {
    ($($arg:tt)*) => {
        $crate::trace::NoopSpan
    };
}

/// Stand-in guard returned by `mutation_span!` without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub(crate) struct NoopSpan;

pub(crate) use {mutation_span, trace_ignored};
