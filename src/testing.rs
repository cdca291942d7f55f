//! Introspection for tests.

use std::cell::Cell;

/// What the most recent `select` on a thread did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The remembered output was returned.
    Hit,
    /// The combiner ran.
    Miss,
}

thread_local! {
    static LAST: Cell<Option<Outcome>> = const { Cell::new(None) };
}

/// The outcome of the most recent `select` on this thread.
///
/// For composed selectors, this is the outcome of the outermost one, which
/// finishes last.
pub fn last_outcome() -> Option<Outcome> {
    LAST.with(Cell::get)
}

/// Whether the most recent `select` on this thread was a hit.
pub fn last_was_hit() -> bool {
    last_outcome() == Some(Outcome::Hit)
}

pub(crate) fn register_hit() {
    LAST.with(|cell| cell.set(Some(Outcome::Hit)));
}

pub(crate) fn register_miss() {
    LAST.with(|cell| cell.set(Some(Outcome::Miss)));
}
