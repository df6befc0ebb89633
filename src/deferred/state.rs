use super::reaction::Reaction;

use std::fmt;

/// Lifecycle state of a deferred.
///
/// A deferred starts `Pending` and moves to exactly one of the terminal
/// states. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not settled yet. Reactions attached now are stored until settlement.
    Pending,

    /// Settled with a value.
    Fulfilled,

    /// Settled with a reason.
    Rejected,
}

/// Identifier of a deferred, unique per [`Handle`](crate::Handle).
///
/// Ids only serve diagnostics: logging, and the rejection tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeferredId(pub(crate) u64);

impl DeferredId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage of a deferred: pending reactions, or the settled result.
///
/// Reactions only exist while pending. Settling moves them out and replaces
/// the slot with the result, which is never replaced again.
pub(crate) enum Slot<T, E> {
    Pending(Vec<Reaction<T, E>>),
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Slot<T, E> {
    pub(crate) fn state(&self) -> State {
        match self {
            Slot::Pending(_) => State::Pending,
            Slot::Fulfilled(_) => State::Fulfilled,
            Slot::Rejected(_) => State::Rejected,
        }
    }
}
